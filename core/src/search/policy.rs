//! Availability and mount-policy predicates.

use std::io;

use tracing::error;

use crate::storage::Storage;
use crate::types::NodeRecord;

/// Outcome of an availability check before it is collapsed to a boolean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable,
    /// A storage error interrupted the check; the node counts as unavailable.
    Suppressed(String),
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Decides whether folders and files may be shown.
///
/// Nodes on the home storage are always allowed. Nodes on an external mount are allowed only
/// when the mount opts into previews.
#[derive(Debug, Clone, Copy)]
pub struct MountPolicy<'a> {
    storage: &'a dyn Storage,
}

impl<'a> MountPolicy<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    pub fn is_allowed(&self, node: &NodeRecord) -> io::Result<bool> {
        Ok(match self.storage.mount(node)? {
            Some(options) => options.previews,
            None => true,
        })
    }

    pub fn availability(&self, node: Option<&NodeRecord>) -> Availability {
        let Some(node) = node else {
            return Availability::Unavailable;
        };
        let checked = self.is_allowed(node).and_then(|allowed| {
            Ok(allowed && self.storage.exists(node)? && self.storage.is_readable(node)?)
        });
        match checked {
            Ok(true) => Availability::Available,
            Ok(false) => Availability::Unavailable,
            Err(err) => Availability::Suppressed(err.to_string()),
        }
    }

    /// Collapses [`availability`](Self::availability) to a boolean, logging suppressed errors.
    pub fn is_allowed_and_available(&self, node: Option<&NodeRecord>) -> bool {
        let path = node.map(|node| node.path.as_str()).unwrap_or_default();
        collapse(path, self.availability(node))
    }

    /// Mount policy alone, for nodes whose existence a listing has just shown.
    pub fn allows(&self, node: &NodeRecord) -> bool {
        let decision = match self.is_allowed(node) {
            Ok(true) => Availability::Available,
            Ok(false) => Availability::Unavailable,
            Err(err) => Availability::Suppressed(err.to_string()),
        };
        collapse(&node.path, decision)
    }
}

fn collapse(path: &str, availability: Availability) -> bool {
    match availability {
        Availability::Available => true,
        Availability::Unavailable => false,
        Availability::Suppressed(message) => {
            error!(target: "search::policy", path, "the node is not available: {message}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn node(storage: &MemoryStorage, path: &str) -> NodeRecord {
        storage.node(path).unwrap().expect("fixture node")
    }

    #[test]
    fn missing_node_is_unavailable() {
        let storage = MemoryStorage::new("home::alice");
        let policy = MountPolicy::new(&storage);
        assert_eq!(policy.availability(None), Availability::Unavailable);
        assert!(!policy.is_allowed_and_available(None));
    }

    #[test]
    fn mounted_folders_follow_the_previews_option() {
        // (mounted, previews, expected)
        let cases =
            [(true, true, true), (true, false, false), (false, true, true), (false, false, true)];
        for (mounted, previews, expected) in cases {
            let mut storage = MemoryStorage::new("home::alice").with_folder("dav/album");
            if mounted {
                storage = storage.with_mount("dav", previews);
            }
            let policy = MountPolicy::new(&storage);
            let album = node(&storage, "dav/album");
            let allowed = policy.is_allowed(&album).unwrap();
            assert_eq!(allowed, expected, "mounted={mounted} previews={previews}");
        }
    }

    #[test]
    fn unreadable_node_is_unavailable() {
        let storage =
            MemoryStorage::new("home::alice").with_folder("private").unreadable("private");
        let policy = MountPolicy::new(&storage);
        let private = node(&storage, "private");
        assert_eq!(policy.availability(Some(&private)), Availability::Unavailable);
    }

    #[test]
    fn storage_errors_are_suppressed() {
        let storage =
            MemoryStorage::new("home::alice").with_folder("flaky").broken_checks("flaky", "Boom");
        let policy = MountPolicy::new(&storage);
        let flaky = node(&storage, "flaky");
        assert_eq!(policy.availability(Some(&flaky)), Availability::Suppressed("Boom".into()));
        assert!(!policy.is_allowed_and_available(Some(&flaky)));
    }

    #[test]
    fn allows_consults_only_the_mount() {
        let storage = MemoryStorage::new("home::alice")
            .with_file("pic.jpg", "image/jpeg", 1)
            .with_file("nas/pic.jpg", "image/jpeg", 1)
            .with_mount("nas", false)
            .broken_checks("pic.jpg", "never consulted");
        let policy = MountPolicy::new(&storage);
        assert!(policy.allows(&node(&storage, "pic.jpg")));
        assert!(!policy.allows(&node(&storage, "nas/pic.jpg")));
    }

    #[test]
    fn disallowed_mount_short_circuits_other_checks() {
        let storage = MemoryStorage::new("home::alice")
            .with_mount("nas", false)
            .broken_checks("nas", "never consulted");
        let policy = MountPolicy::new(&storage);
        assert_eq!(policy.availability(Some(&node(&storage, "nas"))), Availability::Unavailable);
    }
}
