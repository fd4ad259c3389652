//! Request-scoped view of a storage tree, rooted at the folder the current principal may see.
//!
//! For a signed-in user the virtual root is their home folder; for a share link it is the
//! shared folder. Nothing above the virtual root is reachable through an [`Environment`].

use std::fmt;

use tracing::debug;

use crate::error::{Error, Result};
use crate::path;
use crate::storage::{Storage, StorageHandle};
use crate::types::{NodeRecord, Principal};

pub struct Environment {
    storage: StorageHandle,
    root: NodeRecord,
    principal: Option<Principal>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("storage", &self.storage.name())
            .field("root", &self.root.path)
            .field("principal", &self.principal)
            .finish()
    }
}

impl Environment {
    /// Bind an environment to the folder at `root_path` (a tree path) on `storage`.
    ///
    /// Fails with [`Error::NotFound`] when the root is missing or is not a folder.
    pub fn new(
        storage: StorageHandle,
        root_path: &str,
        principal: Option<Principal>,
    ) -> Result<Self> {
        let root = storage
            .node(root_path)
            .map_err(|err| Error::not_found(err.to_string()))?
            .filter(NodeRecord::is_folder)
            .ok_or_else(|| Error::not_found(format!("virtual root {root_path:?} does not exist")))?;
        let name = storage.name();
        debug!(target: "environment", storage = name, root = %root.path, "environment bound");
        Ok(Self { storage, root, principal })
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// The folder this environment is scoped to.
    pub fn virtual_root(&self) -> &NodeRecord {
        &self.root
    }

    /// Resolve `relative` (relative to the virtual root) to a node.
    pub fn resolve_node(&self, relative: &str) -> Result<NodeRecord> {
        let relative = path::normalize(relative)
            .ok_or_else(|| Error::not_found(format!("{relative:?} leaves the virtual root")))?;
        let tree_path = path::join(&self.root.path, &relative);
        self.storage
            .node(&tree_path)
            .map_err(|err| Error::not_found(err.to_string()))?
            .ok_or_else(|| Error::not_found(format!("{relative:?} does not exist")))
    }

    /// Path of `node` relative to the virtual root; `""` for the root itself.
    pub fn path_from_root(&self, node: &NodeRecord) -> Result<String> {
        path::relative_to(&node.path, &self.root.path).map(str::to_string).ok_or_else(|| {
            Error::not_found(format!("{:?} is not inside the virtual root", node.path))
        })
    }

    /// Human readable name of the principal.
    pub fn display_name(&self) -> Result<String> {
        let principal = self
            .principal
            .as_ref()
            .ok_or_else(|| Error::not_found("no principal is bound to this environment"))?;
        Ok(principal.display_name.clone().unwrap_or_else(|| principal.user_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::MemoryStorage;

    fn storage() -> StorageHandle {
        Arc::new(
            MemoryStorage::new("home::alice")
                .with_file("alice/files/photos/beach.jpg", "image/jpeg", 10)
                .with_file("bob/files/secret.jpg", "image/jpeg", 10),
        )
    }

    #[test]
    fn resolves_relative_to_virtual_root() {
        let env = Environment::new(storage(), "alice/files", None).unwrap();
        let node = env.resolve_node("photos/beach.jpg").unwrap();
        assert_eq!(node.path, "alice/files/photos/beach.jpg");
        assert_eq!(env.path_from_root(&node).unwrap(), "photos/beach.jpg");
        assert_eq!(env.path_from_root(env.virtual_root()).unwrap(), "");
        assert_eq!(env.resolve_node("").unwrap(), *env.virtual_root());
    }

    #[test]
    fn never_reaches_above_the_virtual_root() {
        let env = Environment::new(storage(), "alice/files", None).unwrap();
        assert!(env.resolve_node("../../bob/files/secret.jpg").unwrap_err().is_not_found());

        let outsider = env.storage().node("bob/files/secret.jpg").unwrap().unwrap();
        assert!(env.path_from_root(&outsider).unwrap_err().is_not_found());
    }

    #[test]
    fn missing_nodes_are_not_found() {
        let env = Environment::new(storage(), "alice/files", None).unwrap();
        assert!(env.resolve_node("photos/missing.jpg").unwrap_err().is_not_found());
        assert!(Environment::new(storage(), "carol/files", None).unwrap_err().is_not_found());
    }

    #[test]
    fn display_name_requires_a_principal() {
        let anonymous = Environment::new(storage(), "alice/files", None).unwrap();
        assert!(anonymous.display_name().unwrap_err().is_not_found());

        let alice = Some(Principal::new("alice"));
        let user = Environment::new(storage(), "alice/files", alice).unwrap();
        assert_eq!(user.display_name().unwrap(), "alice");

        let named = Principal::new("alice").with_display_name("Alice Liddell");
        let env = Environment::new(storage(), "alice/files", Some(named)).unwrap();
        assert_eq!(env.display_name().unwrap(), "Alice Liddell");
    }
}
