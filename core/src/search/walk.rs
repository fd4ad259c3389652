//! Depth-bounded traversal below a folder.

use std::collections::VecDeque;
use std::iter::FusedIterator;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::path;
use crate::storage::Storage;
use crate::types::{DepthBudget, NodeRecord};

use super::policy::MountPolicy;

/// Children of one folder still waiting to be yielded.
#[derive(Debug)]
struct Frame {
    children: VecDeque<NodeRecord>,
    budget: DepthBudget,
}

/// Lazy, single-pass traversal returned by [`walk`].
///
/// Yields every allowed node below the starting folder, depth first: a folder is yielded
/// before its own children. Folders must pass the full availability check; files were just
/// listed, so only the mount policy applies to them. The first listing error is yielded as
/// [`Error::NotFound`] and ends the iteration; collect into `Result<Vec<_>>` to get
/// all-or-nothing semantics.
#[derive(Debug)]
pub struct Walk<'a> {
    storage: &'a dyn Storage,
    start: Option<NodeRecord>,
    root: String,
    budget: DepthBudget,
    markers: Vec<String>,
    stack: Vec<Frame>,
    finished: bool,
}

/// Walk below `folder`. With a budget of `0` only the folder's direct children are yielded;
/// each extra level lets the walk descend one folder deeper. `-1` walks the whole subtree.
pub fn walk<'a>(storage: &'a dyn Storage, folder: &NodeRecord, budget: DepthBudget) -> Walk<'a> {
    Walk {
        storage,
        start: Some(folder.clone()),
        root: folder.path.clone(),
        budget,
        markers: Vec::new(),
        stack: Vec::new(),
        finished: false,
    }
}

impl Walk<'_> {
    /// Skip every sub-folder that directly contains a file with one of these names.
    pub fn with_ignore_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.markers.extend(markers.into_iter().map(Into::into));
        self
    }

    fn list(&self, folder: &NodeRecord) -> Result<Vec<NodeRecord>> {
        self.storage.list(folder).map_err(|err| Error::not_found(err.to_string()))
    }

    fn is_marked(&self, children: &[NodeRecord]) -> bool {
        !self.markers.is_empty()
            && children.iter().any(|child| {
                child.is_file() && self.markers.iter().any(|marker| marker == child.name())
            })
    }

    fn fail(&mut self, err: Error) -> Option<Result<NodeRecord>> {
        self.finished = true;
        self.stack.clear();
        Some(Err(err))
    }
}

impl Iterator for Walk<'_> {
    type Item = Result<NodeRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if let Some(start) = self.start.take() {
            match self.list(&start) {
                Ok(children) => {
                    self.stack.push(Frame { children: children.into(), budget: self.budget })
                }
                Err(err) => return self.fail(err),
            }
        }

        let policy = MountPolicy::new(self.storage);
        loop {
            let Some(frame) = self.stack.last_mut() else {
                self.finished = true;
                return None;
            };
            let Some(child) = frame.children.pop_front() else {
                self.stack.pop();
                continue;
            };
            let budget = frame.budget;

            if !path::is_within(&child.path, &self.root) || child.path == self.root {
                warn!(
                    target: "search::walk",
                    path = %child.path,
                    root = %self.root,
                    "dropping node outside the walked folder"
                );
                continue;
            }
            if child.is_file() {
                if !policy.allows(&child) {
                    debug!(target: "search::walk", path = %child.path, "skipping disallowed file");
                    continue;
                }
                return Some(Ok(child));
            }
            if !policy.is_allowed_and_available(Some(&child)) {
                debug!(target: "search::walk", path = %child.path, "skipping unavailable folder");
                continue;
            }

            let Some(child_budget) = budget.descend() else {
                return Some(Ok(child));
            };
            let grandchildren = match self.list(&child) {
                Ok(grandchildren) => grandchildren,
                Err(err) => return self.fail(err),
            };
            if self.is_marked(&grandchildren) {
                debug!(target: "search::walk", path = %child.path, "skipping marked folder");
                continue;
            }
            self.stack.push(Frame { children: grandchildren.into(), budget: child_budget });
            return Some(Ok(child));
        }
    }
}

impl FusedIterator for Walk<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn tree() -> MemoryStorage {
        MemoryStorage::new("home::alice")
            .with_file("top.jpg", "image/jpeg", 1)
            .with_file("l1/one.jpg", "image/jpeg", 1)
            .with_file("l1/l2/two.jpg", "image/jpeg", 1)
            .with_file("l1/l2/l3/three.jpg", "image/jpeg", 1)
    }

    fn paths(storage: &MemoryStorage, start: &str, levels: i32) -> Vec<String> {
        let folder = storage.node(start).unwrap().unwrap();
        walk(storage, &folder, DepthBudget::new(levels).unwrap())
            .map(|node| node.unwrap().path)
            .collect()
    }

    #[test]
    fn zero_budget_lists_direct_children_only() {
        assert_eq!(paths(&tree(), "", 0), vec!["l1", "top.jpg"]);
    }

    #[test]
    fn each_level_descends_one_folder_deeper() {
        assert_eq!(paths(&tree(), "", 1), vec!["l1", "l1/l2", "l1/one.jpg", "top.jpg"]);
        assert_eq!(
            paths(&tree(), "", 2),
            vec!["l1", "l1/l2", "l1/l2/l3", "l1/l2/two.jpg", "l1/one.jpg", "top.jpg"]
        );
    }

    #[test]
    fn unlimited_budget_walks_whole_subtree() {
        let all = paths(&tree(), "", -1);
        assert_eq!(all.len(), 7);
        assert!(all.contains(&"l1/l2/l3/three.jpg".to_string()));
        assert_eq!(
            paths(&tree(), "l1/l2", -1),
            vec!["l1/l2/l3", "l1/l2/l3/three.jpg", "l1/l2/two.jpg"]
        );
    }

    #[test]
    fn skips_disallowed_branches() {
        let storage = tree()
            .with_file("nas/hidden.jpg", "image/jpeg", 1)
            .with_mount("nas", false)
            .unreadable("l1/l2");
        assert_eq!(paths(&storage, "", -1), vec!["l1", "l1/one.jpg", "top.jpg"]);
    }

    #[test]
    fn listed_files_skip_existence_and_readability_checks() {
        let storage = tree().broken_checks("top.jpg", "Boom").unreadable("l1/one.jpg");
        let found = paths(&storage, "", 0);
        assert_eq!(found, vec!["l1", "top.jpg"]);
        assert_eq!(paths(&storage, "l1", 0), vec!["l1/l2", "l1/one.jpg"]);
    }

    #[test]
    fn skips_folders_with_ignore_markers() {
        let storage = tree().with_file("l1/l2/.nomedia", "application/octet-stream", 0);
        let root = storage.node("").unwrap().unwrap();
        let found: Vec<String> = walk(&storage, &root, DepthBudget::UNLIMITED)
            .with_ignore_markers([".nomedia"])
            .map(|node| node.unwrap().path)
            .collect();
        assert_eq!(found, vec!["l1", "l1/one.jpg", "top.jpg"]);
    }

    #[test]
    fn listing_error_fails_the_whole_walk() {
        let storage = tree().broken_listing("l1/l2", "Boom");
        let root = storage.node("").unwrap().unwrap();
        let result: Result<Vec<NodeRecord>> =
            walk(&storage, &root, DepthBudget::UNLIMITED).collect();
        let err = result.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.message(), "Boom");
    }

    #[test]
    fn broken_start_folder_yields_one_error_then_ends() {
        let storage = tree().broken_listing("", "Boom");
        let root = storage.node("").unwrap().unwrap();
        let mut walker = walk(&storage, &root, DepthBudget::FOLDER_ONLY);
        assert_eq!(walker.next().unwrap().unwrap_err(), Error::not_found("Boom"));
        assert!(walker.next().is_none());
    }

    #[test]
    fn folders_beyond_the_budget_are_never_listed() {
        let storage = tree().broken_listing("l1", "Boom");
        let root = storage.node("").unwrap().unwrap();
        let walker = walk(&storage, &root, DepthBudget::FOLDER_ONLY);
        let found: Vec<String> = walker.map(|node| node.unwrap().path).collect();
        assert_eq!(found, vec!["l1", "top.jpg"]);
    }
}
