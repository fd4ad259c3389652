//! In-memory storage provider.

use std::collections::BTreeMap;
use std::io;

use crate::path;
use crate::types::{MountOptions, NodeId, NodeKind, NodeRecord};

use super::Storage;

#[derive(Debug, Clone)]
struct MemoryEntry {
    record: NodeRecord,
    readable: bool,
    etag: Option<String>,
    broken_listing: Option<String>,
    broken_checks: Option<String>,
}

/// A storage tree held entirely in memory, built up front and read-only afterwards.
///
/// Besides plain folders and files it can simulate the failure modes of real storages:
/// unreadable nodes, listings that error, checks that error, and external mounts.
///
/// The builder methods panic on invalid or unknown paths. This type is meant for tests
/// and fixtures, where a broken setup should fail loudly.
///
/// ```
/// use gallery_core::storage::{MemoryStorage, Storage};
///
/// let storage = MemoryStorage::new("home::alice")
///     .with_file("photos/beach.jpg", "image/jpeg", 2048)
///     .with_mount("nas", false);
/// assert!(storage.node("photos").unwrap().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    storage_id: String,
    entries: BTreeMap<String, MemoryEntry>,
    mounts: BTreeMap<String, MountOptions>,
    next_id: u64,
}

impl MemoryStorage {
    /// Create a tree holding only its root folder.
    pub fn new(storage_id: impl Into<String>) -> Self {
        let mut storage = Self {
            storage_id: storage_id.into(),
            entries: BTreeMap::new(),
            mounts: BTreeMap::new(),
            next_id: 1,
        };
        storage.insert(String::new(), NodeKind::Folder, None, 0);
        storage
    }

    /// Add a folder, creating missing ancestors.
    pub fn with_folder(mut self, folder: &str) -> Self {
        let folder = Self::normalize(folder);
        self.ensure_folders(&folder);
        self
    }

    /// Add a file, creating missing ancestor folders.
    pub fn with_file(mut self, file: &str, mime: &str, size: u64) -> Self {
        let file = Self::normalize(file);
        self.ensure_folders(path::parent(&file));
        self.insert(file, NodeKind::File, Some(mime.to_string()), size);
        self
    }

    /// Declare an external mount at an existing or new folder.
    pub fn with_mount(mut self, folder: &str, previews: bool) -> Self {
        let folder = Self::normalize(folder);
        self.ensure_folders(&folder);
        self.mounts.insert(folder, MountOptions { previews });
        self
    }

    pub fn with_mtime(mut self, node: &str, mtime: u64) -> Self {
        self.entry_mut(node).record.mtime = mtime;
        self
    }

    pub fn with_etag(mut self, node: &str, etag: &str) -> Self {
        self.entry_mut(node).etag = Some(etag.to_string());
        self
    }

    /// Make readability checks on `node` report `false`.
    pub fn unreadable(mut self, node: &str) -> Self {
        self.entry_mut(node).readable = false;
        self
    }

    /// Make listing `folder` fail with `message`.
    pub fn broken_listing(mut self, folder: &str, message: &str) -> Self {
        self.entry_mut(folder).broken_listing = Some(message.to_string());
        self
    }

    /// Make existence and readability checks on `node` fail with `message`.
    pub fn broken_checks(mut self, node: &str, message: &str) -> Self {
        self.entry_mut(node).broken_checks = Some(message.to_string());
        self
    }

    fn normalize(raw: &str) -> String {
        match path::normalize(raw) {
            Some(normalized) => normalized,
            None => panic!("MemoryStorage: invalid path {raw:?}"),
        }
    }

    fn entry_mut(&mut self, node: &str) -> &mut MemoryEntry {
        let node = Self::normalize(node);
        match self.entries.get_mut(&node) {
            Some(entry) => entry,
            None => panic!("MemoryStorage: unknown node {node:?}"),
        }
    }

    fn ensure_folders(&mut self, folder: &str) {
        let mut current = String::new();
        for segment in folder.split('/').filter(|segment| !segment.is_empty()) {
            current = path::join(&current, segment);
            match self.entries.get(&current) {
                Some(entry) if entry.record.is_file() => {
                    panic!("MemoryStorage: {current:?} is a file, cannot hold children")
                }
                Some(_) => {}
                None => self.insert(current.clone(), NodeKind::Folder, None, 0),
            }
        }
    }

    fn insert(&mut self, node: String, kind: NodeKind, mime: Option<String>, size: u64) {
        let id = NodeId::new(self.storage_id.as_str(), self.next_id);
        self.next_id += 1;
        let record = NodeRecord { id, kind, path: node.clone(), mime, mtime: 0, size };
        self.entries.insert(
            node,
            MemoryEntry {
                record,
                readable: true,
                etag: None,
                broken_listing: None,
                broken_checks: None,
            },
        );
    }

    fn mount_for(&self, node: &str) -> Option<(&str, MountOptions)> {
        self.mounts
            .iter()
            .filter(|(mount, _)| path::is_within(node, mount))
            .max_by_key(|(mount, _)| mount.len())
            .map(|(mount, options)| (mount.as_str(), *options))
    }

    /// Records carry the storage id of the mount they live on.
    fn snapshot(&self, entry: &MemoryEntry) -> NodeRecord {
        let mut record = entry.record.clone();
        if let Some((mount, _)) = self.mount_for(&record.path) {
            record.id.storage_id = format!("mount::{mount}");
        }
        record
    }

    fn lookup(&self, node: &NodeRecord) -> io::Result<&MemoryEntry> {
        self.entries.get(&node.path).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} does not exist", node.path))
        })
    }

    fn checked(&self, node: &NodeRecord) -> io::Result<Option<&MemoryEntry>> {
        match self.entries.get(&node.path) {
            Some(entry) => match &entry.broken_checks {
                Some(message) => Err(io::Error::other(message.clone())),
                None => Ok(Some(entry)),
            },
            None => Ok(None),
        }
    }
}

impl Storage for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    fn node(&self, node: &str) -> io::Result<Option<NodeRecord>> {
        let normalized = path::normalize(node).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("invalid tree path {node:?}"))
        })?;
        Ok(self.entries.get(&normalized).map(|entry| self.snapshot(entry)))
    }

    fn list(&self, folder: &NodeRecord) -> io::Result<Vec<NodeRecord>> {
        let entry = self.lookup(folder)?;
        if let Some(message) = &entry.broken_listing {
            return Err(io::Error::other(message.clone()));
        }
        if !entry.record.is_folder() {
            return Err(io::Error::other(format!("{} is not a folder", folder.path)));
        }
        let mut children: Vec<NodeRecord> = self
            .entries
            .iter()
            .filter(|(node, _)| !node.is_empty() && path::parent(node) == folder.path)
            .map(|(_, entry)| self.snapshot(entry))
            .collect();
        children.sort_by(|a, b| path::natural_cmp(a.name(), b.name()));
        Ok(children)
    }

    fn exists(&self, node: &NodeRecord) -> io::Result<bool> {
        Ok(self.checked(node)?.is_some())
    }

    fn is_readable(&self, node: &NodeRecord) -> io::Result<bool> {
        Ok(self.checked(node)?.is_some_and(|entry| entry.readable))
    }

    fn mount(&self, node: &NodeRecord) -> io::Result<Option<MountOptions>> {
        Ok(self.mount_for(&node.path).map(|(_, options)| options))
    }

    /// An explicit etag wins; otherwise the digest covers the node and everything below it.
    fn etag(&self, node: &NodeRecord) -> io::Result<String> {
        let entry = self.lookup(node)?;
        if let Some(etag) = &entry.etag {
            return Ok(etag.clone());
        }
        let mut hasher = blake3::Hasher::new();
        for (tree_path, entry) in
            self.entries.iter().filter(|(tree_path, _)| path::is_within(tree_path, &node.path))
        {
            hasher.update(tree_path.as_bytes());
            hasher.update(b"\0");
            hasher.update(&entry.record.mtime.to_le_bytes());
            hasher.update(&entry.record.size.to_le_bytes());
        }
        Ok(hasher.finalize().to_hex().as_str()[..16].to_string())
    }
}
