//! Local filesystem storage provider.
//!
//! The tree is a directory on disk. Symbolic links are never followed: a link anywhere along
//! a path makes that path resolve to nothing, so a link cannot expose anything outside the
//! configured root.

use std::fs::{self, File, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::path;
use crate::types::{MountOptions, NodeId, NodeKind, NodeRecord};

use super::{Storage, mime};

/// An externally mounted storage living at `path` inside the local tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountPoint {
    /// Tree path of the mount point.
    pub path: String,
    /// Storage id reported for nodes on the mount. Defaults to `local::<path>`.
    #[serde(default)]
    pub storage_id: Option<String>,
    #[serde(flatten)]
    pub options: MountOptions,
}

impl MountPoint {
    pub fn new(path: impl Into<String>, options: MountOptions) -> Self {
        Self { path: path.into(), storage_id: None, options }
    }

    fn storage_id(&self) -> String {
        self.storage_id.clone().unwrap_or_else(|| format!("local::{}", self.path))
    }
}

#[derive(Debug, Clone)]
pub struct LocalStorage {
    name: String,
    storage_id: String,
    root: PathBuf,
    mounts: Vec<MountPoint>,
}

impl LocalStorage {
    /// Open the directory at `root` as a storage tree. `name` becomes part of the storage id.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("storage root {} is not a directory", root.display()),
            ));
        }
        let name = name.into();
        Ok(Self { storage_id: format!("home::{name}"), name, root, mounts: Vec::new() })
    }

    /// Declare external mounts. Mount paths that escape the tree are ignored.
    pub fn with_mounts(mut self, mounts: impl IntoIterator<Item = MountPoint>) -> Self {
        for mut mount in mounts {
            match path::normalize(&mount.path) {
                Some(normalized) => {
                    mount.path = normalized;
                    self.mounts.push(mount);
                }
                None => {
                    let mount = mount.path.as_str();
                    debug!(target: "storage::local", mount, "ignoring mount outside tree")
                }
            }
        }
        // Longest first, so nested mounts win over their parents.
        self.mounts.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn mount_for(&self, tree_path: &str) -> Option<&MountPoint> {
        self.mounts
            .iter()
            .find(|mount| !mount.path.is_empty() && path::is_within(tree_path, &mount.path))
    }

    fn absolute_path(&self, tree_path: &str) -> io::Result<PathBuf> {
        let parts = path::segments(tree_path).ok_or_else(|| invalid_path(tree_path))?;
        Ok(parts.into_iter().fold(self.root.clone(), |abs, part| abs.join(part)))
    }

    /// `lstat` every component so that a link anywhere along the way hides the target.
    fn lstat(&self, tree_path: &str) -> io::Result<Option<Metadata>> {
        let parts = path::segments(tree_path).ok_or_else(|| invalid_path(tree_path))?;
        let mut current = self.root.clone();
        let mut metadata = fs::symlink_metadata(&current)?;
        for part in parts {
            if !metadata.is_dir() {
                return Ok(None);
            }
            current.push(part);
            metadata = match fs::symlink_metadata(&current) {
                Ok(metadata) => metadata,
                Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(err) => return Err(err),
            };
            if metadata.file_type().is_symlink() {
                return Ok(None);
            }
        }
        Ok(Some(metadata))
    }

    fn record(&self, tree_path: String, metadata: &Metadata) -> Option<NodeRecord> {
        let kind = if metadata.is_dir() {
            NodeKind::Folder
        } else if metadata.is_file() {
            NodeKind::File
        } else {
            return None;
        };
        let storage_id = self
            .mount_for(&tree_path)
            .map(MountPoint::storage_id)
            .unwrap_or_else(|| self.storage_id.clone());
        let mime = (kind == NodeKind::File)
            .then(|| mime::guess_from_name(path::file_name(&tree_path)).to_string());
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);
        let size = if kind == NodeKind::File { metadata.len() } else { 0 };

        Some(NodeRecord {
            id: NodeId::new(storage_id.as_str(), file_id(&storage_id, &tree_path)),
            kind,
            path: tree_path,
            mime,
            mtime,
            size,
        })
    }

    fn hash_subtree(&self, hasher: &mut blake3::Hasher, folder: &str) -> io::Result<()> {
        let mut pending = vec![folder.to_string()];
        while let Some(current) = pending.pop() {
            let entries = match fs::read_dir(self.absolute_path(&current)?) {
                Ok(entries) => entries,
                Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                    hasher.update(b"\0unreadable");
                    continue;
                }
                Err(err) => return Err(err),
            };

            let mut children = Vec::new();
            for entry in entries {
                let entry = entry?;
                if entry.file_type()?.is_symlink() {
                    continue;
                }
                let Ok(name) = entry.file_name().into_string() else {
                    continue;
                };
                children.push((name, entry.metadata()?));
            }
            children.sort_by(|(a, _), (b, _)| path::natural_cmp(a, b));

            for (name, metadata) in children {
                let child = path::join(&current, &name);
                hash_entry(hasher, &child, &metadata);
                if metadata.is_dir() {
                    pending.push(child);
                }
            }
        }
        Ok(())
    }
}

impl Storage for LocalStorage {
    fn name(&self) -> &str {
        &self.name
    }

    fn node(&self, tree_path: &str) -> io::Result<Option<NodeRecord>> {
        let normalized = path::normalize(tree_path).ok_or_else(|| invalid_path(tree_path))?;
        let Some(metadata) = self.lstat(&normalized)? else {
            return Ok(None);
        };
        Ok(self.record(normalized, &metadata))
    }

    fn list(&self, folder: &NodeRecord) -> io::Result<Vec<NodeRecord>> {
        if !folder.is_folder() {
            return Err(io::Error::other(format!("{} is not a folder", folder.path)));
        }
        let mut children = Vec::new();
        for entry in fs::read_dir(self.absolute_path(&folder.path)?)? {
            let entry = entry?;
            if entry.file_type()?.is_symlink() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                debug!(target: "storage::local", entry = ?file_name, "skipping non UTF-8 name");
                continue;
            };
            let metadata = entry.metadata()?;
            if let Some(record) = self.record(path::join(&folder.path, name), &metadata) {
                children.push(record);
            }
        }
        children.sort_by(|a, b| path::natural_cmp(a.name(), b.name()));
        Ok(children)
    }

    fn is_readable(&self, node: &NodeRecord) -> io::Result<bool> {
        let absolute = self.absolute_path(&node.path)?;
        let opened = match node.kind {
            NodeKind::Folder => fs::read_dir(&absolute).map(|_| ()),
            NodeKind::File => File::open(&absolute).map(|_| ()),
        };
        match opened {
            Ok(()) => Ok(true),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::PermissionDenied | io::ErrorKind::NotFound
                ) =>
            {
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    fn mount(&self, node: &NodeRecord) -> io::Result<Option<MountOptions>> {
        Ok(self.mount_for(&node.path).map(|mount| mount.options))
    }

    /// Digest of the node and, for folders, of every descendant's path, mtime and size, so a
    /// change anywhere below an album changes the album's etag.
    fn etag(&self, node: &NodeRecord) -> io::Result<String> {
        let metadata = self.lstat(&node.path)?.ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} no longer exists", node.path))
        })?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(node.id.storage_id.as_bytes());
        hash_entry(&mut hasher, &node.path, &metadata);
        if metadata.is_dir() {
            self.hash_subtree(&mut hasher, &node.path)?;
        }
        Ok(hasher.finalize().to_hex().as_str()[..32].to_string())
    }
}

fn hash_entry(hasher: &mut blake3::Hasher, tree_path: &str, metadata: &Metadata) {
    let modified = metadata
        .modified()
        .ok()
        .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or(0);
    hasher.update(tree_path.as_bytes());
    hasher.update(b"\0");
    hasher.update(&modified.to_le_bytes());
    hasher.update(&metadata.len().to_le_bytes());
}

fn file_id(storage_id: &str, tree_path: &str) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(storage_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(tree_path.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

fn invalid_path(tree_path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, format!("invalid tree path {tree_path:?}"))
}
