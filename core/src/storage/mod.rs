//! Storage providers the search services read from.
//!
//! A provider exposes one tree of folders and files addressed by tree paths (see
//! [`crate::path`]). The services never write through a provider.

mod local;
mod memory;
pub mod mime;

use std::fmt;
use std::io;
use std::sync::Arc;

pub use self::local::{LocalStorage, MountPoint};
pub use self::memory::MemoryStorage;
use crate::types::{MountOptions, NodeRecord};

pub type StorageHandle = Arc<dyn Storage>;

/// Read-only interface over a storage tree.
///
/// Every call may fail with an I/O error; callers decide whether that is fatal.
pub trait Storage: fmt::Debug + Send + Sync {
    /// Name of the provider, used for logging only.
    fn name(&self) -> &str;

    /// Resolve a tree path. `Ok(None)` when nothing lives there.
    fn node(&self, path: &str) -> io::Result<Option<NodeRecord>>;

    /// Direct children of `folder`.
    fn list(&self, folder: &NodeRecord) -> io::Result<Vec<NodeRecord>>;

    fn exists(&self, node: &NodeRecord) -> io::Result<bool> {
        Ok(self.node(&node.path)?.is_some())
    }

    fn is_readable(&self, node: &NodeRecord) -> io::Result<bool>;

    /// Options of the external mount `node` lives on, `None` for the home storage.
    fn mount(&self, node: &NodeRecord) -> io::Result<Option<MountOptions>>;

    /// Opaque tag that changes whenever the node does.
    fn etag(&self, node: &NodeRecord) -> io::Result<String>;
}
