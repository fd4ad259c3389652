//! Folder resolution and media enumeration for a photo gallery.
//!
//! A request names a location relative to the principal's virtual root. The
//! [`search::FolderLocator`] turns it into a browsable folder, [`search::walk`] enumerates the
//! nodes below it and [`search::filter_and_shorten`] keeps the media a client can display.
//! [`FilesService`] runs the three steps for one request.

#![deny(missing_debug_implementations)]

pub mod config;
pub mod environment;
pub mod error;
pub mod log;
pub mod path;
pub mod search;
pub mod service;
pub mod storage;
pub mod types;

pub use config::GalleryConfig;
pub use environment::Environment;
pub use error::{Error, Result};
pub use service::{FilesRequest, FilesResponse, FilesService};
pub use storage::{LocalStorage, MemoryStorage, MountPoint, Storage, StorageHandle};
pub use types::{
    AlbumInfo, DepthBudget, Features, FolderReference, MediaFile, MediaTypeSet, MountOptions,
    NodeId, NodeKind, NodeRecord, Principal,
};

/// Returns the version of the core crate for diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposes_semver_version() {
        assert!(version().contains('.'));
    }

    #[test]
    fn node_ids_display_with_their_storage() {
        let id = NodeId::new("home::alice", 42);
        assert_eq!(id.to_string(), "home::alice#42");
    }
}
