//! One gallery request: resolve the folder, describe it and enumerate its media.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::GalleryConfig;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::search::{FolderLocator, filter_and_shorten, walk};
use crate::types::{
    AlbumInfo, DepthBudget, Features, FolderReference, MediaFile, MediaTypeSet, NodeRecord,
};

/// Parameters a client sends with a files request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilesRequest {
    /// Percent-encoded path relative to the virtual root.
    pub location: String,
    pub features: Features,
    pub media_types: MediaTypeSet,
    /// Album etag the client already holds.
    pub etag: Option<String>,
    /// Overrides the configured depth budget.
    pub depth: Option<DepthBudget>,
}

impl FilesRequest {
    pub fn new(location: impl Into<String>) -> Self {
        Self { location: location.into(), ..Self::default() }
    }

    pub fn with_features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }

    pub fn with_media_types(mut self, media_types: MediaTypeSet) -> Self {
        self.media_types = media_types;
        self
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    pub fn with_depth(mut self, depth: DepthBudget) -> Self {
        self.depth = Some(depth);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesResponse {
    pub files: Vec<MediaFile>,
    pub album_info: AlbumInfo,
    pub location_has_changed: bool,
    /// Path from the virtual root of the file the location named, if it named one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_file: Option<String>,
}

/// Serves files requests against one [`Environment`].
#[derive(Debug)]
pub struct FilesService {
    env: Environment,
    max_backoff: usize,
    default_depth: DepthBudget,
    ignore_markers: Vec<String>,
}

impl FilesService {
    pub fn new(env: Environment, config: &GalleryConfig) -> Self {
        Self {
            env,
            max_backoff: config.max_backoff,
            default_depth: config.default_depth,
            ignore_markers: config.ignore_markers.clone(),
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Resolve `request.location` and list the media below it.
    ///
    /// When the client etag matches the album etag the walk is skipped and `files` is empty.
    pub fn get_files(&self, request: &FilesRequest) -> Result<FilesResponse> {
        let locator = FolderLocator::new(&self.env).with_max_backoff(self.max_backoff);
        let reference = locator.find_folder(&request.location)?;
        let album_info = self.album_info(&reference, &request.features)?;
        let active_file = reference
            .active_file
            .as_ref()
            .map(|file| self.env.path_from_root(file))
            .transpose()?;

        if request.etag.as_deref() == Some(album_info.etag.as_str()) {
            debug!(
                target: "service",
                folder = %reference.path_from_root,
                etag = %album_info.etag,
                "album unchanged, skipping walk"
            );
            return Ok(FilesResponse {
                files: Vec::new(),
                album_info,
                location_has_changed: reference.location_changed,
                active_file,
            });
        }

        let depth = request.depth.unwrap_or(self.default_depth);
        let nodes = walk(self.env.storage(), &reference.folder, depth)
            .with_ignore_markers(self.ignore_markers.iter().cloned())
            .map(|node| -> Result<NodeRecord> {
                let mut node = node?;
                node.path = self.env.path_from_root(&node)?;
                Ok(node)
            })
            .collect::<Result<Vec<_>>>()?;
        let files = filter_and_shorten(nodes, &request.media_types, &reference.path_from_root);

        info!(
            target: "service",
            folder = %reference.path_from_root,
            depth = depth.levels(),
            files = files.len(),
            "files listed"
        );
        Ok(FilesResponse {
            files,
            album_info,
            location_has_changed: reference.location_changed,
            active_file,
        })
    }

    fn album_info(&self, reference: &FolderReference, features: &Features) -> Result<AlbumInfo> {
        let folder = &reference.folder;
        let etag =
            self.env.storage().etag(folder).map_err(|err| Error::not_found(err.to_string()))?;
        Ok(AlbumInfo {
            path: reference.path_from_root.clone(),
            node_id: folder.id.clone(),
            mtime: folder.mtime,
            size: folder.size,
            etag,
            owner: self.env.display_name().ok(),
            features: features.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::MemoryStorage;
    use crate::types::Principal;

    fn service(storage: MemoryStorage) -> FilesService {
        let principal = Principal::new("alice").with_display_name("Alice");
        let env = Environment::new(Arc::new(storage), "", Some(principal)).unwrap();
        FilesService::new(env, &GalleryConfig::default())
    }

    fn images() -> MediaTypeSet {
        MediaTypeSet::parse("image/*")
    }

    #[test]
    fn empty_home_folder_yields_no_files() {
        let service = service(MemoryStorage::new("home::alice"));
        let request = FilesRequest::new("").with_depth(DepthBudget::FOLDER_ONLY);
        let response = service.get_files(&request).unwrap();
        assert!(response.files.is_empty());
        assert!(!response.location_has_changed);
        assert_eq!(response.album_info.path, "");
        assert_eq!(response.album_info.owner.as_deref(), Some("Alice"));
    }

    #[test]
    fn lists_media_below_the_resolved_folder() {
        let storage = MemoryStorage::new("home::alice")
            .with_file("trips/cover.jpg", "image/jpeg", 10)
            .with_file("trips/notes.txt", "text/plain", 10)
            .with_file("trips/2015/paris/eiffel.png", "image/png", 10);
        let request = FilesRequest::new("trips").with_media_types(images());
        let response = service(storage).get_files(&request).unwrap();

        let paths: Vec<&str> = response.files.iter().map(|file| file.path.as_str()).collect();
        assert_eq!(paths, vec!["trips/eiffel.png", "trips/cover.jpg"]);
        assert_eq!(response.album_info.path, "trips");
    }

    #[test]
    fn reports_backed_off_location() {
        let storage = MemoryStorage::new("home::alice").with_file("a/x.jpg", "image/jpeg", 1);
        let request = FilesRequest::new("a/b/c").with_media_types(images());
        let response = service(storage).get_files(&request).unwrap();
        assert!(response.location_has_changed);
        assert_eq!(response.album_info.path, "a");
        assert_eq!(response.files.len(), 1);
    }

    #[test]
    fn matching_etag_skips_the_walk() {
        let storage = MemoryStorage::new("home::alice")
            .with_file("album/pic.jpg", "image/jpeg", 1)
            .with_etag("album", "v1")
            .broken_listing("album", "listing must not run");
        let request = FilesRequest::new("album/missing").with_media_types(images()).with_etag("v1");
        let response = service(storage).get_files(&request).unwrap();
        assert!(response.files.is_empty());
        assert_eq!(response.album_info.etag, "v1");
        assert!(response.location_has_changed);
    }

    #[test]
    fn stale_etag_walks_again() {
        let storage = MemoryStorage::new("home::alice")
            .with_file("album/pic.jpg", "image/jpeg", 1)
            .with_etag("album", "v2");
        let request = FilesRequest::new("album").with_media_types(images()).with_etag("v1");
        let response = service(storage).get_files(&request).unwrap();
        assert_eq!(response.files.len(), 1);
    }

    #[test]
    fn listing_failure_returns_no_records() {
        let storage = MemoryStorage::new("home::alice")
            .with_file("album/pic.jpg", "image/jpeg", 1)
            .with_folder("album/broken")
            .broken_listing("album/broken", "Boom");
        let request = FilesRequest::new("album").with_media_types(images());
        let err = service(storage).get_files(&request).unwrap_err();
        assert_eq!(err, Error::not_found("Boom"));
    }

    #[test]
    fn mounted_share_without_previews_is_forbidden() {
        let storage = MemoryStorage::new("home::alice")
            .with_file("nas/pic.jpg", "image/jpeg", 1)
            .with_mount("nas", false);
        let err = service(storage).get_files(&FilesRequest::new("nas")).unwrap_err();
        assert!(err.is_forbidden());
    }

    #[test]
    fn file_location_opens_its_album_with_the_file_active() {
        let storage = MemoryStorage::new("home::alice")
            .with_file("trips/cover.jpg", "image/jpeg", 10)
            .with_file("trips/beach.jpg", "image/jpeg", 10);
        let request = FilesRequest::new("trips/cover.jpg").with_media_types(images());
        let response = service(storage).get_files(&request).unwrap();

        assert_eq!(response.album_info.path, "trips");
        assert_eq!(response.active_file.as_deref(), Some("trips/cover.jpg"));
        assert!(!response.location_has_changed);
        assert_eq!(response.files.len(), 2);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["activeFile"], "trips/cover.jpg");
    }

    #[test]
    fn features_are_passed_through() {
        let request = FilesRequest::new("").with_features(Features::parse("favorites,native_svg"));
        let response = service(MemoryStorage::new("home::alice")).get_files(&request).unwrap();
        assert!(response.album_info.features.contains("favorites"));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["locationHasChanged"], false);
        assert_eq!(json["albumInfo"]["features"][1], "native_svg");
        assert!(json.get("activeFile").is_none());
    }
}
