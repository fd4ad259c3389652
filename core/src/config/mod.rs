//! Gallery settings persisted as JSON in the platform config directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::search::DEFAULT_MAX_BACKOFF;
use crate::storage::MountPoint;
use crate::types::{DepthBudget, MediaTypeSet};

const CONFIG_FILE_NAME: &str = "gallery.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GalleryConfig {
    /// Accepted MIME entries when a request names none. `image/*` style prefixes are allowed.
    pub media_types: Vec<String>,
    /// Depth budget used when a request does not carry one.
    pub default_depth: DepthBudget,
    /// Segments dropped before the locator falls back to the virtual root.
    pub max_backoff: usize,
    /// File names that exclude the folder holding them from traversal.
    pub ignore_markers: Vec<String>,
    pub mounts: Vec<MountPoint>,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            media_types: ["image/jpeg", "image/png", "image/gif", "image/webp"]
                .map(String::from)
                .to_vec(),
            default_depth: DepthBudget::UNLIMITED,
            max_backoff: DEFAULT_MAX_BACKOFF,
            ignore_markers: vec![".nomedia".to_string(), ".noimage".to_string()],
            mounts: Vec::new(),
        }
    }
}

impl GalleryConfig {
    /// Read the configuration at `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(target: "config", path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading config at {}", path.display()));
            }
        };
        serde_json::from_str(&raw).with_context(|| format!("parsing config at {}", path.display()))
    }

    /// Read the configuration from [`default_path`], or the defaults when there is none.
    pub fn load_default() -> Result<Self> {
        match default_path() {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Write the configuration to `path`, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory at {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(self).context("serializing config")?;
        fs::write(path, raw).with_context(|| format!("writing config at {}", path.display()))
    }

    pub fn media_type_set(&self) -> MediaTypeSet {
        MediaTypeSet::new(self.media_types.iter())
    }
}

/// `gallery.json` inside the platform config directory, if the platform has one.
pub fn default_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("org", "Gallery", "gallery")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MountOptions;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempfile::tempdir().expect("temp dir");
        let config = GalleryConfig::load(temp.path().join("absent.json")).unwrap();
        assert_eq!(config, GalleryConfig::default());
        assert_eq!(config.max_backoff, 4);
        assert!(config.default_depth.is_unlimited());
        assert!(config.media_type_set().matches("image/png"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("gallery.json");
        let raw = r#"{
            "defaultDepth": 2,
            "mounts": [{ "path": "nas", "previews": true }, { "path": "usb" }]
        }"#;
        fs::write(&path, raw).unwrap();

        let config = GalleryConfig::load(&path).unwrap();
        assert_eq!(config.default_depth, DepthBudget::new(2).unwrap());
        assert_eq!(config.ignore_markers, vec![".nomedia", ".noimage"]);
        assert_eq!(config.mounts[0], MountPoint::new("nas", MountOptions { previews: true }));
        assert!(!config.mounts[1].options.previews);
    }

    #[test]
    fn rejects_invalid_depth() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("gallery.json");
        fs::write(&path, r#"{ "defaultDepth": -7 }"#).unwrap();
        let err = GalleryConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parsing config"));
    }

    #[test]
    fn save_then_load() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("nested").join("gallery.json");
        let config = GalleryConfig { max_backoff: 1, ..GalleryConfig::default() };
        config.save(&path).unwrap();
        assert_eq!(GalleryConfig::load(&path).unwrap(), config);
    }
}
