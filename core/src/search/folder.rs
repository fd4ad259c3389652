//! Resolves a client location to a folder the current principal may browse.

use tracing::debug;

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::path;
use crate::types::{FolderReference, NodeRecord};

use super::policy::MountPolicy;

/// Segments dropped before the locator gives up and serves the virtual root.
pub const DEFAULT_MAX_BACKOFF: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct FolderLocator<'a> {
    env: &'a Environment,
    max_backoff: usize,
}

impl<'a> FolderLocator<'a> {
    pub fn new(env: &'a Environment) -> Self {
        Self { env, max_backoff: DEFAULT_MAX_BACKOFF }
    }

    pub fn with_max_backoff(mut self, max_backoff: usize) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Turn a percent-encoded location into a folder reference.
    ///
    /// When the location does not resolve, trailing segments are dropped one at a time and
    /// the longest prefix that resolves wins. After `max_backoff` failed attempts the virtual
    /// root is tried directly. A location naming a file resolves to the file's folder.
    pub fn find_folder(&self, location: &str) -> Result<FolderReference> {
        let decoded = path::decode_location(location);
        let (segments, escaped) = match path::segments(&decoded) {
            Some(segments) => (segments, false),
            None => (Vec::new(), true),
        };

        let mut dropped = 0;
        loop {
            let exhausted = dropped > 0 && dropped >= self.max_backoff;
            let keep = if exhausted { 0 } else { segments.len() - dropped };
            let candidate = segments[..keep].join("/");
            match self.env.resolve_node(&candidate) {
                Ok(node) => {
                    let changed = escaped || dropped > 0;
                    debug!(
                        target: "search::folder",
                        location = %decoded,
                        resolved = %candidate,
                        dropped,
                        "location resolved"
                    );
                    return self.locate(&candidate, node, changed);
                }
                Err(err) if keep == 0 => {
                    debug!(target: "search::folder", location = %decoded, "root did not resolve");
                    return Err(err);
                }
                Err(_) => dropped += 1,
            }
        }
    }

    /// Validate a resolved folder before handing it out.
    ///
    /// Fails with [`Error::NotFound`] for a missing node and [`Error::Forbidden`] for one that
    /// is unreadable or disallowed by the mount policy.
    pub fn send_folder(
        &self,
        path_from_root: String,
        node: Option<NodeRecord>,
        location_changed: bool,
    ) -> Result<FolderReference> {
        let folder = node.ok_or_else(|| Error::not_found("could not resolve folder"))?;
        if !MountPolicy::new(self.env.storage()).is_allowed_and_available(Some(&folder)) {
            return Err(Error::forbidden(format!(
                "album {path_from_root:?} is private or unavailable"
            )));
        }
        Ok(FolderReference { path_from_root, folder, location_changed, active_file: None })
    }

    fn locate(&self, relative: &str, node: NodeRecord, changed: bool) -> Result<FolderReference> {
        let (folder, active_file) = if node.is_file() {
            (self.env.resolve_node(path::parent(relative))?, Some(node))
        } else {
            (node, None)
        };
        let path_from_root = self.env.path_from_root(&folder)?;
        let reference = self.send_folder(path_from_root, Some(folder), changed)?;
        Ok(FolderReference { active_file, ..reference })
    }
}
