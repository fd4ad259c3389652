//! Shared data structures exchanged between the storage layer, the search services, and callers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a node: the storage it lives on plus its id within that storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeId {
    pub storage_id: String,
    pub file_id: u64,
}

impl NodeId {
    pub fn new(storage_id: impl Into<String>, file_id: u64) -> Self {
        Self { storage_id: storage_id.into(), file_id }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.storage_id, self.file_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

/// One filesystem entry as reported by a storage provider.
///
/// `path` is a tree path: `/`-separated, without a leading slash, `""` being the tree root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub id: NodeId,
    pub kind: NodeKind,
    pub path: String,
    /// Only set for files.
    pub mime: Option<String>,
    /// Modification time, seconds since the Unix epoch.
    pub mtime: u64,
    pub size: u64,
}

impl NodeRecord {
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    /// Last path segment, or `""` for the tree root.
    pub fn name(&self) -> &str {
        crate::path::file_name(&self.path)
    }
}

/// Options attached to an externally mounted storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MountOptions {
    /// Whether previews may be generated for content on the mount. Off unless opted in.
    #[serde(default)]
    pub previews: bool,
}

/// The principal a request runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub display_name: Option<String>,
}

impl Principal {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), display_name: None }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Remaining recursion levels for a traversal. `-1` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct DepthBudget(i32);

impl DepthBudget {
    pub const UNLIMITED: Self = Self(-1);
    pub const FOLDER_ONLY: Self = Self(0);

    /// Returns `None` for values below `-1`.
    pub fn new(levels: i32) -> Option<Self> {
        (levels >= -1).then_some(Self(levels))
    }

    pub fn is_unlimited(self) -> bool {
        self.0 == -1
    }

    pub fn levels(self) -> i32 {
        self.0
    }

    /// Budget for a child folder, or `None` when the budget is spent.
    pub fn descend(self) -> Option<Self> {
        match self.0 {
            -1 => Some(self),
            0 => None,
            n => Some(Self(n - 1)),
        }
    }
}

impl Default for DepthBudget {
    fn default() -> Self {
        Self::UNLIMITED
    }
}

impl TryFrom<i32> for DepthBudget {
    type Error = String;

    fn try_from(value: i32) -> std::result::Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("invalid depth budget {value}, expected -1 or more"))
    }
}

impl From<DepthBudget> for i32 {
    fn from(value: DepthBudget) -> Self {
        value.0
    }
}

/// Ordered set of accepted MIME entries.
///
/// An entry ending in `/` or `/*` matches by prefix (`image/*` accepts any image); any
/// other entry must match exactly. Matching ignores ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaTypeSet {
    entries: Vec<MediaType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MediaType {
    Exact(String),
    Prefix(String),
}

impl MediaTypeSet {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for entry in entries {
            set.insert(entry.as_ref());
        }
        set
    }

    /// Parse a `;`-separated list such as `image/png;image/jpeg;video/*`.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(';'))
    }

    fn insert(&mut self, raw: &str) {
        let entry = raw.trim().to_ascii_lowercase();
        if entry.is_empty() {
            return;
        }
        let parsed = if let Some(prefix) = entry.strip_suffix('*') {
            MediaType::Prefix(prefix.to_string())
        } else if entry.ends_with('/') {
            MediaType::Prefix(entry)
        } else {
            MediaType::Exact(entry)
        };
        if !self.entries.contains(&parsed) {
            self.entries.push(parsed);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn matches(&self, mime: &str) -> bool {
        let mime = mime.to_ascii_lowercase();
        self.entries.iter().any(|entry| match entry {
            MediaType::Exact(exact) => *exact == mime,
            MediaType::Prefix(prefix) => mime.starts_with(prefix.as_str()),
        })
    }
}

/// Client feature flags, passed through the engine untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Features(Vec<String>);

impl Features {
    /// Parse a `,`-separated list such as `favorites,native_svg`.
    pub fn parse(list: &str) -> Self {
        Self(
            list.split(',')
                .map(str::trim)
                .filter(|feature| !feature.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.0.iter().any(|known| known == feature)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// A resolved folder together with the path it was reached under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderReference {
    /// Path of `folder` relative to the virtual root.
    pub path_from_root: String,
    pub folder: NodeRecord,
    /// True when the locator had to back off from the requested location.
    pub location_changed: bool,
    /// Set when the location pointed at a file; `folder` is then its parent.
    pub active_file: Option<NodeRecord>,
}

/// A media file as handed back to the caller, path already shortened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub path: String,
    pub node_id: NodeId,
    pub mimetype: String,
    pub mtime: u64,
    pub size: u64,
}

/// Description of the resolved album, used by clients for cache validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumInfo {
    pub path: String,
    pub node_id: NodeId,
    pub mtime: u64,
    pub size: u64,
    pub etag: String,
    pub owner: Option<String>,
    pub features: Features,
}
