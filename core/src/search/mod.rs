//! Folder resolution and media enumeration.

pub mod folder;
pub mod media;
pub mod policy;
pub mod walk;

pub use folder::{DEFAULT_MAX_BACKOFF, FolderLocator};
pub use media::filter_and_shorten;
pub use policy::{Availability, MountPolicy};
pub use walk::{Walk, walk};
