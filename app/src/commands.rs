use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use gallery_core::{
    Environment, Error, Features, FilesRequest, FilesResponse, FilesService, GalleryConfig,
    LocalStorage, MediaTypeSet, Principal,
};

use crate::Args;

/// What the shell prints: the files response, or the error a web boundary would return.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Files(FilesResponse),
    Failed(ErrorBody),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
}

impl From<Error> for ErrorBody {
    fn from(err: Error) -> Self {
        let status = match err {
            Error::NotFound(_) => 404,
            Error::Forbidden(_) => 403,
        };
        Self { status, message: err.message().to_string() }
    }
}

impl Reply {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Reply::Files(_) => ExitCode::SUCCESS,
            Reply::Failed(_) => ExitCode::FAILURE,
        }
    }
}

fn load_config(args: &Args) -> Result<GalleryConfig> {
    match &args.config {
        Some(path) => GalleryConfig::load(path),
        None => GalleryConfig::load_default(),
    }
}

fn principal(args: &Args) -> Option<Principal> {
    let user = args.user.as_deref()?;
    let principal = Principal::new(user);
    Some(match &args.display_name {
        Some(name) => principal.with_display_name(name),
        None => principal,
    })
}

/// Run one files request against the local tree named by `args`.
///
/// Engine failures become an [`ErrorBody`] reply; anything that stops the request from being
/// attempted at all (unreadable config, missing tree) is returned as an error.
pub fn files(args: &Args) -> Result<Reply> {
    let config = load_config(args)?;
    let storage = LocalStorage::new("local", &args.root)
        .with_context(|| format!("opening storage at {}", args.root.display()))?
        .with_mounts(config.mounts.iter().cloned());
    tracing::debug!(root = %storage.root().display(), "storage ready");

    let media_types = match &args.media_types {
        Some(list) => MediaTypeSet::parse(list),
        None => config.media_type_set(),
    };
    let mut request = FilesRequest::new(args.location.as_str())
        .with_features(Features::parse(&args.features))
        .with_media_types(media_types);
    if let Some(etag) = &args.etag {
        request = request.with_etag(etag.as_str());
    }
    if let Some(depth) = args.depth {
        request = request.with_depth(depth);
    }

    let reply = Environment::new(Arc::new(storage), &args.share, principal(args))
        .map(|env| FilesService::new(env, &config))
        .and_then(|service| service.get_files(&request));
    Ok(match reply {
        Ok(response) => Reply::Files(response),
        Err(err) => {
            tracing::warn!(location = %args.location, "request failed: {err}");
            Reply::Failed(err.into())
        }
    })
}
