//! Failure kinds surfaced by the search services.

use thiserror::Error;

/// Structural failures. Anything else is either suppressed by a predicate or mapped onto
/// one of these two kinds before it leaves the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The path or node is absent, or a directory listing failed.
    #[error("not found: {0}")]
    NotFound(String),
    /// The node exists but is unreadable or disallowed by the mount policy.
    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl Error {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// The carried message, without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(message) | Self::Forbidden(message) => message,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
