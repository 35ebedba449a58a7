use thiserror::Error;

use crate::EntityKind;

/// Errors produced by the entity cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// An incoming server view matches none of the known shapes for its kind.
    #[error("Shape mismatch for {kind}: {reason}")]
    ShapeMismatch { kind: EntityKind, reason: String },
}

impl CacheError {
    pub(crate) fn shape(kind: EntityKind, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::error!(%kind, %reason, "rejected server view");
        Self::ShapeMismatch { kind, reason }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CacheError>;
