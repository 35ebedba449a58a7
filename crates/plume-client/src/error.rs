use thiserror::Error;

use plume_cache::CacheError;
use plume_shared::IdError;

/// Errors produced by the client layer.
#[derive(Error, Debug)]
pub enum ClientError {
    /// A server view was rejected by the entity cache.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Identifier error: {0}")]
    Id(#[from] IdError),

    /// Error reported by the transport collaborator.
    #[error("Transport error: {0}")]
    Transport(#[from] anyhow::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Some batches of a chunked write failed; remote state is unknown.
    #[error("{failed} of {total} write batches failed")]
    PartialWrite { failed: usize, total: usize },

    /// The fetch was cancelled before it resolved.
    #[error("Fetch cancelled")]
    Cancelled,

    /// A response or cache entry lacked data the caller needed.
    #[error("Missing data: {0}")]
    MissingData(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
