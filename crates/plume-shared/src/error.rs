use thiserror::Error;

/// Errors produced while parsing identifiers received from the server.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("Invalid DID: {0}")]
    InvalidDid(String),

    #[error("Invalid AT-URI: {0}")]
    InvalidAtUri(String),

    #[error("Invalid entity key: {0}")]
    InvalidEntityKey(String),
}
