use thiserror::Error;

/// Errors from blob storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No blob exists at the given location.
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The provided content hash is not a valid SHA-256 hex string.
    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    /// The stored location string is not a canonical sharded path.
    #[error("invalid blob location: {0}")]
    InvalidLocation(String),

    /// The blob exceeds the configured size limit.
    #[error("blob exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },
}
