use std::io::Cursor;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::hash::ContentHash;
use super::location::BlobLocation;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Content spooled to temporary storage and fingerprinted, but not yet
/// durable.
///
/// Produced by [`BlobStore::stage`]; must be passed to exactly one of
/// [`BlobStore::commit`] or [`BlobStore::discard`]. Dropping a staged blob
/// without doing either leaves a temp file behind.
pub struct StagedBlob {
    pub hash: ContentHash,
    pub size: u64,
    pub temp_path: PathBuf,
}

/// Durable blob storage addressed by opaque locations.
///
/// The staging cycle exists so callers can learn a stream's fingerprint
/// before deciding whether its bytes need to be kept at all: an ingest that
/// turns out to be a duplicate discards its staged copy and never writes to
/// durable storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Spool a stream to temporary storage, computing its fingerprint and
    /// size in the same single pass.
    async fn stage(&self, reader: BoxReader) -> Result<StagedBlob, StorageError>;

    /// Move a staged blob into durable storage and return its location.
    ///
    /// Idempotent with respect to content: committing bytes that are
    /// already stored drops the temp copy and returns the existing
    /// location.
    async fn commit(&self, staged: StagedBlob) -> Result<BlobLocation, StorageError>;

    /// Drop a staged blob without persisting it.
    async fn discard(&self, staged: StagedBlob) -> Result<(), StorageError>;

    /// Store an in-memory buffer and return its location.
    async fn put(&self, data: &[u8]) -> Result<BlobLocation, StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        let staged = self.stage(reader).await?;
        self.commit(staged).await
    }

    /// Retrieve all bytes stored at a location.
    async fn get(&self, location: &BlobLocation) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(location).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve a blob as a streaming async reader.
    async fn get_stream(&self, location: &BlobLocation) -> Result<BoxReader, StorageError>;

    /// Check whether a blob exists at a location.
    async fn exists(&self, location: &BlobLocation) -> Result<bool, StorageError>;
}
