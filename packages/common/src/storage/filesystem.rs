use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

use super::error::StorageError;
use super::hash::{Fingerprinter, STREAM_BUF_SIZE};
use super::location::BlobLocation;
use super::traits::{BlobStore, BoxReader, StagedBlob};

/// Filesystem-backed blob store.
///
/// Durable blobs live in a git-style sharded layout under `base_path`
/// (`{first 2 hex chars}/{remaining 62 hex chars}` of the content hash);
/// staged blobs live under `base_path/.tmp` until committed or discarded.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    fn blob_path(&self, location: &BlobLocation) -> PathBuf {
        self.base_path.join(location.shard()).join(location.name())
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn stage(&self, mut reader: BoxReader) -> Result<StagedBlob, StorageError> {
        let temp_path = self.temp_path();
        let mut fingerprinter = Fingerprinter::new();
        let mut total_bytes: u64 = 0;

        let mut buf = vec![0u8; STREAM_BUF_SIZE];
        let mut temp_file = fs::File::create(&temp_path).await?;

        let spool = async {
            loop {
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    break;
                }

                total_bytes += n as u64;
                if total_bytes > self.max_size {
                    return Err(StorageError::SizeLimitExceeded {
                        actual: total_bytes,
                        limit: self.max_size,
                    });
                }

                fingerprinter.update(&buf[..n]);
                temp_file.write_all(&buf[..n]).await?;
            }

            temp_file.flush().await?;
            Ok(())
        }
        .await;

        drop(temp_file);
        if let Err(e) = spool {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        Ok(StagedBlob {
            hash: fingerprinter.finish(),
            size: total_bytes,
            temp_path,
        })
    }

    async fn commit(&self, staged: StagedBlob) -> Result<BlobLocation, StorageError> {
        let location = BlobLocation::for_hash(&staged.hash);
        let blob_path = self.blob_path(&location);

        // Content-addressed: identical bytes are already in place.
        if fs::try_exists(&blob_path).await? {
            let _ = fs::remove_file(&staged.temp_path).await;
            return Ok(location);
        }

        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&staged.temp_path, &blob_path).await {
            let _ = fs::remove_file(&staged.temp_path).await;
            return Err(e.into());
        }

        Ok(location)
    }

    async fn discard(&self, staged: StagedBlob) -> Result<(), StorageError> {
        fs::remove_file(&staged.temp_path).await?;
        Ok(())
    }

    async fn get_stream(&self, location: &BlobLocation) -> Result<BoxReader, StorageError> {
        let blob_path = self.blob_path(location);
        match fs::File::open(&blob_path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(location.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, location: &BlobLocation) -> Result<bool, StorageError> {
        Ok(fs::try_exists(&self.blob_path(location)).await?)
    }
}
