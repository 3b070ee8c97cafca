use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use super::error::StorageError;
use super::traits::BoxReader;

/// Read buffer size used whenever a stream is fed through a digest.
pub(crate) const STREAM_BUF_SIZE: usize = 64 * 1024;

/// A validated SHA-256 fingerprint of file content.
///
/// Two uploads carry the same `ContentHash` iff their bytes are identical
/// (collisions are treated as impossible by construction).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Fingerprint an in-memory byte slice.
    pub fn compute(data: &[u8]) -> Self {
        let mut fp = Fingerprinter::new();
        fp.update(data);
        fp.finish()
    }

    /// Fingerprint an async stream, consuming it in bounded chunks.
    ///
    /// Returns the hash together with the number of bytes read. Read
    /// failures propagate as [`StorageError::Io`].
    pub async fn compute_stream(mut reader: BoxReader) -> Result<(Self, u64), StorageError> {
        let mut fp = Fingerprinter::new();
        let mut buf = vec![0u8; STREAM_BUF_SIZE];
        let mut total: u64 = 0;
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            total += n as u64;
            fp.update(&buf[..n]);
        }
        Ok((fp.finish(), total))
    }

    /// Construct from raw SHA-256 bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a 64-character hex-encoded fingerprint.
    pub fn from_hex(s: &str) -> Result<Self, StorageError> {
        if s.len() != 64 {
            return Err(StorageError::InvalidHash(format!(
                "expected 64 hex characters, got {}",
                s.len()
            )));
        }

        let bytes =
            hex::decode(s).map_err(|e| StorageError::InvalidHash(format!("invalid hex: {e}")))?;

        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| StorageError::InvalidHash("decoded to wrong length".into()))?;

        Ok(Self(arr))
    }

    /// The fingerprint as a 64-character lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Incremental SHA-256 fingerprinter.
///
/// Stateless beyond the running digest; feed it chunks in upload order and
/// call [`finish`](Self::finish) exactly once.
pub struct Fingerprinter {
    hasher: Sha256,
}

impl Fingerprinter {
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
    }

    pub fn finish(self) -> ContentHash {
        ContentHash(self.hasher.finalize().into())
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
