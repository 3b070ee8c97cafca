use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::StorageError;
use super::hash::ContentHash;

/// Opaque handle to one physical copy of file bytes.
///
/// On disk this is a git-style sharded relative path
/// (`{first 2 hex chars}/{remaining 62 hex chars}` of the content hash),
/// but callers must treat it as an opaque value: every record sharing a
/// fingerprint stores the identical `BlobLocation` string.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobLocation(String);

impl BlobLocation {
    /// Derive the canonical location for a content hash.
    pub fn for_hash(hash: &ContentHash) -> Self {
        let hex = hash.to_hex();
        Self(format!("{}/{}", &hex[..2], &hex[2..]))
    }

    /// Parse a stored location string, rejecting anything that is not a
    /// canonical sharded hash path (defense against path traversal through
    /// stored metadata).
    pub fn parse(s: &str) -> Result<Self, StorageError> {
        let (prefix, suffix) = s
            .split_once('/')
            .ok_or_else(|| StorageError::InvalidLocation(s.to_string()))?;
        if prefix.len() != 2
            || suffix.len() != 62
            || !prefix.chars().all(|c| c.is_ascii_hexdigit())
            || !suffix.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(StorageError::InvalidLocation(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shard directory component (first 2 hex chars).
    pub fn shard(&self) -> &str {
        &self.0[..2]
    }

    /// File name within the shard (remaining 62 hex chars).
    pub fn name(&self) -> &str {
        &self.0[3..]
    }
}

impl fmt::Debug for BlobLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobLocation({})", self.0)
    }
}

impl fmt::Display for BlobLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
