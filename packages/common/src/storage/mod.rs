mod error;
mod hash;
mod location;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use hash::{ContentHash, Fingerprinter};
pub use location::BlobLocation;
pub use traits::{BlobStore, BoxReader, StagedBlob};
