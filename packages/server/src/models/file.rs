use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::entity::file_record;

/// Serialized File Record as exposed on the wire.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FileResponse {
    /// Record ID (UUIDv7).
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001")]
    pub id: Uuid,
    /// Opaque physical storage location. Duplicates share their original's
    /// value.
    #[schema(example = "a1/b2c3d4...")]
    pub file: String,
    /// Filename supplied at upload time.
    #[schema(example = "report.pdf")]
    pub original_filename: String,
    /// Declared MIME type.
    #[schema(example = "application/pdf")]
    pub file_type: String,
    /// Content size in bytes.
    #[schema(example = 142857)]
    pub size: i64,
    pub uploaded_at: DateTime<Utc>,
    /// SHA-256 content fingerprint; null only for legacy records.
    pub sha256: Option<String>,
    pub is_duplicate: bool,
    /// ID of the original record when this one is a duplicate.
    pub original_file: Option<Uuid>,
}

impl From<file_record::Model> for FileResponse {
    fn from(model: file_record::Model) -> Self {
        Self {
            id: model.id,
            file: model.storage_path,
            original_filename: model.original_filename,
            file_type: model.file_type,
            size: model.size,
            uploaded_at: model.uploaded_at,
            sha256: model.sha256,
            is_duplicate: model.is_duplicate,
            original_file: model.original_file_id,
        }
    }
}
