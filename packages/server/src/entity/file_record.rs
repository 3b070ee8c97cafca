use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One logical upload event.
///
/// Records are append-only: created once by the deduplication engine at
/// upload completion and never mutated or deleted. For a given `sha256`,
/// exactly one record has `is_duplicate = false` (enforced by the partial
/// unique index created in `database::ensure_indexes`); every other record
/// with that fingerprint points at it via `original_file_id` and shares its
/// `storage_path`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "file_record")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Opaque blob store location. Identical for every record with the
    /// same `sha256`.
    pub storage_path: String,

    /// Client-supplied name at upload time. Display-only.
    pub original_filename: String,

    /// Client-declared MIME type. Not verified against the bytes.
    pub file_type: String,

    /// Byte length of the uploaded content.
    pub size: i64,

    pub uploaded_at: DateTimeUtc,

    /// SHA-256 fingerprint, 64 lowercase hex chars. Nullable only for
    /// records that predate fingerprinting; current ingestion always sets it.
    pub sha256: Option<String>,

    pub is_duplicate: bool,

    /// The one non-duplicate record for this fingerprint. Non-null iff
    /// `is_duplicate`; never points at another duplicate.
    pub original_file_id: Option<Uuid>,
}

impl ActiveModelBehavior for ActiveModel {}
