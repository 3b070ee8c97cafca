//! The deduplication engine.
//!
//! Every upload passes through [`ingest`]: the content is spooled and
//! fingerprinted in a single pass, then either linked to the existing
//! original for that fingerprint or committed as new physical content.
//! The at-most-one-original invariant is owned jointly with the partial
//! unique index created in `database::ensure_indexes`.

use chrono::Utc;
use common::storage::{BlobStore, BoxReader};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};
use tracing::instrument;
use uuid::Uuid;

use crate::entity::file_record;
use crate::error::AppError;

/// Client-supplied metadata accompanying an upload, validated at the HTTP
/// boundary before it reaches the engine.
pub struct IngestMetadata {
    pub filename: String,
    pub content_type: String,
}

/// Ingest one upload and return the created record.
///
/// The content stream is consumed exactly once; staging both hashes and
/// spools it, so neither the fingerprint nor the bytes are lost when the
/// other is needed. Duplicate content writes nothing to durable blob
/// storage.
#[instrument(skip(db, blob_store, content, meta), fields(filename = %meta.filename))]
pub async fn ingest(
    db: &DatabaseConnection,
    blob_store: &dyn BlobStore,
    content: BoxReader,
    meta: IngestMetadata,
) -> Result<file_record::Model, AppError> {
    let staged = blob_store.stage(content).await?;
    let sha256 = staged.hash.to_hex();
    let size = i64::try_from(staged.size).unwrap_or(i64::MAX);

    if let Some(original) = find_original(db, &sha256).await? {
        // Temp cleanup must not fail an otherwise successful ingest.
        if let Err(e) = blob_store.discard(staged).await {
            tracing::warn!(sha256, "Failed to discard staged duplicate blob: {}", e);
        }
        tracing::debug!(sha256, original_id = %original.id, "Content already stored, linking duplicate");
        return insert_duplicate(db, &meta, size, &sha256, &original).await;
    }

    // New content: make the bytes durable before any record exists, so a
    // failed commit leaves no partial write visible.
    let location = blob_store.commit(staged).await?;

    let record = file_record::ActiveModel {
        id: Set(Uuid::now_v7()),
        storage_path: Set(location.to_string()),
        original_filename: Set(meta.filename.clone()),
        file_type: Set(meta.content_type.clone()),
        size: Set(size),
        uploaded_at: Set(Utc::now()),
        sha256: Set(Some(sha256.clone())),
        is_duplicate: Set(false),
        original_file_id: Set(None),
    };

    match record.insert(db).await {
        Ok(model) => Ok(model),
        Err(e) if is_unique_violation(&e) => {
            // A concurrent ingest of the same content committed first. Its
            // record is visible now, so the second lookup cannot miss; our
            // committed blob occupies the same content-addressed location
            // the winner recorded, so nothing is orphaned.
            tracing::debug!(sha256, "Lost original-insert race, retrying as duplicate");
            let original = find_original(db, &sha256).await?.ok_or_else(|| {
                AppError::Internal("original record missing after insert conflict".into())
            })?;
            insert_duplicate(db, &meta, size, &sha256, &original).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Look up the one non-duplicate record for a fingerprint, if any.
async fn find_original(
    db: &DatabaseConnection,
    sha256: &str,
) -> Result<Option<file_record::Model>, AppError> {
    Ok(file_record::Entity::find()
        .filter(file_record::Column::Sha256.eq(sha256))
        .filter(file_record::Column::IsDuplicate.eq(false))
        .one(db)
        .await?)
}

/// Insert a duplicate record pointing at `original`.
///
/// Duplicate chains are flattened to depth 1: `original` is always the
/// non-duplicate record, so `original_file_id` never points at another
/// duplicate.
async fn insert_duplicate(
    db: &DatabaseConnection,
    meta: &IngestMetadata,
    size: i64,
    sha256: &str,
    original: &file_record::Model,
) -> Result<file_record::Model, AppError> {
    let record = file_record::ActiveModel {
        id: Set(Uuid::now_v7()),
        storage_path: Set(original.storage_path.clone()),
        original_filename: Set(meta.filename.clone()),
        file_type: Set(meta.content_type.clone()),
        size: Set(size),
        uploaded_at: Set(Utc::now()),
        sha256: Set(Some(sha256.to_string())),
        is_duplicate: Set(true),
        original_file_id: Set(Some(original.id)),
    };

    Ok(record.insert(db).await?)
}

fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
