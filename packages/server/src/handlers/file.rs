use axum::extract::multipart::Field;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, body::Body};
use common::storage::{BlobLocation, BoxReader};
use sea_orm::EntityTrait;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::instrument;
use uuid::Uuid;

use crate::dedup::{self, IngestMetadata};
use crate::entity::file_record;
use crate::error::{AppError, ErrorBody};
use crate::models::file::FileResponse;
use crate::search::{self, SearchFilters, SearchQuery};
use crate::state::AppState;
use crate::stats::{self, StatsSnapshot};

/// Request body limit for uploads, sized from the configured blob limit.
pub fn upload_body_limit(max_blob_size: u64) -> DefaultBodyLimit {
    // Headroom for multipart framing around the blob itself.
    let limit = usize::try_from(max_blob_size).unwrap_or(usize::MAX);
    DefaultBodyLimit::max(limit.saturating_add(64 * 1024))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Files",
    operation_id = "uploadFile",
    summary = "Upload a file",
    description = "Uploads a file from the required `file` multipart field. Content is \
        fingerprinted with SHA-256; if identical content was uploaded before, no new bytes \
        are stored and the created record links to the original.",
    request_body(content_type = "multipart/form-data", description = "File upload"),
    responses(
        (status = 201, description = "Record created", body = FileResponse),
        (status = 400, description = "No file provided or multipart error", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FileResponse>), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "upload".to_string());
                let declared_type = field.content_type().map(|s| s.to_string());

                let content_type = declared_type
                    .or_else(|| {
                        mime_guess::from_path(&filename)
                            .first()
                            .map(|m| m.to_string())
                    })
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                let meta = IngestMetadata {
                    filename,
                    content_type,
                };
                let record = spool_and_ingest(&state, field, meta).await?;

                return Ok((StatusCode::CREATED, Json(FileResponse::from(record))));
            }
            _ => {} // Ignore unknown fields.
        }
    }

    Err(AppError::Validation("No file provided".into()))
}

/// Stream a multipart field through a temp file into the ingest engine.
///
/// Chunks are written through as they arrive, so an upload never occupies
/// more memory than one multipart chunk regardless of its size.
async fn spool_and_ingest(
    state: &AppState,
    mut field: Field<'_>,
    meta: IngestMetadata,
) -> Result<file_record::Model, AppError> {
    let temp_path = std::env::temp_dir().join(format!("depot-upload-{}", Uuid::new_v4()));
    let max_size = state.config.storage.max_blob_size;

    let result = async {
        let mut temp_file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create temp file: {e}")))?;

        let mut total_size: u64 = 0;

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
        {
            total_size += chunk.len() as u64;
            if total_size > max_size {
                return Err(AppError::Validation(format!(
                    "File exceeds maximum size of {max_size} bytes"
                )));
            }
            temp_file
                .write_all(&chunk)
                .await
                .map_err(|e| AppError::Internal(format!("Temp file write failed: {e}")))?;
        }

        temp_file
            .flush()
            .await
            .map_err(|e| AppError::Internal(format!("Temp file flush failed: {e}")))?;
        drop(temp_file);

        let file = tokio::fs::File::open(&temp_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to reopen temp file: {e}")))?;
        let reader: BoxReader = Box::new(file);

        dedup::ingest(&state.db, &*state.blob_store, reader, meta).await
    }
    .await;

    let _ = tokio::fs::remove_file(&temp_path).await;
    result
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Files",
    operation_id = "listFiles",
    summary = "List all file records",
    description = "Returns every record, duplicates included, newest first.",
    responses(
        (status = 200, description = "All records", body = [FileResponse]),
    ),
)]
#[instrument(skip(state))]
pub async fn list_files(
    State(state): State<AppState>,
) -> Result<Json<Vec<FileResponse>>, AppError> {
    let filters = SearchFilters::parse(SearchQuery::default())?;
    let records = search::search(&state.db, filters).await?;
    Ok(Json(records.into_iter().map(FileResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/search",
    tag = "Files",
    operation_id = "searchFiles",
    summary = "Search file records by metadata",
    description = "All filters are optional and combined with AND. `date_to` includes the \
        entire named day. Results are ordered newest first.",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching records", body = [FileResponse]),
        (status = 400, description = "Malformed numeric or date parameter", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn search_files(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<FileResponse>>, AppError> {
    let filters = SearchFilters::parse(query)?;
    let records = search::search(&state.db, filters).await?;
    Ok(Json(records.into_iter().map(FileResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/stats",
    tag = "Files",
    operation_id = "fileStats",
    summary = "Aggregate storage statistics",
    description = "Physical vs logical size accounting over all records. All fields are \
        zero when no files have been uploaded.",
    responses(
        (status = 200, description = "Stats snapshot", body = StatsSnapshot),
    ),
)]
#[instrument(skip(state))]
pub async fn file_stats(State(state): State<AppState>) -> Result<Json<StatsSnapshot>, AppError> {
    Ok(Json(stats::compute_stats(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Files",
    operation_id = "getFile",
    summary = "Get a file record by ID",
    params(("id" = String, Path, description = "Record ID (UUID)")),
    responses(
        (status = 200, description = "Record", body = FileResponse),
        (status = 400, description = "Malformed ID", body = ErrorBody),
        (status = 404, description = "Record not found", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FileResponse>, AppError> {
    let record = find_record(&state, &id).await?;
    Ok(Json(FileResponse::from(record)))
}

#[utoipa::path(
    get,
    path = "/{id}/download",
    tag = "Files",
    operation_id = "downloadFile",
    summary = "Download file content",
    description = "Streams the stored bytes. Duplicate records stream from the shared \
        physical copy. Supports ETag caching via If-None-Match.",
    params(("id" = String, Path, description = "Record ID (UUID)")),
    responses(
        (status = 200, description = "File content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 404, description = "Record or blob not found", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers), fields(id))]
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let record = find_record(&state, &id).await?;

    if let Some(sha256) = record.sha256.as_deref() {
        let etag_value = format!("\"{sha256}\"");
        if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
            && let Ok(val) = if_none_match.to_str()
            && (val == etag_value || val == "*")
        {
            return Ok(StatusCode::NOT_MODIFIED.into_response());
        }
    }

    let location = BlobLocation::parse(&record.storage_path)
        .map_err(|e| AppError::Internal(format!("Corrupt storage path on record: {e}")))?;
    let reader = state.blob_store.get_stream(&location).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, record.file_type.as_str())
        .header(header::CONTENT_LENGTH, record.size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&record.original_filename),
        );
    if let Some(sha256) = record.sha256.as_deref() {
        builder = builder.header(header::ETAG, format!("\"{sha256}\""));
    }

    builder
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

async fn find_record(state: &AppState, id: &str) -> Result<file_record::Model, AppError> {
    let uuid = Uuid::parse_str(id).map_err(|_| AppError::Validation("Invalid file ID".into()))?;

    file_record::Entity::find_by_id(uuid)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".into()))
}

/// Build a safe `Content-Disposition` header value.
fn content_disposition_value(filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_safe.is_empty() {
        "download".to_string()
    } else {
        ascii_safe
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => String::from(b as char),
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!("inline; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}
