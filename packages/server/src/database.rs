use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::info;

pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .sqlx_logging(true);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("server::entity::*")
        .sync(&db)
        .await?;

    ensure_indexes(&db).await?;

    Ok(db)
}

/// Create the indexes the entity registry cannot express.
///
/// The partial unique index is the storage-layer guarantee behind
/// deduplication: at most one record per fingerprint may be the original.
/// A concurrent ingest losing this race sees a unique-constraint violation
/// and falls back to the duplicate path (see `dedup::ingest`). Its creation
/// failing is therefore fatal, unlike the ordinary query index.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    db.execute_unprepared(
        "CREATE UNIQUE INDEX IF NOT EXISTS ux_file_record_original_sha256 \
         ON file_record (sha256) WHERE is_duplicate = FALSE",
    )
    .await?;
    info!("Ensured unique index ux_file_record_original_sha256 exists");

    // Backs the reverse-chronological ordering contract of search/list.
    let result = db
        .execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_file_record_uploaded_at \
             ON file_record (uploaded_at)",
        )
        .await;
    match result {
        Ok(_) => info!("Ensured index idx_file_record_uploaded_at exists"),
        Err(e) => tracing::warn!("Failed to create index idx_file_record_uploaded_at: {}", e),
    }

    Ok(())
}
