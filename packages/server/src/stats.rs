//! Aggregate storage statistics.

use sea_orm::prelude::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter, QuerySelect,
};
use serde::Serialize;

use crate::entity::file_record;
use crate::error::AppError;

/// Self-consistent snapshot of storage usage across all records.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StatsSnapshot {
    /// Sum of `size` over non-duplicate records: bytes actually stored.
    pub total_physical_size: i64,
    /// Sum of `size` over all records: bytes as clients see them.
    pub total_logical_size: i64,
    /// `total_logical_size - total_physical_size`. Never negative.
    pub saved_space: i64,
    pub deduplicated_files_count: i64,
    pub original_files_count: i64,
    pub total_files_count: i64,
}

#[derive(FromQueryResult)]
struct SideAggregate {
    total_size: i64,
    file_count: i64,
}

/// Compute the stats snapshot. Always succeeds on a reachable database;
/// an empty table yields all zeroes.
pub async fn compute_stats(db: &DatabaseConnection) -> Result<StatsSnapshot, AppError> {
    let originals = aggregate_side(db, false).await?;
    let duplicates = aggregate_side(db, true).await?;

    let total_physical_size = originals.total_size;
    let total_logical_size = originals.total_size + duplicates.total_size;

    Ok(StatsSnapshot {
        total_physical_size,
        total_logical_size,
        saved_space: total_logical_size - total_physical_size,
        deduplicated_files_count: duplicates.file_count,
        original_files_count: originals.file_count,
        total_files_count: originals.file_count + duplicates.file_count,
    })
}

/// SUM(size) and COUNT(*) over one side of the `is_duplicate` split.
///
/// The CAST keeps the decoded type stable across backends (Postgres sums
/// BIGINT into NUMERIC).
async fn aggregate_side(
    db: &DatabaseConnection,
    duplicates: bool,
) -> Result<SideAggregate, AppError> {
    let row = file_record::Entity::find()
        .select_only()
        .column_as(
            Expr::cust("CAST(COALESCE(SUM(size), 0) AS BIGINT)"),
            "total_size",
        )
        .column_as(file_record::Column::Id.count(), "file_count")
        .filter(file_record::Column::IsDuplicate.eq(duplicates))
        .into_model::<SideAggregate>()
        .one(db)
        .await?;

    Ok(row.unwrap_or(SideAggregate {
        total_size: 0,
        file_count: 0,
    }))
}
