//! The metadata search filter.
//!
//! Raw query parameters arrive as optional strings; [`SearchFilters::parse`]
//! validates each independently into typed bounds before any query runs, so
//! a malformed parameter fails the whole operation with a 400 naming the
//! field and touches no rows.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, ExprTrait, QueryFilter, QueryOrder, Select,
};
use serde::Deserialize;

use crate::entity::file_record;
use crate::error::AppError;

/// Raw search parameters as received on the wire.
///
/// Blank values count as absent, matching the original API's behavior for
/// `?size_min=`-style queries.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct SearchQuery {
    /// Case-insensitive substring match against the original filename.
    pub filename: Option<String>,
    /// Exact match against the declared MIME type.
    pub file_type: Option<String>,
    /// Inclusive lower bound on size in bytes.
    pub size_min: Option<String>,
    /// Inclusive upper bound on size in bytes.
    pub size_max: Option<String>,
    /// Inclusive lower calendar-day bound (YYYY-MM-DD) on the upload date.
    pub date_from: Option<String>,
    /// Inclusive upper calendar-day bound (YYYY-MM-DD) on the upload date.
    pub date_to: Option<String>,
}

/// Validated, typed search filters. All filters are optional and
/// conjunctive.
#[derive(Debug, PartialEq)]
pub struct SearchFilters {
    pub filename: Option<String>,
    pub file_type: Option<String>,
    pub size_min: Option<i64>,
    pub size_max: Option<i64>,
    /// `uploaded_at >= this` (start of `date_from`, UTC).
    pub uploaded_after: Option<DateTime<Utc>>,
    /// `uploaded_at < this` (start of the day after `date_to`, UTC), so the
    /// whole of `date_to` is included regardless of time of day.
    pub uploaded_before: Option<DateTime<Utc>>,
}

impl SearchFilters {
    pub fn parse(query: SearchQuery) -> Result<Self, AppError> {
        let size_min = match present(query.size_min) {
            Some(raw) => Some(parse_size(&raw, "size_min")?),
            None => None,
        };
        let size_max = match present(query.size_max) {
            Some(raw) => Some(parse_size(&raw, "size_max")?),
            None => None,
        };

        let uploaded_after = match present(query.date_from) {
            Some(raw) => Some(day_start(parse_date(&raw, "date_from")?)),
            None => None,
        };
        let uploaded_before = match present(query.date_to) {
            Some(raw) => {
                let date = parse_date(&raw, "date_to")?;
                let next = date
                    .succ_opt()
                    .ok_or_else(|| AppError::Validation("date_to out of range".into()))?;
                Some(day_start(next))
            }
            None => None,
        };

        Ok(Self {
            filename: present(query.filename),
            file_type: present(query.file_type),
            size_min,
            size_max,
            uploaded_after,
            uploaded_before,
        })
    }

    /// Apply the filters to a select. Ordering is part of the contract:
    /// results are reverse-chronological by `uploaded_at`.
    fn apply(self, mut select: Select<file_record::Entity>) -> Select<file_record::Entity> {
        if let Some(filename) = self.filename {
            let term = escape_like(&filename).to_lowercase();
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(file_record::Column::OriginalFilename)))
                    .like(LikeExpr::new(format!("%{term}%")).escape('\\')),
            );
        }
        if let Some(file_type) = self.file_type {
            select = select.filter(file_record::Column::FileType.eq(file_type));
        }
        if let Some(min) = self.size_min {
            select = select.filter(file_record::Column::Size.gte(min));
        }
        if let Some(max) = self.size_max {
            select = select.filter(file_record::Column::Size.lte(max));
        }
        if let Some(after) = self.uploaded_after {
            select = select.filter(file_record::Column::UploadedAt.gte(after));
        }
        if let Some(before) = self.uploaded_before {
            select = select.filter(file_record::Column::UploadedAt.lt(before));
        }

        select.order_by_desc(file_record::Column::UploadedAt)
    }
}

/// Run a search with the given validated filters.
pub async fn search(
    db: &DatabaseConnection,
    filters: SearchFilters,
) -> Result<Vec<file_record::Model>, AppError> {
    Ok(filters.apply(file_record::Entity::find()).all(db).await?)
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn parse_size(raw: &str, param: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::Validation(format!("Invalid {param} format")))
}

fn parse_date(raw: &str, param: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid {param} format (YYYY-MM-DD)")))
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc()
}

/// Escape LIKE wildcard characters in a search term.
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
