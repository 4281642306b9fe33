//! # Status Repository
//!
//! Frame status definitions. Guards against editing protected statuses live
//! in `jazzy_core::status`; this module only stores.

use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use jazzy_core::{ColorScheme, FrameStatus, FrameStatusSummary};

#[derive(Debug, Clone)]
pub struct StatusRepository {
    pool: SqlitePool,
}

impl StatusRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StatusRepository { pool }
    }

    /// All statuses in display order, with how many frames carry each.
    pub async fn list(&self) -> DbResult<Vec<FrameStatusSummary>> {
        list_with_counts(&self.pool).await
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<FrameStatus>> {
        fetch(&self.pool, id).await
    }

    pub async fn find_by_name(&self, name: &str) -> DbResult<Option<FrameStatus>> {
        find_by_name(&self.pool, name).await
    }
}

// =============================================================================
// Executor Functions
// =============================================================================

pub async fn list_with_counts<'e>(db: impl SqliteExecutor<'e>) -> DbResult<Vec<FrameStatusSummary>> {
    let statuses = sqlx::query_as::<_, FrameStatusSummary>(
        r#"
        SELECT
            s.id, s.name, s.color_scheme, s.is_protected, s.display_order,
            (SELECT COUNT(*) FROM frames f WHERE f.status_id = s.id) AS product_count
        FROM frame_statuses s
        ORDER BY s.display_order, s.id
        "#,
    )
    .fetch_all(db)
    .await?;
    Ok(statuses)
}

pub async fn list<'e>(db: impl SqliteExecutor<'e>) -> DbResult<Vec<FrameStatus>> {
    let statuses = sqlx::query_as::<_, FrameStatus>(
        "SELECT id, name, color_scheme, is_protected, display_order FROM frame_statuses ORDER BY display_order, id",
    )
    .fetch_all(db)
    .await?;
    Ok(statuses)
}

pub async fn fetch<'e>(db: impl SqliteExecutor<'e>, id: i64) -> DbResult<Option<FrameStatus>> {
    let status = sqlx::query_as::<_, FrameStatus>(
        "SELECT id, name, color_scheme, is_protected, display_order FROM frame_statuses WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(status)
}

/// Case-insensitive lookup; names are unique ignoring case.
pub async fn find_by_name<'e>(db: impl SqliteExecutor<'e>, name: &str) -> DbResult<Option<FrameStatus>> {
    let status = sqlx::query_as::<_, FrameStatus>(
        r#"
        SELECT id, name, color_scheme, is_protected, display_order
        FROM frame_statuses WHERE name = ?1 COLLATE NOCASE
        "#,
    )
    .bind(name.trim())
    .fetch_optional(db)
    .await?;
    Ok(status)
}

/// Inserts an unprotected status and returns it.
pub async fn insert<'e>(
    db: impl SqliteExecutor<'e>,
    name: &str,
    color_scheme: ColorScheme,
    display_order: i64,
) -> DbResult<FrameStatus> {
    debug!(name = %name, "Creating frame status");

    let result = sqlx::query(
        "INSERT INTO frame_statuses (name, color_scheme, is_protected, display_order) VALUES (?1, ?2, 0, ?3)",
    )
    .bind(name)
    .bind(color_scheme)
    .bind(display_order)
    .execute(db)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { .. } => DbError::duplicate("status name", name),
        other => other,
    })?;

    Ok(FrameStatus {
        id: result.last_insert_rowid(),
        name: name.to_string(),
        color_scheme,
        is_protected: false,
        display_order,
    })
}

pub async fn update<'e>(db: impl SqliteExecutor<'e>, status: &FrameStatus) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE frame_statuses SET name = ?2, color_scheme = ?3, display_order = ?4 WHERE id = ?1",
    )
    .bind(status.id)
    .bind(&status.name)
    .bind(status.color_scheme)
    .bind(status.display_order)
    .execute(db)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { .. } => DbError::duplicate("status name", &status.name),
        other => other,
    })?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Frame status", status.id));
    }
    Ok(())
}

pub async fn delete<'e>(db: impl SqliteExecutor<'e>, id: i64) -> DbResult<()> {
    let result = sqlx::query("DELETE FROM frame_statuses WHERE id = ?1")
        .bind(id)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Frame status", id));
    }
    Ok(())
}

pub async fn count_products<'e>(db: impl SqliteExecutor<'e>, id: i64) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM frames WHERE status_id = ?1")
        .bind(id)
        .fetch_one(db)
        .await?;
    Ok(count)
}
