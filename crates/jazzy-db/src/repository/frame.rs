//! # Frame Repository
//!
//! Database operations for frames (products).
//!
//! Reads go through [`FrameRepository`] on the pool. Writes are free
//! functions over any executor so the engine can run them on its unit of
//! work's connection.
//!
//! ## Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  query "gg00"                                                           │
//! │       │                                                                 │
//! │       ├── composite_id LIKE 'gg00%'     (ids are typed from the left)   │
//! │       ├── brand_name   LIKE '%gg00%'                                    │
//! │       └── style_number LIKE '%gg00%'                                    │
//! │                                                                         │
//! │  SQLite LIKE is case-insensitive for ASCII                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use jazzy_core::{Frame, FrameListing};

const FRAME_COLUMNS: &str = r#"
    composite_id, brand_id, status_id, style_number, color_code, eye_size,
    gender, frame_type, product_type, current_qty, created_at, updated_at
"#;

/// Listing columns; prices come from the frame's latest ORDER entry.
const LISTING_SELECT: &str = r#"
    SELECT
        f.composite_id, f.brand_id, f.status_id, f.style_number, f.color_code,
        f.eye_size, f.gender, f.frame_type, f.product_type, f.current_qty,
        f.created_at, f.updated_at,
        b.brand_name,
        s.name AS status_name,
        COALESCE(o.unit_cost_cents, 0) AS cost_price_cents,
        COALESCE(o.unit_price_cents, 0) AS retail_price_cents
    FROM frames f
    JOIN brands b ON b.id = f.brand_id
    JOIN frame_statuses s ON s.id = f.status_id
    LEFT JOIN inventory_transactions o ON o.id = (
        SELECT t.id FROM inventory_transactions t
        WHERE t.frame_id = f.composite_id AND t.transaction_type = 'ORDER'
        ORDER BY t.transaction_date DESC, t.id DESC
        LIMIT 1
    )
"#;

/// Repository for frame reads.
#[derive(Debug, Clone)]
pub struct FrameRepository {
    pool: SqlitePool,
}

impl FrameRepository {
    pub fn new(pool: SqlitePool) -> Self {
        FrameRepository { pool }
    }

    pub async fn get(&self, composite_id: &str) -> DbResult<Option<Frame>> {
        fetch(&self.pool, composite_id).await
    }

    pub async fn get_listing(&self, composite_id: &str) -> DbResult<Option<FrameListing>> {
        let sql = format!("{LISTING_SELECT} WHERE f.composite_id = ?1");
        let listing = sqlx::query_as::<_, FrameListing>(&sql)
            .bind(composite_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(listing)
    }

    /// Searches frames by id prefix, brand name or style number, newest
    /// first. An empty query lists everything.
    pub async fn search(
        &self,
        query: &str,
        status_id: Option<i64>,
        limit: u32,
    ) -> DbResult<Vec<FrameListing>> {
        let query = query.trim();
        debug!(query = %query, ?status_id, limit, "Searching frames");

        let sql = format!(
            r#"{LISTING_SELECT}
            WHERE (?1 = ''
                   OR f.composite_id LIKE ?1 || '%'
                   OR b.brand_name LIKE '%' || ?1 || '%'
                   OR f.style_number LIKE '%' || ?1 || '%')
              AND (?2 IS NULL OR f.status_id = ?2)
            ORDER BY f.created_at DESC, f.composite_id
            LIMIT ?3"#
        );
        let frames = sqlx::query_as::<_, FrameListing>(&sql)
            .bind(query)
            .bind(status_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = frames.len(), "Search returned frames");
        Ok(frames)
    }

    /// Every frame id, for the audit sweep.
    pub async fn all_ids(&self) -> DbResult<Vec<String>> {
        let ids = sqlx::query_scalar("SELECT composite_id FROM frames ORDER BY composite_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM frames")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Executor Functions
// =============================================================================

pub async fn fetch<'e>(db: impl SqliteExecutor<'e>, composite_id: &str) -> DbResult<Option<Frame>> {
    let sql = format!("SELECT {FRAME_COLUMNS} FROM frames WHERE composite_id = ?1");
    let frame = sqlx::query_as::<_, Frame>(&sql)
        .bind(composite_id)
        .fetch_optional(db)
        .await?;
    Ok(frame)
}

pub async fn exists<'e>(db: impl SqliteExecutor<'e>, composite_id: &str) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM frames WHERE composite_id = ?1")
        .bind(composite_id)
        .fetch_optional(db)
        .await?;
    Ok(found.is_some())
}

pub async fn insert<'e>(db: impl SqliteExecutor<'e>, frame: &Frame) -> DbResult<()> {
    debug!(frame_id = %frame.composite_id, "Inserting frame");

    sqlx::query(
        r#"
        INSERT INTO frames (
            composite_id, brand_id, status_id, style_number, color_code, eye_size,
            gender, frame_type, product_type, current_qty, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&frame.composite_id)
    .bind(frame.brand_id)
    .bind(frame.status_id)
    .bind(&frame.style_number)
    .bind(&frame.color_code)
    .bind(&frame.eye_size)
    .bind(frame.gender)
    .bind(&frame.frame_type)
    .bind(&frame.product_type)
    .bind(frame.current_qty)
    .bind(frame.created_at)
    .bind(frame.updated_at)
    .execute(db)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
            field,
            value: frame.composite_id.clone(),
        },
        other => other,
    })?;

    Ok(())
}

/// Writes the quantity cache and status after a ledger movement.
pub async fn update_stock<'e>(
    db: impl SqliteExecutor<'e>,
    composite_id: &str,
    current_qty: i64,
    status_id: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE frames
        SET current_qty = ?2, status_id = ?3, updated_at = ?4
        WHERE composite_id = ?1
        "#,
    )
    .bind(composite_id)
    .bind(current_qty)
    .bind(status_id)
    .bind(now)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Frame", composite_id));
    }
    Ok(())
}

pub async fn set_status<'e>(
    db: impl SqliteExecutor<'e>,
    composite_id: &str,
    status_id: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE frames SET status_id = ?2, updated_at = ?3 WHERE composite_id = ?1")
        .bind(composite_id)
        .bind(status_id)
        .bind(now)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Frame", composite_id));
    }
    Ok(())
}

/// Writes descriptive fields (gender, frame type, product type).
pub async fn update_descriptive<'e>(db: impl SqliteExecutor<'e>, frame: &Frame) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE frames
        SET gender = ?2, frame_type = ?3, product_type = ?4, updated_at = ?5
        WHERE composite_id = ?1
        "#,
    )
    .bind(&frame.composite_id)
    .bind(frame.gender)
    .bind(&frame.frame_type)
    .bind(&frame.product_type)
    .bind(frame.updated_at)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Frame", &frame.composite_id));
    }
    Ok(())
}

pub async fn delete<'e>(db: impl SqliteExecutor<'e>, composite_id: &str) -> DbResult<()> {
    let result = sqlx::query("DELETE FROM frames WHERE composite_id = ?1")
        .bind(composite_id)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Frame", composite_id));
    }
    Ok(())
}
