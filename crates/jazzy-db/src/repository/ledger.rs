//! # Ledger Repository
//!
//! Reads and appends against `inventory_transactions`.
//!
//! Entries are never updated except for `remaining_qty` on batches, which
//! [`apply_draw`] lowers as FIFO consumes them. Nothing here deletes an
//! entry.
//!
//! ## Revert Linkage
//! ```text
//! WRITE_OFF #9 ◄──── reverted_from_id ──── REVERT_WRITE_OFF #12
//!
//! history() reports reverted_by_id = 12 on #9 via a left join;
//! the partial unique index allows at most one revert per write-off.
//! ```

use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use jazzy_core::fifo::BatchDraw;
use jazzy_core::{LedgerEntry, LedgerHistoryEntry, Money, NewLedgerEntry, WriteOffRecord};

const ENTRY_COLUMNS: &str = r#"
    id, frame_id, transaction_type, transaction_date, invoice_date, quantity,
    unit_cost_cents, unit_price_cents, remaining_qty, write_off_reason,
    reverted_from_id, notes, created_at
"#;

/// Repository for ledger reads.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// A frame's transaction history, newest first.
    pub async fn history(&self, frame_id: &str) -> DbResult<Vec<LedgerHistoryEntry>> {
        let entries = sqlx::query_as::<_, LedgerHistoryEntry>(
            r#"
            SELECT
                t.id, t.frame_id, t.transaction_type, t.transaction_date, t.invoice_date,
                t.quantity, t.unit_cost_cents, t.unit_price_cents, t.remaining_qty,
                t.write_off_reason, t.reverted_from_id, t.notes, t.created_at,
                r.id AS reverted_by_id
            FROM inventory_transactions t
            LEFT JOIN inventory_transactions r ON r.reverted_from_id = t.id
            WHERE t.frame_id = ?1
            ORDER BY t.transaction_date DESC, t.id DESC
            "#,
        )
        .bind(frame_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(frame_id = %frame_id, count = entries.len(), "Fetched ledger history");
        Ok(entries)
    }

    /// Every write-off, newest first, with its revert if any.
    pub async fn write_offs(&self) -> DbResult<Vec<WriteOffRecord>> {
        let records = sqlx::query_as::<_, WriteOffRecord>(
            r#"
            SELECT
                t.id, t.frame_id, b.brand_name, f.style_number, f.color_code,
                t.transaction_date, t.quantity, t.unit_cost_cents,
                t.write_off_reason AS reason, t.notes,
                r.id AS reverted_by_id
            FROM inventory_transactions t
            JOIN frames f ON f.composite_id = t.frame_id
            JOIN brands b ON b.id = f.brand_id
            LEFT JOIN inventory_transactions r ON r.reverted_from_id = t.id
            WHERE t.transaction_type = 'WRITE_OFF'
            ORDER BY t.transaction_date DESC, t.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// All entries of a frame in ledger order.
    pub async fn entries_for(&self, frame_id: &str) -> DbResult<Vec<LedgerEntry>> {
        all_for_frame(&self.pool, frame_id).await
    }

    pub async fn get(&self, entry_id: i64) -> DbResult<Option<LedgerEntry>> {
        fetch_entry(&self.pool, entry_id).await
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_transactions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Executor Functions
// =============================================================================

/// Appends an entry and returns its id.
pub async fn insert<'e>(db: impl SqliteExecutor<'e>, entry: &NewLedgerEntry) -> DbResult<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO inventory_transactions (
            frame_id, transaction_type, transaction_date, invoice_date, quantity,
            unit_cost_cents, unit_price_cents, remaining_qty, write_off_reason,
            reverted_from_id, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&entry.frame_id)
    .bind(entry.transaction_type)
    .bind(entry.transaction_date)
    .bind(entry.invoice_date)
    .bind(entry.quantity)
    .bind(entry.unit_cost_cents)
    .bind(entry.unit_price_cents)
    .bind(entry.remaining_qty)
    .bind(entry.write_off_reason)
    .bind(entry.reverted_from_id)
    .bind(&entry.notes)
    .bind(entry.created_at)
    .execute(db)
    .await?;

    let id = result.last_insert_rowid();
    debug!(
        id,
        frame_id = %entry.frame_id,
        kind = %entry.transaction_type,
        quantity = entry.quantity,
        "Ledger entry appended"
    );
    Ok(id)
}

pub async fn fetch_entry<'e>(db: impl SqliteExecutor<'e>, entry_id: i64) -> DbResult<Option<LedgerEntry>> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM inventory_transactions WHERE id = ?1");
    let entry = sqlx::query_as::<_, LedgerEntry>(&sql)
        .bind(entry_id)
        .fetch_optional(db)
        .await?;
    Ok(entry)
}

/// Batches with stock left, oldest first.
pub async fn open_batches<'e>(db: impl SqliteExecutor<'e>, frame_id: &str) -> DbResult<Vec<LedgerEntry>> {
    let sql = format!(
        r#"SELECT {ENTRY_COLUMNS} FROM inventory_transactions
        WHERE frame_id = ?1
          AND transaction_type IN ('ORDER', 'RESTOCK', 'REVERT_WRITE_OFF')
          AND remaining_qty > 0
        ORDER BY transaction_date, id"#
    );
    let batches = sqlx::query_as::<_, LedgerEntry>(&sql)
        .bind(frame_id)
        .fetch_all(db)
        .await?;
    Ok(batches)
}

pub async fn all_for_frame<'e>(db: impl SqliteExecutor<'e>, frame_id: &str) -> DbResult<Vec<LedgerEntry>> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM inventory_transactions WHERE frame_id = ?1 ORDER BY transaction_date, id"
    );
    let entries = sqlx::query_as::<_, LedgerEntry>(&sql)
        .bind(frame_id)
        .fetch_all(db)
        .await?;
    Ok(entries)
}

/// Id of the REVERT_WRITE_OFF pointing at `write_off_id`, if any.
pub async fn reverted_by<'e>(db: impl SqliteExecutor<'e>, write_off_id: i64) -> DbResult<Option<i64>> {
    let id = sqlx::query_scalar("SELECT id FROM inventory_transactions WHERE reverted_from_id = ?1")
        .bind(write_off_id)
        .fetch_optional(db)
        .await?;
    Ok(id)
}

/// Lowers a batch's `remaining_qty` to the draw's `remaining_after`.
pub async fn apply_draw<'e>(db: impl SqliteExecutor<'e>, draw: &BatchDraw) -> DbResult<()> {
    let result = sqlx::query("UPDATE inventory_transactions SET remaining_qty = ?2 WHERE id = ?1")
        .bind(draw.entry_id)
        .bind(draw.remaining_after)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Ledger entry", draw.entry_id));
    }
    Ok(())
}

/// Unit price of the frame's latest ORDER entry.
pub async fn retail_price<'e>(db: impl SqliteExecutor<'e>, frame_id: &str) -> DbResult<Money> {
    let cents: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT unit_price_cents FROM inventory_transactions
        WHERE frame_id = ?1 AND transaction_type = 'ORDER'
        ORDER BY transaction_date DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(frame_id)
    .fetch_optional(db)
    .await?;
    Ok(Money::from_cents(cents.unwrap_or(0)))
}

/// Unit cost of the frame's latest ORDER or RESTOCK entry, zero if none.
pub async fn last_known_cost<'e>(db: impl SqliteExecutor<'e>, frame_id: &str) -> DbResult<Money> {
    let cents: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT unit_cost_cents FROM inventory_transactions
        WHERE frame_id = ?1 AND transaction_type IN ('ORDER', 'RESTOCK')
        ORDER BY transaction_date DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(frame_id)
    .fetch_optional(db)
    .await?;
    Ok(Money::from_cents(cents.unwrap_or(0)))
}

/// Moves every entry of `old_id` to `new_id`. Returns the number moved.
pub async fn rekey<'e>(db: impl SqliteExecutor<'e>, old_id: &str, new_id: &str) -> DbResult<u64> {
    let result = sqlx::query("UPDATE inventory_transactions SET frame_id = ?2 WHERE frame_id = ?1")
        .bind(old_id)
        .bind(new_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

pub async fn count_for_frame<'e>(db: impl SqliteExecutor<'e>, frame_id: &str) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_transactions WHERE frame_id = ?1")
        .bind(frame_id)
        .fetch_one(db)
        .await?;
    Ok(count)
}
