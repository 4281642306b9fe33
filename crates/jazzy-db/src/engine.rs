//! # Inventory Engine
//!
//! Executes every stock movement atomically against the store.
//!
//! ## Anatomy of an Operation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  engine.sell("1001-GG0002-TRT-54", intent)                              │
//! │       │                                                                 │
//! │       ├── now = clock.now()                                             │
//! │       ├── uow = BEGIN IMMEDIATE          (write lock held from here)    │
//! │       │                                                                 │
//! │       ├── sell_in(uow.conn())                                           │
//! │       │     ├── load FrameSnapshot       frame, open batches, prices    │
//! │       │     ├── ledger::plan_sale        pure, in jazzy-core            │
//! │       │     └── apply LedgerPlan         draws, entry, qty + status     │
//! │       │                                                                 │
//! │       └── uow.finish(outcome)            COMMIT on Ok, ROLLBACK on Err  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Inside a unit of work every read and write goes through the unit's
//! connection. The engine never retries; a failed operation leaves no trace
//! in the store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::error::{DbError, EngineError, EngineResult};
use crate::pool::Database;
use crate::repository::{brand, frame, ledger, rx_sale, status};
use jazzy_core::audit::{self, LedgerAudit};
use jazzy_core::fifo::BatchDraw;
use jazzy_core::identity::{self, RenamePlan};
use jazzy_core::ledger::{self as planner, IntakePlan};
use jazzy_core::rx::{self, NewRxSale, RxSale, RxSaleIntent};
use jazzy_core::status::ensure_assignable;
use jazzy_core::{
    Clock, CoreError, Frame, FrameSnapshot, IdentityUpdate, IntakeIntent, LedgerEntry,
    LedgerPlan, Money, RestockIntent, SaleIntent, StatusIds, WriteOffIntent,
};

// =============================================================================
// Outcomes
// =============================================================================

/// Result of a committed ledger movement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementOutcome {
    pub entry: LedgerEntry,
    pub new_qty: i64,
    pub status_id: i64,
    /// Reconciliation moved the frame to `status_id`.
    pub status_changed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleOutcome {
    #[serde(flatten)]
    pub movement: MovementOutcome,
    pub draws: Vec<BatchDraw>,
    pub total_cost: Money,
    pub avg_unit_cost: Money,
    /// Sold below FIFO cost. Advisory only.
    pub below_cost: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOffOutcome {
    #[serde(flatten)]
    pub movement: MovementOutcome,
    pub draws: Vec<BatchDraw>,
    pub total_cost: Money,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeOutcome {
    pub frame: Frame,
    pub entry: LedgerEntry,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameOutcome {
    pub old_id: String,
    pub frame: Frame,
    /// Ledger entries re-pointed to the new id (0 for an in-place edit).
    pub entries_moved: u64,
}

// =============================================================================
// Engine
// =============================================================================

/// The ledger engine.
///
/// Cheap to clone; clones share the pool and the clock.
#[derive(Clone)]
pub struct InventoryEngine {
    db: Database,
    clock: Arc<dyn Clock>,
    status_ids: StatusIds,
}

impl std::fmt::Debug for InventoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryEngine")
            .field("db", &self.db)
            .field("status_ids", &self.status_ids)
            .finish_non_exhaustive()
    }
}

impl InventoryEngine {
    /// Resolves the reconciliation statuses named in `config`.
    ///
    /// Fails with `StatusNotFound` if either is missing; the engine cannot
    /// reconcile without them.
    pub async fn new(db: Database, config: &AppConfig, clock: Arc<dyn Clock>) -> EngineResult<Self> {
        let statuses = db.statuses();
        let active = statuses
            .find_by_name(&config.active_status)
            .await?
            .ok_or_else(|| CoreError::StatusNotFound(config.active_status.clone()))?;
        let sold_out = statuses
            .find_by_name(&config.sold_out_status)
            .await?
            .ok_or_else(|| CoreError::StatusNotFound(config.sold_out_status.clone()))?;

        if !sold_out.is_protected {
            warn!(status = %sold_out.name, "Sold-out status is not protected");
        }

        let status_ids = StatusIds {
            active: active.id,
            sold_out: sold_out.id,
        };
        info!(active = active.id, sold_out = sold_out.id, "Inventory engine ready");

        Ok(InventoryEngine { db, clock, status_ids })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn status_ids(&self) -> StatusIds {
        self.status_ids
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // =========================================================================
    // Intake
    // =========================================================================

    /// Creates a frame with its opening ORDER batch.
    pub async fn intake(&self, intent: IntakeIntent) -> EngineResult<IntakeOutcome> {
        let now = self.clock.now();
        let plan = planner::plan_intake(&intent, self.status_ids.active, now)?;
        let frame_id = plan.frame.composite_id.clone();

        let mut uow = self.db.begin_unit("intake").await?;
        let outcome = intake_in(uow.conn(), plan).await;
        let outcome = uow.finish(outcome).await;

        match &outcome {
            Ok(done) => info!(
                frame_id = %frame_id,
                entry_id = done.entry.id,
                quantity = done.entry.quantity,
                "Frame received"
            ),
            Err(err) => log_failure("intake", &frame_id, err),
        }
        outcome
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    /// Sells from the oldest batches first.
    pub async fn sell(&self, frame_id: &str, intent: SaleIntent) -> EngineResult<SaleOutcome> {
        let now = self.clock.now();
        let mut uow = self.db.begin_unit("sell").await?;
        let outcome = self.sell_in(uow.conn(), frame_id, &intent, now).await;
        let outcome = uow.finish(outcome).await;

        match &outcome {
            Ok(sale) => {
                info!(
                    frame_id = %frame_id,
                    entry_id = sale.movement.entry.id,
                    quantity = intent.quantity,
                    new_qty = sale.movement.new_qty,
                    unit_cost = %sale.avg_unit_cost,
                    "Sale recorded"
                );
                if sale.below_cost {
                    warn!(
                        frame_id = %frame_id,
                        unit_price = %Money::from_cents(sale.movement.entry.unit_price_cents),
                        unit_cost = %sale.avg_unit_cost,
                        "Sold below cost"
                    );
                }
            }
            Err(err) => log_failure("sell", frame_id, err),
        }
        outcome
    }

    async fn sell_in(
        &self,
        conn: &mut SqliteConnection,
        frame_id: &str,
        intent: &SaleIntent,
        now: DateTime<Utc>,
    ) -> EngineResult<SaleOutcome> {
        let snapshot = self.load_snapshot(conn, frame_id).await?;
        let sale = planner::plan_sale(&snapshot, intent, now)?;
        let movement = apply_plan(conn, &snapshot, sale.plan, now).await?;

        Ok(SaleOutcome {
            movement,
            draws: sale.consumption.draws,
            total_cost: sale.consumption.total_cost,
            avg_unit_cost: sale.consumption.avg_unit_cost,
            below_cost: sale.below_cost,
        })
    }

    /// Removes damaged, lost or defective stock at FIFO cost.
    pub async fn write_off(&self, frame_id: &str, intent: WriteOffIntent) -> EngineResult<WriteOffOutcome> {
        let now = self.clock.now();
        let mut uow = self.db.begin_unit("write_off").await?;
        let outcome = self.write_off_in(uow.conn(), frame_id, &intent, now).await;
        let outcome = uow.finish(outcome).await;

        match &outcome {
            Ok(wo) => info!(
                frame_id = %frame_id,
                entry_id = wo.movement.entry.id,
                quantity = intent.quantity,
                reason = %intent.reason,
                new_qty = wo.movement.new_qty,
                "Write-off recorded"
            ),
            Err(err) => log_failure("write_off", frame_id, err),
        }
        outcome
    }

    async fn write_off_in(
        &self,
        conn: &mut SqliteConnection,
        frame_id: &str,
        intent: &WriteOffIntent,
        now: DateTime<Utc>,
    ) -> EngineResult<WriteOffOutcome> {
        let snapshot = self.load_snapshot(conn, frame_id).await?;
        let wo = planner::plan_write_off(&snapshot, intent, now)?;
        let movement = apply_plan(conn, &snapshot, wo.plan, now).await?;

        Ok(WriteOffOutcome {
            movement,
            draws: wo.consumption.draws,
            total_cost: wo.consumption.total_cost,
        })
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    /// Adds a fresh batch; clears Sold Out.
    pub async fn restock(&self, frame_id: &str, intent: RestockIntent) -> EngineResult<MovementOutcome> {
        let now = self.clock.now();
        let mut uow = self.db.begin_unit("restock").await?;
        let outcome = self.restock_in(uow.conn(), frame_id, &intent, now).await;
        let outcome = uow.finish(outcome).await;

        match &outcome {
            Ok(done) => info!(
                frame_id = %frame_id,
                entry_id = done.entry.id,
                quantity = intent.quantity,
                new_qty = done.new_qty,
                "Restock recorded"
            ),
            Err(err) => log_failure("restock", frame_id, err),
        }
        outcome
    }

    async fn restock_in(
        &self,
        conn: &mut SqliteConnection,
        frame_id: &str,
        intent: &RestockIntent,
        now: DateTime<Utc>,
    ) -> EngineResult<MovementOutcome> {
        let snapshot = self.load_snapshot(conn, frame_id).await?;
        let plan = planner::plan_restock(&snapshot, intent, now)?;
        apply_plan(conn, &snapshot, plan, now).await
    }

    /// Undoes a write-off by restoring its units as a new batch.
    ///
    /// A write-off can be reverted once; the second attempt fails with
    /// `AlreadyReverted` and changes nothing.
    pub async fn revert_write_off(
        &self,
        frame_id: &str,
        write_off_id: i64,
        notes: Option<&str>,
    ) -> EngineResult<MovementOutcome> {
        let now = self.clock.now();
        let mut uow = self.db.begin_unit("revert_write_off").await?;
        let outcome = self
            .revert_in(uow.conn(), frame_id, write_off_id, notes, now)
            .await;
        let outcome = uow.finish(outcome).await;

        match &outcome {
            Ok(done) => info!(
                frame_id = %frame_id,
                entry_id = done.entry.id,
                write_off_id,
                new_qty = done.new_qty,
                "Write-off reverted"
            ),
            Err(err) => log_failure("revert_write_off", frame_id, err),
        }
        outcome
    }

    async fn revert_in(
        &self,
        conn: &mut SqliteConnection,
        frame_id: &str,
        write_off_id: i64,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> EngineResult<MovementOutcome> {
        let write_off = ledger::fetch_entry(&mut *conn, write_off_id)
            .await?
            .ok_or(CoreError::EntryNotFound(write_off_id))?;
        let snapshot = self.load_snapshot(conn, frame_id).await?;
        let reverted_by = ledger::reverted_by(&mut *conn, write_off_id).await?;
        let plan = planner::plan_revert(&snapshot, &write_off, reverted_by, notes, now)?;

        // The unique index on reverted_from_id backs the check above.
        apply_plan(conn, &snapshot, plan, now)
            .await
            .map_err(|err| match err {
                EngineError::Db(db_err) if db_err.is_unique_violation_on("reverted_from_id") => {
                    CoreError::AlreadyReverted { write_off_id }.into()
                }
                other => other,
            })
    }

    // =========================================================================
    // Status and Identity
    // =========================================================================

    /// Manually assigns an unprotected status.
    pub async fn change_status(&self, frame_id: &str, status_id: i64) -> EngineResult<Frame> {
        let now = self.clock.now();
        let mut uow = self.db.begin_unit("change_status").await?;
        let outcome = change_status_in(uow.conn(), frame_id, status_id, now).await;
        let outcome = uow.finish(outcome).await;

        match &outcome {
            Ok(_) => info!(frame_id = %frame_id, status_id, "Status changed"),
            Err(err) => log_failure("change_status", frame_id, err),
        }
        outcome
    }

    /// Edits a frame's identity and descriptive fields.
    ///
    /// When the composite id changes, the frame row is replaced and its whole
    /// ledger re-pointed to the new id in one unit of work.
    pub async fn rename_identity(&self, frame_id: &str, update: IdentityUpdate) -> EngineResult<RenameOutcome> {
        let now = self.clock.now();
        let mut uow = self.db.begin_unit("rename_identity").await?;
        let outcome = rename_in(uow.conn(), frame_id, &update, now).await;
        let outcome = uow.finish(outcome).await;

        match &outcome {
            Ok(done) => info!(
                old_id = %done.old_id,
                new_id = %done.frame.composite_id,
                entries_moved = done.entries_moved,
                "Frame identity updated"
            ),
            Err(err) => log_failure("rename_identity", frame_id, err),
        }
        outcome
    }

    // =========================================================================
    // RX Sales
    // =========================================================================

    /// Records a prescription sale. Stock and the ledger are untouched.
    pub async fn record_rx_sale(&self, intent: RxSaleIntent) -> EngineResult<RxSale> {
        let now = self.clock.now();
        let sale = rx::plan_rx_sale(&intent, now)?;
        let brand_id = sale.brand_id;

        let mut uow = self.db.begin_unit("record_rx_sale").await?;
        let outcome = record_rx_sale_in(uow.conn(), &sale).await;
        let outcome = uow.finish(outcome).await;

        match &outcome {
            Ok(recorded) => info!(
                rx_sale_id = recorded.id,
                brand_id,
                sale_price = %recorded.sale_price(),
                "RX sale recorded"
            ),
            Err(err) if err.is_user_error() => {
                debug!(brand_id, error = %err, "RX sale refused")
            }
            Err(err) => error!(brand_id, error = %err, "RX sale failed"),
        }
        outcome
    }

    // =========================================================================
    // Audit
    // =========================================================================

    /// Checks one frame's cached quantity against its ledger.
    pub async fn audit_frame(&self, frame_id: &str) -> EngineResult<LedgerAudit> {
        let pool = self.db.pool();
        let frame = frame::fetch(pool, frame_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(frame_id.to_string()))?;
        let entries = ledger::all_for_frame(pool, frame_id).await?;
        let report = audit::audit_frame(&frame, &entries);

        if report.is_consistent() {
            debug!(frame_id = %frame_id, entries = report.entry_count, "Ledger consistent");
        } else {
            warn!(frame_id = %frame_id, findings = ?report.findings, "Ledger inconsistent");
        }
        Ok(report)
    }

    /// Audits every frame.
    pub async fn audit_all(&self) -> EngineResult<Vec<LedgerAudit>> {
        let ids = self.db.frames().all_ids().await?;
        let mut audits = Vec::with_capacity(ids.len());
        for id in &ids {
            audits.push(self.audit_frame(id).await?);
        }

        let inconsistent = audits.iter().filter(|a| !a.is_consistent()).count();
        info!(frames = audits.len(), inconsistent, "Ledger audit complete");
        Ok(audits)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn load_snapshot(&self, conn: &mut SqliteConnection, frame_id: &str) -> EngineResult<FrameSnapshot> {
        let frame = frame::fetch(&mut *conn, frame_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(frame_id.to_string()))?;
        let open_batches = ledger::open_batches(&mut *conn, frame_id).await?;
        let retail_price = ledger::retail_price(&mut *conn, frame_id).await?;
        let last_known_cost = ledger::last_known_cost(&mut *conn, frame_id).await?;

        debug!(
            frame_id = %frame_id,
            current_qty = frame.current_qty,
            open_batches = open_batches.len(),
            "Snapshot loaded"
        );
        Ok(FrameSnapshot {
            frame,
            open_batches,
            retail_price,
            last_known_cost,
            status_ids: self.status_ids,
        })
    }
}

// =============================================================================
// Unit-of-work bodies
// =============================================================================

/// Writes a plan: batch draws, the new entry, then the frame's cache.
async fn apply_plan(
    conn: &mut SqliteConnection,
    snapshot: &FrameSnapshot,
    plan: LedgerPlan,
    now: DateTime<Utc>,
) -> EngineResult<MovementOutcome> {
    let status_id = plan.resulting_status(snapshot);

    for draw in &plan.draws {
        ledger::apply_draw(&mut *conn, draw).await?;
    }
    let entry_id = ledger::insert(&mut *conn, &plan.entry).await?;
    frame::update_stock(&mut *conn, &plan.frame_id, plan.new_qty, status_id, now).await?;

    Ok(MovementOutcome {
        entry: plan.entry.with_id(entry_id),
        new_qty: plan.new_qty,
        status_id,
        status_changed: plan.new_status.is_some(),
    })
}

async fn intake_in(conn: &mut SqliteConnection, plan: IntakePlan) -> EngineResult<IntakeOutcome> {
    let IntakePlan { frame: new_frame, entry } = plan;

    if !brand::brand_exists(&mut *conn, new_frame.brand_id).await? {
        return Err(CoreError::BrandNotFound(new_frame.brand_id).into());
    }
    if frame::exists(&mut *conn, &new_frame.composite_id).await? {
        return Err(CoreError::DuplicateIdentity(new_frame.composite_id).into());
    }

    frame::insert(&mut *conn, &new_frame)
        .await
        .map_err(|err| duplicate_identity(err, &new_frame.composite_id))?;
    let entry_id = ledger::insert(&mut *conn, &entry).await?;

    Ok(IntakeOutcome {
        frame: new_frame,
        entry: entry.with_id(entry_id),
    })
}

async fn record_rx_sale_in(conn: &mut SqliteConnection, sale: &NewRxSale) -> EngineResult<RxSale> {
    if !brand::brand_exists(&mut *conn, sale.brand_id).await? {
        return Err(CoreError::BrandNotFound(sale.brand_id).into());
    }

    let id = rx_sale::insert(&mut *conn, sale).await?;
    rx_sale::fetch(&mut *conn, id)
        .await?
        .ok_or_else(|| DbError::Internal(format!("RX sale {id} vanished after insert")).into())
}

async fn change_status_in(
    conn: &mut SqliteConnection,
    frame_id: &str,
    status_id: i64,
    now: DateTime<Utc>,
) -> EngineResult<Frame> {
    let target = status::fetch(&mut *conn, status_id)
        .await?
        .ok_or_else(|| CoreError::StatusNotFound(status_id.to_string()))?;
    ensure_assignable(&target)?;

    let mut current = frame::fetch(&mut *conn, frame_id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(frame_id.to_string()))?;
    frame::set_status(&mut *conn, frame_id, status_id, now).await?;

    current.status_id = status_id;
    current.updated_at = now;
    Ok(current)
}

async fn rename_in(
    conn: &mut SqliteConnection,
    frame_id: &str,
    update: &IdentityUpdate,
    now: DateTime<Utc>,
) -> EngineResult<RenameOutcome> {
    let current = frame::fetch(&mut *conn, frame_id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(frame_id.to_string()))?;
    let plan = identity::plan_rename(&current, update, now)?;

    let renamed = plan.frame();
    if renamed.brand_id != current.brand_id && !brand::brand_exists(&mut *conn, renamed.brand_id).await? {
        return Err(CoreError::BrandNotFound(renamed.brand_id).into());
    }

    match plan {
        RenamePlan::InPlace { frame: renamed } => {
            frame::update_descriptive(&mut *conn, &renamed).await?;
            Ok(RenameOutcome {
                old_id: current.composite_id,
                frame: renamed,
                entries_moved: 0,
            })
        }
        RenamePlan::Rekey { old_id, frame: renamed } => {
            if frame::exists(&mut *conn, &renamed.composite_id).await? {
                return Err(CoreError::DuplicateIdentity(renamed.composite_id).into());
            }

            // New row first so the ledger's foreign key always has a target.
            frame::insert(&mut *conn, &renamed)
                .await
                .map_err(|err| duplicate_identity(err, &renamed.composite_id))?;
            let entries_moved = ledger::rekey(&mut *conn, &old_id, &renamed.composite_id).await?;
            frame::delete(&mut *conn, &old_id).await?;

            Ok(RenameOutcome {
                old_id,
                frame: renamed,
                entries_moved,
            })
        }
    }
}

fn duplicate_identity(err: DbError, composite_id: &str) -> EngineError {
    if err.is_unique_violation_on("composite_id") {
        CoreError::DuplicateIdentity(composite_id.to_string()).into()
    } else {
        err.into()
    }
}

fn log_failure(operation: &str, frame_id: &str, err: &EngineError) {
    match err {
        EngineError::Core(CoreError::InsufficientBatchInventory { .. }) => {
            error!(operation, frame_id = %frame_id, error = %err, "Batch stock disagrees with cached quantity")
        }
        err if err.is_user_error() => {
            debug!(operation, frame_id = %frame_id, error = %err, "Operation refused")
        }
        _ => error!(operation, frame_id = %frame_id, error = %err, "Operation failed"),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::pool::DbConfig;
    use chrono::TimeZone;
    use jazzy_core::audit::AuditFinding;
    use jazzy_core::{FixedClock, FrameIdentity, Gender, NewBrand, TransactionType, WriteOffReason};

    pub(crate) const GUCCI: &str = "1001-GG0002-TRT-54";

    pub(crate) fn day(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, month, day, 10, 0, 0).unwrap()
    }

    /// Engine over a fresh in-memory store with Kering / Gucci (1001) registered.
    pub(crate) async fn setup() -> (InventoryEngine, Arc<FixedClock>) {
        setup_with(DbConfig::in_memory()).await
    }

    async fn setup_with(config: DbConfig) -> (InventoryEngine, Arc<FixedClock>) {
        let db = Database::new(config).await.unwrap();
        let catalog = Catalog::new(db.clone());
        let kering = catalog.create_company("Kering").await.unwrap();
        catalog
            .create_brand(NewBrand {
                id: 1001,
                brand_name: "Gucci".to_string(),
                company_id: kering.id,
                allocation_quantity: 10,
            })
            .await
            .unwrap();

        let clock = Arc::new(FixedClock::new(day(2, 1)));
        let engine = InventoryEngine::new(db, &AppConfig::default(), clock.clone())
            .await
            .unwrap();
        (engine, clock)
    }

    pub(crate) fn intent(style: &str, qty: i64, cost: i64, price: i64) -> IntakeIntent {
        IntakeIntent {
            identity: FrameIdentity::new(1001, style, "TRT", "54"),
            gender: Gender::Women,
            frame_type: "Zyl".to_string(),
            product_type: "Optical".to_string(),
            quantity: Some(qty),
            unit_cost: Money::from_cents(cost),
            unit_price: Money::from_cents(price),
            invoice_date: None,
            notes: None,
        }
    }

    fn sale(quantity: i64) -> SaleIntent {
        SaleIntent {
            quantity,
            ..Default::default()
        }
    }

    async fn frame_of(engine: &InventoryEngine, id: &str) -> Frame {
        engine.database().frames().get(id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_sell_two_then_remaining_three() {
        let (engine, _) = setup().await;
        let ids = engine.status_ids();
        engine.intake(intent("GG0002", 5, 10000, 25000)).await.unwrap();

        let first = engine.sell(GUCCI, sale(2)).await.unwrap();

        let entry = &first.movement.entry;
        assert_eq!(entry.transaction_type, TransactionType::Sale);
        assert_eq!(entry.quantity, 2);
        assert_eq!(entry.unit_cost_cents, 10000);
        assert_eq!(entry.unit_price_cents, 25000);
        assert_eq!(first.movement.new_qty, 3);
        assert_eq!(first.movement.status_id, ids.active);
        assert!(!first.movement.status_changed);

        let second = engine.sell(GUCCI, sale(3)).await.unwrap();

        assert_eq!(second.movement.new_qty, 0);
        assert!(second.movement.status_changed);
        let frame = frame_of(&engine, GUCCI).await;
        assert_eq!(frame.current_qty, 0);
        assert_eq!(frame.status_id, ids.sold_out);
    }

    #[tokio::test]
    async fn test_oversell_is_rejected_without_writes() {
        let (engine, _) = setup().await;
        engine.intake(intent("GG0002", 5, 10000, 25000)).await.unwrap();

        let err = engine.sell(GUCCI, sale(6)).await.unwrap_err();

        assert!(matches!(
            err,
            EngineError::Core(CoreError::InsufficientStock { available: 5, requested: 6, .. })
        ));
        assert_eq!(engine.database().ledger().count().await.unwrap(), 1);
        assert_eq!(frame_of(&engine, GUCCI).await.current_qty, 5);
    }

    #[tokio::test]
    async fn test_fifo_consumes_oldest_batch_first() {
        let (engine, _) = setup().await;
        let mut order = intent("GG0002", 2, 4000, 9000);
        order.invoice_date = Some(day(1, 1));
        engine.intake(order).await.unwrap();
        engine
            .restock(
                GUCCI,
                RestockIntent {
                    quantity: 3,
                    unit_cost: Some(Money::from_cents(6000)),
                    invoice_date: Some(day(1, 5)),
                    notes: None,
                },
            )
            .await
            .unwrap();

        let sold = engine.sell(GUCCI, sale(4)).await.unwrap();

        assert_eq!(sold.avg_unit_cost.cents(), 5000);
        assert_eq!(sold.total_cost.cents(), 20000);
        let entries = engine.database().ledger().entries_for(GUCCI).await.unwrap();
        assert_eq!(entries[0].transaction_type, TransactionType::Order);
        assert_eq!(entries[0].remaining_qty, Some(0));
        assert_eq!(entries[1].transaction_type, TransactionType::Restock);
        assert_eq!(entries[1].remaining_qty, Some(1));
        assert_eq!(frame_of(&engine, GUCCI).await.current_qty, 1);
    }

    #[tokio::test]
    async fn test_backdated_restock_is_drawn_first() {
        let (engine, _) = setup().await;
        let mut order = intent("GG0002", 1, 10000, 25000);
        order.invoice_date = Some(day(1, 20));
        engine.intake(order).await.unwrap();
        engine
            .restock(
                GUCCI,
                RestockIntent {
                    quantity: 1,
                    unit_cost: Some(Money::from_cents(8000)),
                    invoice_date: Some(day(1, 10)),
                    notes: None,
                },
            )
            .await
            .unwrap();

        let sold = engine.sell(GUCCI, sale(1)).await.unwrap();

        assert_eq!(sold.avg_unit_cost.cents(), 8000);
    }

    #[tokio::test]
    async fn test_write_off_and_revert_once() {
        let (engine, clock) = setup().await;
        let ids = engine.status_ids();
        engine.intake(intent("GG0002", 1, 10000, 25000)).await.unwrap();

        let wo = engine
            .write_off(
                GUCCI,
                WriteOffIntent {
                    quantity: 1,
                    reason: WriteOffReason::Damaged,
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(wo.movement.new_qty, 0);
        assert_eq!(wo.movement.status_id, ids.sold_out);
        assert_eq!(wo.movement.entry.unit_price_cents, 0);
        assert_eq!(wo.movement.entry.write_off_reason, Some(WriteOffReason::Damaged));

        clock.advance(chrono::Duration::hours(1));
        let write_off_id = wo.movement.entry.id;
        let revert = engine.revert_write_off(GUCCI, write_off_id, None).await.unwrap();

        assert_eq!(revert.new_qty, 1);
        assert_eq!(revert.status_id, ids.active);
        assert_eq!(revert.entry.transaction_type, TransactionType::RevertWriteOff);
        assert_eq!(revert.entry.remaining_qty, Some(1));
        assert_eq!(revert.entry.unit_cost_cents, 10000);
        assert_eq!(revert.entry.reverted_from_id, Some(write_off_id));

        let again = engine.revert_write_off(GUCCI, write_off_id, None).await.unwrap_err();
        assert!(matches!(
            again,
            EngineError::Core(CoreError::AlreadyReverted { .. })
        ));
        assert_eq!(frame_of(&engine, GUCCI).await.current_qty, 1);

        let history = engine.database().ledger().history(GUCCI).await.unwrap();
        let written_off = history.iter().find(|h| h.entry.id == write_off_id).unwrap();
        assert!(written_off.is_reverted());
        assert_eq!(written_off.reverted_by_id, Some(revert.entry.id));
        assert_eq!(history[0].entry.id, revert.entry.id);

        let register = engine.database().ledger().write_offs().await.unwrap();
        assert_eq!(register.len(), 1);
        assert_eq!(register[0].brand_name, "Gucci");
        assert_eq!(register[0].reverted_by_id, Some(revert.entry.id));
    }

    #[tokio::test]
    async fn test_restored_units_are_sellable_at_original_cost() {
        let (engine, _) = setup().await;
        engine.intake(intent("GG0002", 2, 10000, 25000)).await.unwrap();
        let wo = engine
            .write_off(
                GUCCI,
                WriteOffIntent {
                    quantity: 2,
                    reason: WriteOffReason::Lost,
                    notes: None,
                },
            )
            .await
            .unwrap();
        engine.revert_write_off(GUCCI, wo.movement.entry.id, None).await.unwrap();

        let sold = engine.sell(GUCCI, sale(2)).await.unwrap();

        assert_eq!(sold.avg_unit_cost.cents(), 10000);
        assert!(engine.audit_frame(GUCCI).await.unwrap().is_consistent());
    }

    #[tokio::test]
    async fn test_revert_rejects_sale_entry() {
        let (engine, _) = setup().await;
        engine.intake(intent("GG0002", 2, 10000, 25000)).await.unwrap();
        let sold = engine.sell(GUCCI, sale(1)).await.unwrap();

        let err = engine
            .revert_write_off(GUCCI, sold.movement.entry.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::NotAWriteOff { .. })));

        let err = engine.revert_write_off(GUCCI, 999, None).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::EntryNotFound(999))));
    }

    #[tokio::test]
    async fn test_protected_status_is_engine_managed() {
        let (engine, _) = setup().await;
        let ids = engine.status_ids();
        engine.intake(intent("GG0002", 1, 10000, 25000)).await.unwrap();

        let err = engine.change_status(GUCCI, ids.sold_out).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::ProtectedStatusViolation { .. })
        ));

        let discontinued = engine
            .database()
            .statuses()
            .find_by_name("Discontinued")
            .await
            .unwrap()
            .unwrap();
        let frame = engine.change_status(GUCCI, discontinued.id).await.unwrap();
        assert_eq!(frame.status_id, discontinued.id);

        engine.sell(GUCCI, sale(1)).await.unwrap();
        assert_eq!(frame_of(&engine, GUCCI).await.status_id, ids.sold_out);

        engine
            .restock(GUCCI, RestockIntent { quantity: 2, ..Default::default() })
            .await
            .unwrap();
        let frame = frame_of(&engine, GUCCI).await;
        assert_eq!(frame.status_id, ids.active);
        assert_eq!(frame.current_qty, 2);
    }

    #[tokio::test]
    async fn test_restock_defaults_to_last_known_cost() {
        let (engine, _) = setup().await;
        engine.intake(intent("GG0002", 1, 12345, 25000)).await.unwrap();

        let restock = engine
            .restock(GUCCI, RestockIntent { quantity: 4, ..Default::default() })
            .await
            .unwrap();

        assert_eq!(restock.entry.unit_cost_cents, 12345);
        assert_eq!(restock.entry.unit_price_cents, 25000);
        assert_eq!(restock.entry.transaction_date, day(2, 1));
        assert_eq!(restock.new_qty, 5);
    }

    #[tokio::test]
    async fn test_below_cost_sale_is_recorded() {
        let (engine, _) = setup().await;
        engine.intake(intent("GG0002", 1, 10000, 25000)).await.unwrap();

        let sold = engine
            .sell(
                GUCCI,
                SaleIntent {
                    quantity: 1,
                    unit_price: Some(Money::from_cents(7500)),
                    sale_date: None,
                    notes: None,
                },
            )
            .await
            .unwrap();

        assert!(sold.below_cost);
        assert_eq!(sold.movement.entry.unit_price_cents, 7500);
    }

    #[tokio::test]
    async fn test_intake_rejects_duplicate_and_unknown_brand() {
        let (engine, _) = setup().await;
        engine.intake(intent("GG0002", 1, 10000, 25000)).await.unwrap();

        let err = engine.intake(intent("GG0002", 3, 10000, 25000)).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::DuplicateIdentity(_))));

        let mut unknown = intent("RB3025", 1, 5000, 15000);
        unknown.identity.brand_id = 4242;
        let err = engine.intake(unknown).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::BrandNotFound(4242))));

        assert_eq!(engine.database().frames().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rename_moves_whole_ledger() {
        let (engine, _) = setup().await;
        engine.intake(intent("GG0002", 5, 10000, 25000)).await.unwrap();
        engine.sell(GUCCI, sale(1)).await.unwrap();
        engine
            .write_off(
                GUCCI,
                WriteOffIntent {
                    quantity: 1,
                    reason: WriteOffReason::Defective,
                    notes: None,
                },
            )
            .await
            .unwrap();
        let before = engine.database().ledger().entries_for(GUCCI).await.unwrap();

        let update = IdentityUpdate {
            style_number: Some("GG0003".to_string()),
            ..Default::default()
        };
        let renamed = engine.rename_identity(GUCCI, update).await.unwrap();

        let new_id = "1001-GG0003-TRT-54";
        assert_eq!(renamed.frame.composite_id, new_id);
        assert_eq!(renamed.entries_moved, 3);
        assert!(engine.database().frames().get(GUCCI).await.unwrap().is_none());
        assert!(engine.database().ledger().entries_for(GUCCI).await.unwrap().is_empty());

        let after = engine.database().ledger().entries_for(new_id).await.unwrap();
        let expected: Vec<LedgerEntry> = before
            .into_iter()
            .map(|e| LedgerEntry {
                frame_id: new_id.to_string(),
                ..e
            })
            .collect();
        assert_eq!(after, expected);

        let frame = frame_of(&engine, new_id).await;
        assert_eq!(frame.current_qty, 3);
        assert!(engine.audit_frame(new_id).await.unwrap().is_consistent());
    }

    #[tokio::test]
    async fn test_rename_collision_leaves_both_frames() {
        let (engine, _) = setup().await;
        engine.intake(intent("GG0002", 1, 10000, 25000)).await.unwrap();
        engine.intake(intent("GG0003", 1, 10000, 25000)).await.unwrap();

        let update = IdentityUpdate {
            style_number: Some("GG0003".to_string()),
            ..Default::default()
        };
        let err = engine.rename_identity(GUCCI, update).await.unwrap_err();

        assert!(matches!(err, EngineError::Core(CoreError::DuplicateIdentity(_))));
        assert_eq!(engine.database().frames().count().await.unwrap(), 2);
        assert_eq!(engine.database().ledger().entries_for(GUCCI).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rename_in_place_and_unknown_brand() {
        let (engine, _) = setup().await;
        engine.intake(intent("GG0002", 1, 10000, 25000)).await.unwrap();

        let update = IdentityUpdate {
            gender: Some(Gender::Unisex),
            frame_type: Some("Metal".to_string()),
            ..Default::default()
        };
        let edited = engine.rename_identity(GUCCI, update).await.unwrap();
        assert_eq!(edited.entries_moved, 0);
        let frame = frame_of(&engine, GUCCI).await;
        assert_eq!(frame.gender, Gender::Unisex);
        assert_eq!(frame.frame_type, "Metal");

        let update = IdentityUpdate {
            brand_id: Some(4242),
            ..Default::default()
        };
        let err = engine.rename_identity(GUCCI, update).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::BrandNotFound(4242))));
    }

    /// Installs a trigger that aborts the matching statement with "boom".
    async fn abort_on(engine: &InventoryEngine, name: &str, event: &str) {
        let sql = format!(
            "CREATE TRIGGER {name} BEFORE {event} ON frames BEGIN SELECT RAISE(ABORT, 'boom'); END"
        );
        sqlx::query(&sql)
            .execute(engine.database().pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failed_stock_update_rolls_back_draws() {
        let (engine, _) = setup().await;
        engine.intake(intent("GG0002", 5, 10000, 25000)).await.unwrap();
        // The FIFO draw and the SALE entry land before the frame update fails
        abort_on(&engine, "fail_qty", "UPDATE OF current_qty").await;

        let err = engine.sell(GUCCI, sale(2)).await.unwrap_err();

        assert!(matches!(err, EngineError::Db(DbError::QueryFailed(ref msg)) if msg == "boom"));
        assert!(!err.is_user_error());

        let entries = engine.database().ledger().entries_for(GUCCI).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].transaction_type, TransactionType::Order);
        assert_eq!(entries[0].remaining_qty, Some(5));
        assert_eq!(frame_of(&engine, GUCCI).await.current_qty, 5);
        assert!(engine.audit_frame(GUCCI).await.unwrap().is_consistent());
    }

    #[tokio::test]
    async fn test_failed_rename_keeps_old_frame_and_ledger() {
        let (engine, _) = setup().await;
        engine.intake(intent("GG0002", 5, 10000, 25000)).await.unwrap();
        engine.sell(GUCCI, sale(1)).await.unwrap();
        let before = engine.database().ledger().entries_for(GUCCI).await.unwrap();
        // The new frame is inserted and the ledger re-keyed before the delete
        abort_on(&engine, "fail_delete", "DELETE").await;

        let update = IdentityUpdate {
            style_number: Some("GG0003".to_string()),
            ..Default::default()
        };
        let err = engine.rename_identity(GUCCI, update).await.unwrap_err();

        assert!(matches!(err, EngineError::Db(DbError::QueryFailed(ref msg)) if msg == "boom"));

        let new_id = "1001-GG0003-TRT-54";
        assert!(engine.database().frames().get(new_id).await.unwrap().is_none());
        assert!(engine.database().ledger().entries_for(new_id).await.unwrap().is_empty());

        let old = frame_of(&engine, GUCCI).await;
        assert_eq!(old.current_qty, 4);
        assert_eq!(old.style_number, "GG0002");
        assert_eq!(engine.database().ledger().entries_for(GUCCI).await.unwrap(), before);
        assert_eq!(engine.database().frames().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_drifted_batches_fail_loudly() {
        let (engine, _) = setup().await;
        engine.intake(intent("GG0002", 3, 10000, 25000)).await.unwrap();
        sqlx::query("UPDATE inventory_transactions SET remaining_qty = 1 WHERE transaction_type = 'ORDER'")
            .execute(engine.database().pool())
            .await
            .unwrap();

        let err = engine.sell(GUCCI, sale(2)).await.unwrap_err();

        assert!(matches!(
            err,
            EngineError::Core(CoreError::InsufficientBatchInventory { .. })
        ));
        assert!(!err.is_user_error());
        assert_eq!(frame_of(&engine, GUCCI).await.current_qty, 3);
    }

    #[tokio::test]
    async fn test_audit_reports_cache_drift() {
        let (engine, _) = setup().await;
        engine.intake(intent("GG0002", 3, 10000, 25000)).await.unwrap();
        engine.intake(intent("GG0003", 2, 10000, 25000)).await.unwrap();
        engine.sell(GUCCI, sale(1)).await.unwrap();

        let audits = engine.audit_all().await.unwrap();
        assert_eq!(audits.len(), 2);
        assert!(audits.iter().all(LedgerAudit::is_consistent));

        sqlx::query("UPDATE frames SET current_qty = 7 WHERE composite_id = ?1")
            .bind(GUCCI)
            .execute(engine.database().pool())
            .await
            .unwrap();

        let audit = engine.audit_frame(GUCCI).await.unwrap();
        assert!(audit
            .findings
            .contains(&AuditFinding::QuantityMismatch { cached: 7, ledger: 2 }));
    }

    #[tokio::test]
    async fn test_missing_frame() {
        let (engine, _) = setup().await;
        let err = engine.sell("1001-NOPE-X-50", sale(1)).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_reconciliation_status_is_an_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = AppConfig {
            sold_out_status: "Gone".to_string(),
            ..AppConfig::default()
        };

        let err = InventoryEngine::new(db, &config, Arc::new(FixedClock::new(day(2, 1))))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Core(CoreError::StatusNotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_do_not_oversell() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("jazzy.db")).max_connections(4);
        let (engine, _) = setup_with(config).await;
        engine.intake(intent("GG0002", 5, 10000, 25000)).await.unwrap();

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.sell(GUCCI, sale(3)).await })
            })
            .collect();
        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap());
        }

        let sold = results.iter().filter(|r| r.is_ok()).count();
        let refused = results
            .iter()
            .filter(|r| {
                matches!(
                    r,
                    Err(EngineError::Core(CoreError::InsufficientStock { available: 2, .. }))
                )
            })
            .count();
        assert_eq!((sold, refused), (1, 1));
        assert_eq!(frame_of(&engine, GUCCI).await.current_qty, 2);
        assert!(engine.audit_frame(GUCCI).await.unwrap().is_consistent());
    }
}
