//! # Ledger Planning
//!
//! Pure planning for every stock movement. Each operation takes a
//! [`FrameSnapshot`] read inside the caller's unit of work and returns a
//! [`LedgerPlan`]: the entry to append, the batch draws to apply, and the
//! frame's new quantity and status.
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   jazzy-db (unit of work)          jazzy-core (this module)             │
//! │   ───────────────────────          ────────────────────────             │
//! │   BEGIN IMMEDIATE                                                       │
//! │   load FrameSnapshot ───────────►  plan_sale / plan_write_off /         │
//! │                                    plan_restock / plan_revert           │
//! │                                         │                               │
//! │                                         │ validate intent               │
//! │                                         │ check stock                   │
//! │                                         │ FIFO draws                    │
//! │                                         │ reconcile status              │
//! │                                         ▼                               │
//! │   apply LedgerPlan ◄─────────────  LedgerPlan                           │
//! │   COMMIT                                                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quantity Invariant
//! ```text
//! currentQty = ORDER + Σ RESTOCK + Σ REVERT_WRITE_OFF − Σ SALE − Σ WRITE_OFF ≥ 0
//! Σ remainingQty over open batches = currentQty
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::fifo::{self, BatchDraw, Consumption};
use crate::identity::FrameIdentity;
use crate::money::Money;
use crate::status::{self, StatusIds};
use crate::types::{Frame, Gender, LedgerEntry, NewLedgerEntry, TransactionType, WriteOffReason};
use crate::validation;
use crate::DEFAULT_INTAKE_QUANTITY;

// =============================================================================
// Snapshot and Plan
// =============================================================================

/// Everything planning needs to know about one frame.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    pub frame: Frame,
    /// Batches with stock left (`remaining_qty > 0`).
    pub open_batches: Vec<LedgerEntry>,
    /// Unit price of the latest ORDER entry.
    pub retail_price: Money,
    /// Unit cost of the latest ORDER/RESTOCK entry (zero if none).
    pub last_known_cost: Money,
    pub status_ids: StatusIds,
}

/// Writes that one ledger operation commits together.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerPlan {
    pub frame_id: String,
    pub entry: NewLedgerEntry,
    pub draws: Vec<BatchDraw>,
    pub new_qty: i64,
    /// `Some` when reconciliation moves the frame to another status.
    pub new_status: Option<i64>,
}

impl LedgerPlan {
    /// The status the frame ends up with.
    pub fn resulting_status(&self, snapshot: &FrameSnapshot) -> i64 {
        self.new_status.unwrap_or(snapshot.frame.status_id)
    }
}

// =============================================================================
// Intents
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleIntent {
    pub quantity: i64,
    /// Overrides the frame's retail price.
    pub unit_price: Option<Money>,
    #[ts(as = "Option<String>")]
    pub sale_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WriteOffIntent {
    pub quantity: i64,
    pub reason: WriteOffReason,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RestockIntent {
    pub quantity: i64,
    /// Defaults to the last known cost.
    pub unit_cost: Option<Money>,
    /// Backdates the batch to the supplier invoice.
    #[ts(as = "Option<String>")]
    pub invoice_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// A new frame arriving with its first order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct IntakeIntent {
    #[serde(flatten)]
    #[ts(flatten)]
    pub identity: FrameIdentity,
    #[serde(default)]
    pub gender: Gender,
    pub frame_type: String,
    pub product_type: String,
    /// Defaults to one unit.
    pub quantity: Option<i64>,
    pub unit_cost: Money,
    pub unit_price: Money,
    #[ts(as = "Option<String>")]
    pub invoice_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Sale plan plus what the caller may want to show.
#[derive(Debug, Clone, PartialEq)]
pub struct SalePlan {
    pub plan: LedgerPlan,
    pub consumption: Consumption,
    /// The sale price is below the FIFO cost. Advisory only.
    pub below_cost: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteOffPlan {
    pub plan: LedgerPlan,
    pub consumption: Consumption,
}

/// A new frame row and its opening ORDER batch.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakePlan {
    pub frame: Frame,
    pub entry: NewLedgerEntry,
}

// =============================================================================
// Outbound: Sale and Write-off
// =============================================================================

fn ensure_in_stock(snapshot: &FrameSnapshot, quantity: i64) -> CoreResult<()> {
    if quantity > snapshot.frame.current_qty {
        return Err(CoreError::InsufficientStock {
            frame_id: snapshot.frame.composite_id.clone(),
            available: snapshot.frame.current_qty,
            requested: quantity,
        });
    }
    Ok(())
}

/// Plans a sale.
///
/// ## Steps
/// 1. `1 ≤ quantity ≤ currentQty`, else `InsufficientStock`
/// 2. FIFO draws for `quantity`; the average cost becomes the entry's unit cost
/// 3. unit price = override or retail price; date = sale date or `now`
/// 4. Sold Out when the quantity reaches zero
pub fn plan_sale(
    snapshot: &FrameSnapshot,
    intent: &SaleIntent,
    now: DateTime<Utc>,
) -> CoreResult<SalePlan> {
    validation::validate_quantity(intent.quantity)?;
    if let Some(price) = intent.unit_price {
        validation::validate_sale_price(price.cents())?;
    }
    let notes = validation::validate_notes(intent.notes.as_deref())?;
    ensure_in_stock(snapshot, intent.quantity)?;

    let frame = &snapshot.frame;
    let consumption = fifo::consume(&frame.composite_id, &snapshot.open_batches, intent.quantity)?;
    let unit_price = intent.unit_price.unwrap_or(snapshot.retail_price);
    let new_qty = frame.current_qty - intent.quantity;

    let entry = NewLedgerEntry {
        frame_id: frame.composite_id.clone(),
        transaction_type: TransactionType::Sale,
        transaction_date: intent.sale_date.unwrap_or(now),
        invoice_date: None,
        quantity: intent.quantity,
        unit_cost_cents: consumption.avg_unit_cost.cents(),
        unit_price_cents: unit_price.cents(),
        remaining_qty: None,
        write_off_reason: None,
        reverted_from_id: None,
        notes: Some(notes.unwrap_or_else(|| format!("Sold {} unit(s)", intent.quantity))),
        created_at: now,
    };

    Ok(SalePlan {
        below_cost: unit_price < consumption.avg_unit_cost,
        plan: LedgerPlan {
            frame_id: frame.composite_id.clone(),
            draws: consumption.draws.clone(),
            new_qty,
            new_status: status::after_outbound(frame.status_id, new_qty, snapshot.status_ids),
            entry,
        },
        consumption,
    })
}

/// Plans a write-off. Same shape as a sale, with a zero unit price and the
/// reason recorded.
pub fn plan_write_off(
    snapshot: &FrameSnapshot,
    intent: &WriteOffIntent,
    now: DateTime<Utc>,
) -> CoreResult<WriteOffPlan> {
    validation::validate_quantity(intent.quantity)?;
    let notes = validation::validate_notes(intent.notes.as_deref())?;
    ensure_in_stock(snapshot, intent.quantity)?;

    let frame = &snapshot.frame;
    let consumption = fifo::consume(&frame.composite_id, &snapshot.open_batches, intent.quantity)?;
    let new_qty = frame.current_qty - intent.quantity;

    let entry = NewLedgerEntry {
        frame_id: frame.composite_id.clone(),
        transaction_type: TransactionType::WriteOff,
        transaction_date: now,
        invoice_date: None,
        quantity: intent.quantity,
        unit_cost_cents: consumption.avg_unit_cost.cents(),
        unit_price_cents: 0,
        remaining_qty: None,
        write_off_reason: Some(intent.reason),
        reverted_from_id: None,
        notes,
        created_at: now,
    };

    Ok(WriteOffPlan {
        plan: LedgerPlan {
            frame_id: frame.composite_id.clone(),
            draws: consumption.draws.clone(),
            new_qty,
            new_status: status::after_outbound(frame.status_id, new_qty, snapshot.status_ids),
            entry,
        },
        consumption,
    })
}

// =============================================================================
// Inbound: Restock and Revert
// =============================================================================

/// Plans a restock: a fresh batch at the given or last known cost.
pub fn plan_restock(
    snapshot: &FrameSnapshot,
    intent: &RestockIntent,
    now: DateTime<Utc>,
) -> CoreResult<LedgerPlan> {
    validation::validate_quantity(intent.quantity)?;
    let unit_cost = intent.unit_cost.unwrap_or(snapshot.last_known_cost);
    validation::validate_unit_cost(unit_cost.cents())?;
    let notes = validation::validate_notes(intent.notes.as_deref())?;

    let frame = &snapshot.frame;
    let new_qty = frame.current_qty + intent.quantity;

    Ok(LedgerPlan {
        frame_id: frame.composite_id.clone(),
        entry: NewLedgerEntry {
            frame_id: frame.composite_id.clone(),
            transaction_type: TransactionType::Restock,
            transaction_date: intent.invoice_date.unwrap_or(now),
            invoice_date: intent.invoice_date,
            quantity: intent.quantity,
            unit_cost_cents: unit_cost.cents(),
            unit_price_cents: snapshot.retail_price.cents(),
            remaining_qty: Some(intent.quantity),
            write_off_reason: None,
            reverted_from_id: None,
            notes,
            created_at: now,
        },
        draws: Vec::new(),
        new_qty,
        new_status: status::after_inbound(frame.status_id, new_qty, snapshot.status_ids),
    })
}

/// Plans the reversal of `write_off`.
///
/// The restored units become a new batch at the write-off's cost; the
/// batches the write-off drained are left as they are, since later sales
/// may have consumed them since.
///
/// ## Errors
/// - `NotAWriteOff` if the entry is of another type
/// - `EntryFrameMismatch` if it belongs to another frame
/// - `AlreadyReverted` if `reverted_by` is set
pub fn plan_revert(
    snapshot: &FrameSnapshot,
    write_off: &LedgerEntry,
    reverted_by: Option<i64>,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> CoreResult<LedgerPlan> {
    let frame = &snapshot.frame;

    if write_off.transaction_type != TransactionType::WriteOff {
        return Err(CoreError::NotAWriteOff {
            entry_id: write_off.id,
            actual: write_off.transaction_type,
        });
    }
    if write_off.frame_id != frame.composite_id {
        return Err(CoreError::EntryFrameMismatch {
            entry_id: write_off.id,
            frame_id: frame.composite_id.clone(),
        });
    }
    if reverted_by.is_some() {
        return Err(CoreError::AlreadyReverted {
            write_off_id: write_off.id,
        });
    }

    let notes = validation::validate_notes(notes)?
        .unwrap_or_else(|| format!("Reverted write-off #{}", write_off.id));
    let new_qty = frame.current_qty + write_off.quantity;

    Ok(LedgerPlan {
        frame_id: frame.composite_id.clone(),
        entry: NewLedgerEntry {
            frame_id: frame.composite_id.clone(),
            transaction_type: TransactionType::RevertWriteOff,
            transaction_date: now,
            invoice_date: None,
            quantity: write_off.quantity,
            unit_cost_cents: write_off.unit_cost_cents,
            unit_price_cents: 0,
            remaining_qty: Some(write_off.quantity),
            write_off_reason: None,
            reverted_from_id: Some(write_off.id),
            notes: Some(notes),
            created_at: now,
        },
        draws: Vec::new(),
        new_qty,
        new_status: status::after_inbound(frame.status_id, new_qty, snapshot.status_ids),
    })
}

// =============================================================================
// Intake
// =============================================================================

/// Plans a new frame with its opening ORDER batch, in the Active status.
pub fn plan_intake(
    intent: &IntakeIntent,
    active_status: i64,
    now: DateTime<Utc>,
) -> CoreResult<IntakePlan> {
    let identity = FrameIdentity::new(
        intent.identity.brand_id,
        &intent.identity.style_number,
        &intent.identity.color_code,
        &intent.identity.eye_size,
    );
    identity.validate()?;
    validation::validate_frame_type(&intent.frame_type)?;
    validation::validate_product_type(&intent.product_type)?;

    let quantity = intent.quantity.unwrap_or(DEFAULT_INTAKE_QUANTITY);
    validation::validate_quantity(quantity)?;
    validation::validate_unit_cost(intent.unit_cost.cents())?;
    validation::validate_unit_price(intent.unit_price.cents())?;
    let notes = validation::validate_notes(intent.notes.as_deref())?;

    let composite_id = identity.composite_id();
    let frame = Frame {
        composite_id: composite_id.clone(),
        brand_id: identity.brand_id,
        status_id: active_status,
        style_number: identity.style_number,
        color_code: identity.color_code,
        eye_size: identity.eye_size,
        gender: intent.gender,
        frame_type: intent.frame_type.clone(),
        product_type: intent.product_type.clone(),
        current_qty: quantity,
        created_at: now,
        updated_at: now,
    };

    let entry = NewLedgerEntry {
        frame_id: composite_id,
        transaction_type: TransactionType::Order,
        transaction_date: intent.invoice_date.unwrap_or(now),
        invoice_date: intent.invoice_date,
        quantity,
        unit_cost_cents: intent.unit_cost.cents(),
        unit_price_cents: intent.unit_price.cents(),
        remaining_qty: Some(quantity),
        write_off_reason: None,
        reverted_from_id: None,
        notes,
        created_at: now,
    };

    Ok(IntakePlan { frame, entry })
}

// =============================================================================
// Unit Tests
// =============================================================================
