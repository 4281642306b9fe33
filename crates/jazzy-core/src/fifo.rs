//! # FIFO Consumption
//!
//! Computes cost of goods sold by drawing from the oldest open batches first.
//!
//! ## Batch Walk
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  consume(4)                                                             │
//! │                                                                         │
//! │   Jan 1  ORDER    qty 2 @ $40   remaining 2 ──► draw 2 ──► remaining 0 │
//! │   Jan 5  RESTOCK  qty 3 @ $60   remaining 3 ──► draw 2 ──► remaining 1 │
//! │                                                                         │
//! │   total = 2×$40 + 2×$60 = $200      avg = $200 / 4 = $50               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Batches are ordered by transaction date (not insertion order) with the
//! ledger id breaking ties, so a backdated invoice is consumed before stock
//! that physically arrived later.
//!
//! The walk is pure: it returns the draws, and the store applies them in the
//! same unit of work as the entry they back.

use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::LedgerEntry;

/// Units taken from one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDraw {
    pub entry_id: i64,
    pub quantity: i64,
    pub unit_cost: Money,
    /// The batch's `remaining_qty` once this draw is applied.
    pub remaining_after: i64,
}

/// Result of a FIFO walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Consumption {
    pub quantity: i64,
    pub draws: Vec<BatchDraw>,
    pub total_cost: Money,
    /// `total_cost / quantity`, rounded to the nearest cent.
    pub avg_unit_cost: Money,
}

impl Consumption {
    fn empty() -> Self {
        Consumption {
            quantity: 0,
            draws: Vec::new(),
            total_cost: Money::zero(),
            avg_unit_cost: Money::zero(),
        }
    }
}

/// Open batches in consumption order.
pub fn open_batches(entries: &[LedgerEntry]) -> Vec<&LedgerEntry> {
    let mut open: Vec<&LedgerEntry> = entries.iter().filter(|e| e.open_qty() > 0).collect();
    open.sort_by(|a, b| {
        a.transaction_date
            .cmp(&b.transaction_date)
            .then(a.id.cmp(&b.id))
    });
    open
}

/// Units still available across all open batches.
pub fn available(entries: &[LedgerEntry]) -> i64 {
    entries.iter().map(LedgerEntry::open_qty).sum()
}

/// Draws `quantity` units from the oldest open batches.
///
/// ## Errors
/// `InsufficientBatchInventory` when the open batches cannot cover the
/// request. No partial consumption is ever returned.
pub fn consume(frame_id: &str, batches: &[LedgerEntry], quantity: i64) -> CoreResult<Consumption> {
    if quantity <= 0 {
        return Ok(Consumption::empty());
    }

    let on_hand = available(batches);
    if on_hand < quantity {
        return Err(CoreError::InsufficientBatchInventory {
            frame_id: frame_id.to_string(),
            requested: quantity,
            available: on_hand,
        });
    }

    let mut to_consume = quantity;
    let mut total_cost = Money::zero();
    let mut draws = Vec::new();

    for batch in open_batches(batches) {
        if to_consume == 0 {
            break;
        }

        let remaining = batch.open_qty();
        let take = remaining.min(to_consume);
        total_cost += batch.unit_cost().multiply_quantity(take);
        to_consume -= take;

        draws.push(BatchDraw {
            entry_id: batch.id,
            quantity: take,
            unit_cost: batch.unit_cost(),
            remaining_after: remaining - take,
        });
    }

    Ok(Consumption {
        quantity,
        draws,
        total_cost,
        avg_unit_cost: total_cost.average_over(quantity),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
