//! # Status Reconciliation
//!
//! Keeps a frame's lifecycle status consistent with its quantity.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌──────────┐  sale / write-off to qty 0   ┌──────────────────────┐    │
//! │   │  Active  │ ───────────────────────────► │ Sold Out (protected) │    │
//! │   │  or any  │                              └──────────┬───────────┘    │
//! │   │  custom  │ ◄───────────────────────────────────────┘                │
//! │   └──────────┘  restock / revert to qty > 0 (back to Active)            │
//! │        ▲                                                                │
//! │        │ manual assignment (change_status): any unprotected status      │
//! │        ▼                                                                │
//! │   Discontinued, Reserved, Damaged, On Hold, ...                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only the engine moves a frame into or out of a protected status; a manual
//! assignment of a protected status fails with `ProtectedStatusViolation`.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::FrameStatus;

/// Ids of the two statuses reconciliation assigns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusIds {
    pub active: i64,
    pub sold_out: i64,
}

/// Status after an outbound movement (sale, write-off) leaves `new_qty`.
///
/// Returns `None` when the status should not change.
pub fn after_outbound(current_status: i64, new_qty: i64, ids: StatusIds) -> Option<i64> {
    if new_qty == 0 && current_status != ids.sold_out {
        Some(ids.sold_out)
    } else {
        None
    }
}

/// Status after an inbound movement (restock, revert) leaves `new_qty`.
///
/// Only Sold Out is cleared; a Discontinued frame that gets restocked stays
/// Discontinued.
pub fn after_inbound(current_status: i64, new_qty: i64, ids: StatusIds) -> Option<i64> {
    if new_qty > 0 && current_status == ids.sold_out {
        Some(ids.active)
    } else {
        None
    }
}

/// Guards a manual status assignment.
pub fn ensure_assignable(target: &FrameStatus) -> CoreResult<()> {
    if target.is_protected {
        return Err(CoreError::ProtectedStatusViolation {
            status: target.name.clone(),
        });
    }
    Ok(())
}

/// Guards edits to a status definition (rename, recolor).
pub fn ensure_editable(status: &FrameStatus) -> CoreResult<()> {
    ensure_assignable(status)
}

/// Guards deletion of a status definition.
pub fn ensure_deletable(status: &FrameStatus, product_count: i64) -> CoreResult<()> {
    ensure_editable(status)?;
    if product_count > 0 {
        return Err(CoreError::StatusInUse {
            name: status.name.clone(),
            product_count,
        });
    }
    Ok(())
}

/// Display order for a newly created status (appended last).
pub fn next_display_order(existing: &[FrameStatus]) -> i64 {
    existing.iter().map(|s| s.display_order).max().unwrap_or(0) + 1
}
