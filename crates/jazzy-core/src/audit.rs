//! # Ledger Audit
//!
//! Recomputes a frame's quantity from its full ledger and compares it with
//! the cached `current_qty` and with the stock left in open batches.
//!
//! ```text
//!   ledger_qty     = Σ inbound.quantity − Σ outbound.quantity
//!   batch_qty      = Σ batch.remaining_qty
//!   consistent  ⇔  ledger_qty == cached_qty == batch_qty  ∧  cached_qty ≥ 0
//! ```

use serde::Serialize;
use std::collections::HashMap;
use ts_rs::TS;

use crate::types::{Frame, LedgerEntry, TransactionType};

/// One inconsistency found in a frame's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(tag = "kind", rename_all = "camelCase")]
#[ts(export)]
pub enum AuditFinding {
    /// Cached quantity differs from the ledger sum.
    QuantityMismatch { cached: i64, ledger: i64 },
    /// Open batch stock differs from the cached quantity.
    BatchMismatch { cached: i64, batch_remaining: i64 },
    NegativeQuantity { cached: i64 },
    /// A batch with `remaining_qty` outside `0..=quantity`.
    BatchOutOfRange { entry_id: i64, remaining: i64, quantity: i64 },
    /// A write-off reverted more than once.
    DuplicateRevert { write_off_id: i64, revert_ids: Vec<i64> },
    /// A revert pointing at an entry that is not a write-off of this frame.
    DanglingRevert { entry_id: i64, reverted_from_id: i64 },
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LedgerAudit {
    pub frame_id: String,
    pub cached_qty: i64,
    pub ledger_qty: i64,
    pub batch_remaining: i64,
    pub entry_count: usize,
    pub findings: Vec<AuditFinding>,
}

impl LedgerAudit {
    pub fn is_consistent(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Audits `frame` against every ledger entry recorded for it.
pub fn audit_frame(frame: &Frame, entries: &[LedgerEntry]) -> LedgerAudit {
    let mut findings = Vec::new();

    let ledger_qty: i64 = entries.iter().map(LedgerEntry::signed_quantity).sum();
    let batch_remaining: i64 = entries
        .iter()
        .filter(|e| e.transaction_type.is_batch())
        .map(|e| e.remaining_qty.unwrap_or(0))
        .sum();

    if frame.current_qty < 0 {
        findings.push(AuditFinding::NegativeQuantity {
            cached: frame.current_qty,
        });
    }
    if ledger_qty != frame.current_qty {
        findings.push(AuditFinding::QuantityMismatch {
            cached: frame.current_qty,
            ledger: ledger_qty,
        });
    }
    if batch_remaining != frame.current_qty {
        findings.push(AuditFinding::BatchMismatch {
            cached: frame.current_qty,
            batch_remaining,
        });
    }

    for entry in entries.iter().filter(|e| e.transaction_type.is_batch()) {
        let remaining = entry.remaining_qty.unwrap_or(0);
        if remaining < 0 || remaining > entry.quantity {
            findings.push(AuditFinding::BatchOutOfRange {
                entry_id: entry.id,
                remaining,
                quantity: entry.quantity,
            });
        }
    }

    let write_offs: HashMap<i64, &LedgerEntry> = entries
        .iter()
        .filter(|e| e.transaction_type == TransactionType::WriteOff)
        .map(|e| (e.id, e))
        .collect();
    let mut reverts: HashMap<i64, Vec<i64>> = HashMap::new();
    for entry in entries
        .iter()
        .filter(|e| e.transaction_type == TransactionType::RevertWriteOff)
    {
        match entry.reverted_from_id {
            Some(target) if write_offs.contains_key(&target) => {
                reverts.entry(target).or_default().push(entry.id);
            }
            Some(target) => findings.push(AuditFinding::DanglingRevert {
                entry_id: entry.id,
                reverted_from_id: target,
            }),
            None => findings.push(AuditFinding::DanglingRevert {
                entry_id: entry.id,
                reverted_from_id: 0,
            }),
        }
    }
    let mut duplicates: Vec<_> = reverts.into_iter().filter(|(_, ids)| ids.len() > 1).collect();
    duplicates.sort_by_key(|(id, _)| *id);
    for (write_off_id, revert_ids) in duplicates {
        findings.push(AuditFinding::DuplicateRevert {
            write_off_id,
            revert_ids,
        });
    }

    LedgerAudit {
        frame_id: frame.composite_id.clone(),
        cached_qty: frame.current_qty,
        ledger_qty,
        batch_remaining,
        entry_count: entries.len(),
        findings,
    }
}
