//! # jazzy-core: Pure Inventory Ledger Logic for Jazzy Eyes
//!
//! This crate holds the inventory ledger's rules as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Jazzy Eyes Back Office                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Admin dashboard / HTTP adapter                  │   │
//! │  │     intake, sell, write off, restock, revert, rename, reports   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          jazzy-db  (InventoryEngine, unit of work, SQLite)      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ FrameSnapshot ──► LedgerPlan           │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ jazzy-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │   fifo   │ │  ledger  │ │  status  │ │ identity │          │   │
//! │  │   │  draws   │ │  plans   │ │ Sold Out │ │ re-key   │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  money   │ │  audit   │ │  report  │ │validation│          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO WALL CLOCK • PURE FUNCTIONS         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Frame, LedgerEntry, FrameStatus, Brand, Company
//! - [`money`] - Integer-cent money
//! - [`fifo`] - FIFO batch consumption
//! - [`ledger`] - Sale / write-off / restock / revert / intake plans
//! - [`status`] - Status reconciliation and protected-status guards
//! - [`identity`] - Composite ids and re-key planning
//! - [`audit`] - Ledger consistency checks
//! - [`report`] - Monthly report and inventory health aggregation
//! - [`analytics`] - Date-range trends, margins, sell-through, brand performance
//! - [`rx`] - Prescription sales recorded outside stock
//! - [`clock`] - Injectable time source
//! - [`validation`] - Input rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use jazzy_core::fifo;
//! use jazzy_core::money::Money;
//! # use jazzy_core::types::{LedgerEntry, TransactionType};
//! # use chrono::{TimeZone, Utc};
//! # fn batch(id: i64, day: u32, qty: i64, cost: i64) -> LedgerEntry {
//! #     let date = Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap();
//! #     LedgerEntry {
//! #         id, frame_id: "1001-GG0002-TRT-54".into(),
//! #         transaction_type: TransactionType::Restock, transaction_date: date,
//! #         invoice_date: None, quantity: qty, unit_cost_cents: cost,
//! #         unit_price_cents: 0, remaining_qty: Some(qty), write_off_reason: None,
//! #         reverted_from_id: None, notes: None, created_at: date,
//! #     }
//! # }
//!
//! // Jan 1: 2 @ $40, Jan 5: 3 @ $60
//! let batches = vec![batch(1, 1, 2, 4000), batch(2, 5, 3, 6000)];
//! let drawn = fifo::consume("1001-GG0002-TRT-54", &batches, 4).unwrap();
//!
//! assert_eq!(drawn.avg_unit_cost, Money::from_cents(5000));
//! assert_eq!(drawn.draws[0].remaining_after, 0);
//! assert_eq!(drawn.draws[1].remaining_after, 1);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod analytics;
pub mod audit;
pub mod clock;
pub mod error;
pub mod fifo;
pub mod identity;
pub mod ledger;
pub mod money;
pub mod report;
pub mod rx;
pub mod status;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CoreError, CoreResult, ValidationError};
pub use identity::{FrameIdentity, IdentityUpdate};
pub use ledger::{FrameSnapshot, IntakeIntent, LedgerPlan, RestockIntent, SaleIntent, WriteOffIntent};
pub use money::Money;
pub use rx::{RxSale, RxSaleIntent};
pub use status::StatusIds;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest quantity a single ledger entry may move.
///
/// Catches typos (1000 instead of 10) before they reach the ledger.
pub const MAX_TRANSACTION_QUANTITY: i64 = 9_999;

/// Units received by an intake that does not state a quantity.
pub const DEFAULT_INTAKE_QUANTITY: i64 = 1;

/// Status a new or replenished frame carries.
pub const ACTIVE_STATUS_NAME: &str = "Active";

/// Protected status the engine assigns when quantity reaches zero.
pub const SOLD_OUT_STATUS_NAME: &str = "Sold Out";
