//! # Repository Module
//!
//! SQL access for the inventory store.
//!
//! ## Two Entry Points
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  db.frames().search("gg00", None, 50)     reads on the pool             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  FrameRepository / LedgerRepository / StatusRepository / ...            │
//! │                                                                         │
//! │  frame::fetch(uow.conn(), id)             reads and writes inside a     │
//! │  ledger::insert(uow.conn(), &entry)       unit of work                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  free functions generic over SqliteExecutor                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The repository structs delegate to the free functions where both need
//! the same query, so each statement lives in one place.
//!
//! ## Available Repositories
//!
//! - [`FrameRepository`](frame::FrameRepository) - Frame lookup and search
//! - [`LedgerRepository`](ledger::LedgerRepository) - History and write-off register
//! - [`StatusRepository`](status::StatusRepository) - Status definitions and counts
//! - [`BrandRepository`](brand::BrandRepository) - Companies and brands
//! - [`ReportRepository`](report::ReportRepository) - Monthly report, analytics and inventory health
//! - [`RxSaleRepository`](rx_sale::RxSaleRepository) - Prescription sales

pub mod brand;
pub mod frame;
pub mod ledger;
pub mod report;
pub mod rx_sale;
pub mod status;
