//! # jazzy-db: Store and Engine for the Jazzy Eyes Back Office
//!
//! SQLite persistence through sqlx, and the [`InventoryEngine`] that runs
//! every stock movement as one atomic unit of work.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  HTTP adapter / bin/seed / bin/audit                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     jazzy-db (THIS CRATE)                       │    │
//! │  │                                                                 │    │
//! │  │   InventoryEngine        Catalog            ReportRepository    │    │
//! │  │   (stock movements)      (statuses,         (monthly report,    │    │
//! │  │        │                  brands)            inventory health)  │    │
//! │  │        ▼                    │                     │             │    │
//! │  │   UnitOfWork ◄──────────────┘                     │             │    │
//! │  │        │                                          │             │    │
//! │  │        ▼                                          ▼             │    │
//! │  │   repository::{frame, ledger, status, brand}   SqlitePool       │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                          ▲                                      │
//! │       ▼                          │ plans                                │
//! │  SQLite (WAL)               jazzy-core (pure rules)                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`unit_of_work`] - One write transaction on one connection
//! - [`engine`] - Sale, write-off, revert, restock, intake, status, rename, audit
//! - [`catalog`] - Status, company and brand management
//! - [`repository`] - SQL for frames, ledger, statuses, brands and reports
//! - [`migrations`] - Embedded database migrations
//! - [`config`] - Settings from defaults and `JAZZY_*` variables
//! - [`telemetry`] - tracing subscriber setup for the binaries
//! - [`error`] - Database and engine error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use jazzy_db::{AppConfig, Database, InventoryEngine};
//! use jazzy_core::{SaleIntent, SystemClock};
//!
//! let config = AppConfig::from_env();
//! let db = Database::new(config.db_config()).await?;
//! let engine = InventoryEngine::new(db, &config, Arc::new(SystemClock)).await?;
//!
//! let sale = engine
//!     .sell("1001-GG0002-TRT-54", SaleIntent { quantity: 2, ..Default::default() })
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod telemetry;
pub mod unit_of_work;

// =============================================================================
// Re-exports
// =============================================================================

pub use catalog::Catalog;
pub use config::AppConfig;
pub use engine::{
    IntakeOutcome, InventoryEngine, MovementOutcome, RenameOutcome, SaleOutcome, WriteOffOutcome,
};
pub use error::{DbError, DbResult, EngineError, EngineResult};
pub use pool::{Database, DbConfig};
pub use unit_of_work::UnitOfWork;

// Repository re-exports for convenience
pub use repository::brand::BrandRepository;
pub use repository::frame::FrameRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::report::ReportRepository;
pub use repository::rx_sale::RxSaleRepository;
pub use repository::status::StatusRepository;
