//! # tally-db: Database Layer and Ledger for Tally
//!
//! SQLite storage for the back office plus the ledger service that runs
//! every multi-table write as one database transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Data Flow                                │
//! │                                                                         │
//! │  Caller (HTTP handler, CLI, seed binary)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     tally-db (THIS CRATE)                       │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │    │
//! │  │   │    Ledger     │    │  Repositories │    │  Migrations  │    │    │
//! │  │   │  (ledger/)    │───►│ (repository/) │    │  (embedded)  │    │    │
//! │  │   │               │    │               │    │              │    │    │
//! │  │   │ post, cancel, │    │ one module    │    │ 001_initial  │    │    │
//! │  │   │ adjust stock, │    │ per table     │    │ _schema.sql  │    │    │
//! │  │   │ balances      │    │               │    │              │    │    │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘    │    │
//! │  │           └─────────┬──────────┘                                │    │
//! │  │                     ▼                                           │    │
//! │  │             Database (pool.rs)                                  │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL, foreign keys on, append-only triggers)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Per-table SQL
//! - [`ledger`] - Atomic operations and their error taxonomy
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig, LedgerConfig};
//!
//! let db = Database::new(DbConfig::from_env()).await?;
//! let ledger = db.ledger(LedgerConfig::from_env());
//!
//! let posted = ledger.post_transaction(&request).await?;
//! let low = ledger.low_stock_products().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use ledger::{ErrorCode, ErrorPayload, Ledger, LedgerConfig, LedgerError, LedgerResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    CategoryRepository, ClientRepository, MovementRepository, PaymentRepository,
    ProductRepository, TransactionRepository,
};
