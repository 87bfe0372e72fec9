//! # Repository Module
//!
//! SQL for each table, isolated in one place.
//!
//! ## Two Ways In
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Reads from anywhere                 Writes from the ledger             │
//! │  ───────────────────                 ──────────────────────             │
//! │  db.products().get_by_id(id)         let mut tx = pool.begin().await?;  │
//! │       │                              product::lock(&mut *tx, id)        │
//! │       │                              product::apply_delta(&mut *tx, ..) │
//! │       │                              movement::insert(&mut *tx, ..)     │
//! │       │                              tx.commit().await?;                │
//! │       ▼                                   │                             │
//! │  ProductRepository { pool }               │                             │
//! │       │                                   │                             │
//! │       └──────────► product::find ◄────────┘                             │
//! │                  (generic over sqlx::Executor)                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every free function takes any `sqlx::Executor`, so the same SQL runs on
//! the pool or on an open transaction. The `*Repository` structs wrap the
//! pool for read paths.

pub mod category;
pub mod client;
pub mod movement;
pub mod payment;
pub mod product;
pub mod transaction;

pub use category::CategoryRepository;
pub use client::ClientRepository;
pub use movement::MovementRepository;
pub use payment::PaymentRepository;
pub use product::ProductRepository;
pub use transaction::TransactionRepository;
