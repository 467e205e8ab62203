//! # mesa-db: Storage Layer for Mesa POS
//!
//! SQLite persistence and the transactional boundaries of every public
//! operation: order lifecycle, the settlement engine, cash sessions, floor
//! occupancy, catalog and parameters.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           mesa-db                                       │
//! │                                                                         │
//! │  Database (pool + migrations)                                           │
//! │      ├── orders()     open tabs: create, lines, cancel, queries         │
//! │      ├── invoices()   settlement engine + invoice queries               │
//! │      ├── sessions()   cash session lifecycle + reconciliation           │
//! │      ├── floor()      rooms, tables, occupancy reconciliation           │
//! │      ├── products()   catalog + best-effort sale counters               │
//! │      └── params()     singleton tax/discount configuration              │
//! │                                                                         │
//! │  Concurrency model: no global lock. Each operation is one               │
//! │  transaction; cross-entity invariants are guarded by optimistic         │
//! │  version columns and storage-level unique indexes, and table            │
//! │  occupancy is self-healed by an explicit reconciliation pass on read.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{DbError, DbResult, PosError, PosResult};
pub use pool::{Database, DbConfig};
pub use repository::{
    CashSessionRepository, FloorRepository, InvoiceRepository, OrderRepository, ParamsRepository,
    ProductRepository,
};
