//! Append-only stock ledger.
//!
//! Every quantity movement is journaled as one row per (warehouse, line,
//! direction). Rows are never updated or deleted; balances must always equal
//! the signed sum of the rows for their (warehouse, product).

pub mod entry;
pub mod journal;
pub mod reconcile;

pub use entry::{Movement, StockLedgerEntry};
pub use journal::{LedgerBook, StockLedger};
pub use reconcile::{Discrepancy, derive_balances, find_discrepancies};
