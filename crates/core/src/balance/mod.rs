//! Per-warehouse stock balances.
//!
//! A balance row exists per (warehouse, product) pair. Absence of a row means
//! zero on hand. Rows are created on first movement and never deleted.

pub mod store;

pub use store::{BalanceKey, BalanceSheet, BalanceStore, StockBalance};
