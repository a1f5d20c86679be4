//! In-memory inventory backend.
//!
//! Holds documents, balances, the ledger and the serial registry behind one
//! mutex and posts through the engine with optimistic concurrency.

pub mod inventory;

#[cfg(test)]
mod tests;

pub use inventory::InMemoryInventory;
