//! Core inventory logic for Stockledger.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and the posting engine live here.
//!
//! # Modules
//!
//! - `document` - Documents, lines, and products consumed by posting
//! - `balance` - Per-warehouse on-hand quantities
//! - `ledger` - Append-only stock ledger and reconciliation
//! - `serial` - Serialized unit lifecycle and line links
//! - `posting` - Two-phase posting engine and unit of work
//! - `memory` - Thread-safe in-memory inventory

pub mod balance;
pub mod document;
pub mod ledger;
pub mod memory;
pub mod posting;
pub mod serial;
