//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod convert;
pub mod inventory;
pub mod posting;

pub use inventory::{InventoryError, InventoryRepository};
pub use posting::PostingRepository;
