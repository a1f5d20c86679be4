//! Document posting.
//!
//! [`PostingEngine::post`] is the single entry point. It reads and writes
//! exclusively through a [`PostingUnitOfWork`], which owns the atomicity
//! boundary: the engine never commits or rolls back anything itself.

pub mod engine;
pub mod error;
pub mod staged;
pub mod unit_of_work;

#[cfg(test)]
mod engine_props;

pub use engine::{PostingEngine, PostingOutcome};
pub use error::{PostError, WarehouseSide};
pub use staged::{PostingChanges, PostingSnapshot, StagedPosting};
pub use unit_of_work::PostingUnitOfWork;
