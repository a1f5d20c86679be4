//! Serialized unit lifecycle.
//!
//! A serial is created LOCKED when first presented against a document line,
//! becomes IN_STOCK when received (purchase or transfer destination), and
//! OUT_STOCK when sold. Serials are never deleted.

pub mod error;
pub mod import;
pub mod registry;
pub mod types;

pub use error::SerialError;
pub use import::import_serials;
pub use registry::{PostingSerials, SerialBook, SerialRegistry};
pub use types::{DocLineSn, ProductSn, SnStatus, SnTransition};
