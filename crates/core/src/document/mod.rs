//! Inventory documents and their lines.
//!
//! Documents are the unit of work the posting engine consumes. They are
//! created and edited by the surrounding application; the engine only reads
//! them and stamps the posted status.

pub mod error;
pub mod product;
pub mod types;

pub use error::DocumentError;
pub use product::Product;
pub use types::{DocLine, DocStatus, DocType, Document};
