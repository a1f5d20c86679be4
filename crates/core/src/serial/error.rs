//! Serial registry error types.

use stockledger_shared::types::{DocLineId, DocumentId, ProductId, SerialId};
use thiserror::Error;

use super::types::SnStatus;

/// Errors raised by serial registration and linking.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SerialError {
    /// The serial is registered to another product.
    #[error("Serial {sn} belongs to product {actual}, not {expected}")]
    ProductMismatch {
        /// Serial code.
        sn: String,
        /// Product the caller asked for.
        expected: ProductId,
        /// Product the serial is registered to.
        actual: ProductId,
    },

    /// The serial cannot be linked in its current status.
    #[error("Serial {sn} has status {status} and cannot be linked")]
    InvalidState {
        /// Serial code.
        sn: String,
        /// Current status.
        status: SnStatus,
    },

    /// A blank serial code was presented.
    #[error("Serial code cannot be empty")]
    EmptySerial,

    /// No serial codes were presented.
    #[error("At least one serial code is required")]
    NoSerials,

    /// The line's product does not track serials.
    #[error("Product {0} does not track serial numbers")]
    ProductNotTracked(ProductId),

    /// Serial links cannot change once the document is posted.
    #[error("Document {0} is posted; serial links are frozen")]
    DocumentPosted(DocumentId),

    /// The line does not belong to the document.
    #[error("Line {line_id} does not belong to document {doc_id}")]
    LineNotInDocument {
        /// Line presented.
        line_id: DocLineId,
        /// Document presented.
        doc_id: DocumentId,
    },

    /// Document not found.
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    /// Line not found.
    #[error("Line not found: {0}")]
    LineNotFound(DocLineId),

    /// Product not found.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Serial not found.
    #[error("Serial not found: {0}")]
    SerialNotFound(SerialId),

    /// The serial is not linked to the line.
    #[error("Serial {sn_id} is not linked to line {line_id}")]
    LinkNotFound {
        /// Line presented.
        line_id: DocLineId,
        /// Serial presented.
        sn_id: SerialId,
    },
}
