//! Document model errors.

use rust_decimal::Decimal;
use stockledger_shared::types::{DocLineId, DocumentId};
use thiserror::Error;

use super::types::DocStatus;

/// Errors raised while building or transitioning documents.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    /// Status transition is not allowed.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: DocStatus,
        /// Requested status.
        to: DocStatus,
    },

    /// Line quantity must be strictly positive.
    #[error("Line quantity must be positive, got {0}")]
    NonPositiveQuantity(Decimal),

    /// Line quantity carries more decimal places than storage keeps.
    #[error("Line quantity {0} has more than {scale} decimal places", scale = super::types::QTY_SCALE)]
    QuantityScale(Decimal),

    /// Two lines of one document share a line number.
    #[error("Duplicate line number {0}")]
    DuplicateLineNo(i32),

    /// Product warranty exceeds the supported maximum.
    #[error("Warranty of {0} months exceeds the maximum of {max}", max = super::product::MAX_WARRANTY_MONTHS)]
    WarrantyTooLong(u32),

    /// Unknown document type string.
    #[error("Unknown document type: {0}")]
    UnknownDocType(String),

    /// Unknown document status string.
    #[error("Unknown document status: {0}")]
    UnknownStatus(String),

    /// Document does not exist.
    #[error("Document not found: {0}")]
    NotFound(DocumentId),

    /// A document with this id already exists.
    #[error("Document already exists: {0}")]
    AlreadyExists(DocumentId),

    /// A line was handed in with a document it does not belong to.
    #[error("Line {line_id} does not belong to document {doc_id}")]
    ForeignLine {
        /// Offending line.
        line_id: DocLineId,
        /// Document being created.
        doc_id: DocumentId,
    },
}
