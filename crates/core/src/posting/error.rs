//! Posting error types.
//!
//! Every variant aborts the whole posting attempt. Validation variants are
//! never retried automatically; only `ConcurrentModification` is.

use rust_decimal::Decimal;
use stockledger_shared::AppError;
use stockledger_shared::types::{DocLineId, DocumentId, ProductId, WarehouseId};
use thiserror::Error;

use crate::serial::SnStatus;

/// Which side of a movement a warehouse is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarehouseSide {
    /// Where stock leaves from.
    Source,
    /// Where stock arrives.
    Destination,
}

impl std::fmt::Display for WarehouseSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Destination => f.write_str("destination"),
        }
    }
}

/// Errors that can occur while posting a document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PostError {
    /// Document does not exist.
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    /// Document status is not one the engine understands.
    #[error("Document status {status} cannot be posted")]
    DocumentStatusNotPostable {
        /// Raw status.
        status: String,
    },

    /// No warehouse could be resolved for a line.
    #[error("Line {line_id} has no {side} warehouse")]
    MissingWarehouse {
        /// Offending line.
        line_id: DocLineId,
        /// Missing side.
        side: WarehouseSide,
    },

    /// Transfer source and destination are missing or equal.
    #[error("Line {line_id} is not a valid transfer: source and destination must differ")]
    InvalidTransfer {
        /// Offending line.
        line_id: DocLineId,
    },

    /// Balance is below the quantity requested.
    #[error(
        "Insufficient stock for product {product_id} in warehouse {warehouse_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        /// Offending line.
        line_id: DocLineId,
        /// Source warehouse.
        warehouse_id: WarehouseId,
        /// Product.
        product_id: ProductId,
        /// Quantity requested, including earlier lines drawing on the same balance.
        requested: Decimal,
        /// Quantity on hand.
        available: Decimal,
    },

    /// Line references an unknown product.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Line quantity is zero or negative.
    #[error("Line {line_id} quantity must be positive, got {qty}")]
    NonPositiveQuantity {
        /// Offending line.
        line_id: DocLineId,
        /// Quantity found.
        qty: Decimal,
    },

    /// Linked serial count differs from the line quantity.
    #[error("Line {line_id} needs {expected} serials, {linked} linked")]
    SnCountMismatch {
        /// Offending line.
        line_id: DocLineId,
        /// Line quantity.
        expected: Decimal,
        /// Serials linked.
        linked: usize,
    },

    /// Serial cannot be received in its current status.
    #[error("Serial {sn} has status {status}")]
    InvalidSnState {
        /// Serial code.
        sn: String,
        /// Current status.
        status: SnStatus,
    },

    /// Serial is not on hand at the source warehouse.
    #[error("Serial {sn} is not in stock at warehouse {warehouse_id}")]
    SnNotInStock {
        /// Serial code.
        sn: String,
        /// Source warehouse.
        warehouse_id: WarehouseId,
    },

    /// Serial belongs to a product other than the line's.
    #[error("Serial {sn} does not belong to the product of line {line_id}")]
    SnProductMismatch {
        /// Serial code.
        sn: String,
        /// Offending line.
        line_id: DocLineId,
    },

    /// Serial is linked to more than one line of the document.
    #[error("Serial {sn} is linked to more than one line")]
    SnLinkedTwice {
        /// Serial code.
        sn: String,
    },

    /// Warranty end of a sold product falls outside the calendar range.
    #[error("Warranty of product {product_id} on line {line_id} ends out of range")]
    WarrantyOutOfRange {
        /// Offending line.
        line_id: DocLineId,
        /// Product sold.
        product_id: ProductId,
    },

    /// Rows read by the posting changed before commit, on every attempt.
    #[error("Concurrent modification after {attempts} attempts")]
    ConcurrentModification {
        /// Attempts made.
        attempts: u32,
    },

    /// Storage backend failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Validated posting could not be applied.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PostError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::DocumentNotFound(_) | Self::ProductNotFound(_) => 404,

            Self::MissingWarehouse { .. }
            | Self::InvalidTransfer { .. }
            | Self::NonPositiveQuantity { .. }
            | Self::SnCountMismatch { .. } => 400,

            Self::DocumentStatusNotPostable { .. } | Self::ConcurrentModification { .. } => 409,

            Self::InsufficientStock { .. }
            | Self::InvalidSnState { .. }
            | Self::SnNotInStock { .. }
            | Self::SnProductMismatch { .. }
            | Self::SnLinkedTwice { .. }
            | Self::WarrantyOutOfRange { .. } => 422,

            Self::Storage(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::DocumentNotFound(_) => "DOCUMENT_NOT_FOUND",
            Self::DocumentStatusNotPostable { .. } => "DOCUMENT_STATUS_NOT_POSTABLE",
            Self::MissingWarehouse { .. } => "MISSING_WAREHOUSE",
            Self::InvalidTransfer { .. } => "INVALID_TRANSFER",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::NonPositiveQuantity { .. } => "NON_POSITIVE_QUANTITY",
            Self::SnCountMismatch { .. } => "SN_COUNT_MISMATCH",
            Self::InvalidSnState { .. } => "INVALID_SN_STATE",
            Self::SnNotInStock { .. } => "SN_NOT_IN_STOCK",
            Self::SnProductMismatch { .. } => "SN_PRODUCT_MISMATCH",
            Self::SnLinkedTwice { .. } => "SN_LINKED_TWICE",
            Self::WarrantyOutOfRange { .. } => "WARRANTY_OUT_OF_RANGE",
            Self::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if repeating the call unchanged may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

impl From<PostError> for AppError {
    fn from(err: PostError) -> Self {
        let message = err.to_string();
        match err {
            PostError::DocumentNotFound(_) | PostError::ProductNotFound(_) => Self::NotFound(message),
            PostError::MissingWarehouse { .. }
            | PostError::InvalidTransfer { .. }
            | PostError::NonPositiveQuantity { .. }
            | PostError::SnCountMismatch { .. } => Self::Validation(message),
            PostError::DocumentStatusNotPostable { .. }
            | PostError::InsufficientStock { .. }
            | PostError::InvalidSnState { .. }
            | PostError::SnNotInStock { .. }
            | PostError::SnProductMismatch { .. }
            | PostError::SnLinkedTwice { .. }
            | PostError::WarrantyOutOfRange { .. } => Self::BusinessRule(message),
            PostError::ConcurrentModification { .. } => Self::Conflict(message),
            PostError::Storage(_) => Self::Database(message),
            PostError::Internal(_) => Self::Internal(message),
        }
    }
}
