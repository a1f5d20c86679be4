//! Document and line domain types.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stockledger_shared::types::{
    DocLineId, DocumentId, PartnerId, ProductId, UserId, WarehouseId,
};

use super::error::DocumentError;

/// Classification of a document's inventory effect.
///
/// The set is closed: adding a variant forces every `match` in the posting
/// engine to handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocType {
    /// Goods received from a supplier into a warehouse.
    PurchaseIn,
    /// Goods shipped to a customer out of a warehouse.
    SalesOut,
    /// Goods moved between two warehouses.
    Transfer,
}

impl DocType {
    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PurchaseIn => "PURCHASE_IN",
            Self::SalesOut => "SALES_OUT",
            Self::Transfer => "TRANSFER",
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocType {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PURCHASE_IN" => Ok(Self::PurchaseIn),
            "SALES_OUT" => Ok(Self::SalesOut),
            "TRANSFER" => Ok(Self::Transfer),
            other => Err(DocumentError::UnknownDocType(other.to_string())),
        }
    }
}

/// Document status.
///
/// Transitions: Draft → Approved → Posted, or Draft → Posted directly.
/// Posted is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocStatus {
    /// Being edited; lines and serial links may change.
    Draft,
    /// Approved for posting; lines are frozen.
    Approved,
    /// Applied to stock. Immutable.
    Posted,
}

impl DocStatus {
    /// Returns true if the posting engine may apply a document in this status.
    #[must_use]
    pub const fn is_postable(&self) -> bool {
        matches!(self, Self::Draft | Self::Approved)
    }

    /// Returns true if lines and serial links may still change.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Approved => "APPROVED",
            Self::Posted => "POSTED",
        }
    }
}

impl std::fmt::Display for DocStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocStatus {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(Self::Draft),
            "APPROVED" => Ok(Self::Approved),
            "POSTED" => Ok(Self::Posted),
            other => Err(DocumentError::UnknownStatus(other.to_string())),
        }
    }
}

/// An inventory document header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier.
    pub id: DocumentId,
    /// Inventory effect of the document.
    pub doc_type: DocType,
    /// Human-facing document number.
    pub doc_no: String,
    /// Business date stamped on ledger rows and serial history.
    pub biz_date: NaiveDate,
    /// Supplier or customer.
    pub partner_id: Option<PartnerId>,
    /// Default source warehouse for lines without an override.
    pub from_wh: Option<WarehouseId>,
    /// Default destination warehouse for lines without an override.
    pub to_wh: Option<WarehouseId>,
    /// Current status.
    pub status: DocStatus,
    /// Free-form remark.
    pub remark: Option<String>,
    /// User who created the document.
    pub created_by: Option<UserId>,
    /// When the document was created.
    pub created_at: DateTime<Utc>,
    /// User who approved the document.
    pub approved_by: Option<UserId>,
    /// When the document was approved.
    pub approved_at: Option<DateTime<Utc>>,
    /// User who posted the document.
    pub posted_by: Option<UserId>,
    /// When the document was posted.
    pub posted_at: Option<DateTime<Utc>>,
}

impl Document {
    /// Creates a new draft document without default warehouses.
    #[must_use]
    pub fn draft(
        doc_type: DocType,
        doc_no: impl Into<String>,
        biz_date: NaiveDate,
        created_by: UserId,
    ) -> Self {
        Self {
            id: DocumentId::new(),
            doc_type,
            doc_no: doc_no.into(),
            biz_date,
            partner_id: None,
            from_wh: None,
            to_wh: None,
            status: DocStatus::Draft,
            remark: None,
            created_by: Some(created_by),
            created_at: Utc::now(),
            approved_by: None,
            approved_at: None,
            posted_by: None,
            posted_at: None,
        }
    }

    /// Sets the default source warehouse.
    #[must_use]
    pub fn with_source(mut self, warehouse: WarehouseId) -> Self {
        self.from_wh = Some(warehouse);
        self
    }

    /// Sets the default destination warehouse.
    #[must_use]
    pub fn with_destination(mut self, warehouse: WarehouseId) -> Self {
        self.to_wh = Some(warehouse);
        self
    }

    /// Sets the trading partner.
    #[must_use]
    pub fn with_partner(mut self, partner: PartnerId) -> Self {
        self.partner_id = Some(partner);
        self
    }

    /// Approves a draft document.
    pub fn approve(&mut self, approved_by: UserId, at: DateTime<Utc>) -> Result<(), DocumentError> {
        if self.status != DocStatus::Draft {
            return Err(DocumentError::InvalidTransition {
                from: self.status,
                to: DocStatus::Approved,
            });
        }
        self.status = DocStatus::Approved;
        self.approved_by = Some(approved_by);
        self.approved_at = Some(at);
        Ok(())
    }

    /// Stamps the posted status. Only the posting engine's unit of work calls this.
    pub(crate) fn mark_posted(&mut self, posted_by: UserId, at: DateTime<Utc>) {
        self.status = DocStatus::Posted;
        self.posted_by = Some(posted_by);
        self.posted_at = Some(at);
    }

    /// Resolves the source warehouse of a line (line override, then document default).
    #[must_use]
    pub fn source_for(&self, line: &DocLine) -> Option<WarehouseId> {
        line.from_wh.or(self.from_wh)
    }

    /// Resolves the destination warehouse of a line (line override, then document default).
    #[must_use]
    pub fn destination_for(&self, line: &DocLine) -> Option<WarehouseId> {
        line.to_wh.or(self.to_wh)
    }
}

/// Decimal places kept for line quantities.
pub const QTY_SCALE: u32 = 2;

/// A document line moving one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocLine {
    /// Unique identifier.
    pub id: DocLineId,
    /// Owning document.
    pub doc_id: DocumentId,
    /// Position within the document.
    pub line_no: i32,
    /// Product moved.
    pub product_id: ProductId,
    /// Quantity moved. Always positive.
    pub qty: Decimal,
    /// Optional unit price, informational only.
    pub unit_price: Option<Decimal>,
    /// Optional line amount, informational only.
    pub amount: Option<Decimal>,
    /// Source warehouse override.
    pub from_wh: Option<WarehouseId>,
    /// Destination warehouse override.
    pub to_wh: Option<WarehouseId>,
    /// Free-form remark.
    pub remark: Option<String>,
}

impl DocLine {
    /// Creates a line, rejecting quantities [`DocLine::check_qty`] refuses.
    pub fn new(
        doc_id: DocumentId,
        line_no: i32,
        product_id: ProductId,
        qty: Decimal,
    ) -> Result<Self, DocumentError> {
        Self::check_qty(qty)?;
        Ok(Self {
            id: DocLineId::new(),
            doc_id,
            line_no,
            product_id,
            qty,
            unit_price: None,
            amount: None,
            from_wh: None,
            to_wh: None,
            remark: None,
        })
    }

    /// Checks that a quantity is positive and fits [`QTY_SCALE`] decimal places.
    ///
    /// Trailing zeros do not count, so `1.500` is accepted.
    pub fn check_qty(qty: Decimal) -> Result<(), DocumentError> {
        if qty <= Decimal::ZERO {
            return Err(DocumentError::NonPositiveQuantity(qty));
        }
        if qty.normalize().scale() > QTY_SCALE {
            return Err(DocumentError::QuantityScale(qty));
        }
        Ok(())
    }

    /// Checks a full set of lines before they are stored under `doc_id`.
    pub fn check_lines(doc_id: DocumentId, lines: &[Self]) -> Result<(), DocumentError> {
        let mut line_nos = HashSet::with_capacity(lines.len());
        for line in lines {
            if line.doc_id != doc_id {
                return Err(DocumentError::ForeignLine {
                    line_id: line.id,
                    doc_id,
                });
            }
            Self::check_qty(line.qty)?;
            if !line_nos.insert(line.line_no) {
                return Err(DocumentError::DuplicateLineNo(line.line_no));
            }
        }
        Ok(())
    }

    /// Overrides the source warehouse.
    #[must_use]
    pub fn with_source(mut self, warehouse: WarehouseId) -> Self {
        self.from_wh = Some(warehouse);
        self
    }

    /// Overrides the destination warehouse.
    #[must_use]
    pub fn with_destination(mut self, warehouse: WarehouseId) -> Self {
        self.to_wh = Some(warehouse);
        self
    }

    /// Sets the unit price and derives the line amount.
    #[must_use]
    pub fn with_unit_price(mut self, unit_price: Decimal) -> Self {
        self.unit_price = Some(unit_price);
        self.amount = Some(unit_price * self.qty);
        self
    }
}
