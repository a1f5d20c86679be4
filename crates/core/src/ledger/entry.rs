//! Stock ledger entry domain type.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stockledger_shared::types::{
    DocLineId, DocumentId, LedgerEntryId, ProductId, WarehouseId,
};

use crate::balance::BalanceKey;
use crate::document::{DocLine, DocType, Document};

/// Direction of a ledger movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Movement {
    /// Quantity entering the warehouse.
    In,
    /// Quantity leaving the warehouse.
    Out,
}

/// One journaled movement of a product at a warehouse.
///
/// Exactly one of `in_qty` / `out_qty` is nonzero. Construct through
/// [`StockLedgerEntry::inbound`] or [`StockLedgerEntry::outbound`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLedgerEntry {
    /// Unique identifier.
    pub id: LedgerEntryId,
    /// Warehouse the movement happened at.
    pub warehouse_id: WarehouseId,
    /// Product moved.
    pub product_id: ProductId,
    /// Document that caused the movement.
    pub ref_doc_id: DocumentId,
    /// Line that caused the movement.
    pub ref_line_id: DocLineId,
    /// Type of the causing document.
    pub ref_type: DocType,
    /// Business date of the causing document.
    pub biz_date: NaiveDate,
    /// Quantity received.
    pub in_qty: Decimal,
    /// Quantity issued.
    pub out_qty: Decimal,
    /// Unit cost. Costing is not computed, so this stays `None`.
    pub unit_cost: Option<Decimal>,
    /// When the row was written.
    pub created_at: DateTime<Utc>,
}

impl StockLedgerEntry {
    /// Journals `line.qty` entering `warehouse_id`.
    #[must_use]
    pub fn inbound(
        doc: &Document,
        line: &DocLine,
        warehouse_id: WarehouseId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::movement(doc, line, warehouse_id, line.qty, Decimal::ZERO, created_at)
    }

    /// Journals `line.qty` leaving `warehouse_id`.
    #[must_use]
    pub fn outbound(
        doc: &Document,
        line: &DocLine,
        warehouse_id: WarehouseId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::movement(doc, line, warehouse_id, Decimal::ZERO, line.qty, created_at)
    }

    fn movement(
        doc: &Document,
        line: &DocLine,
        warehouse_id: WarehouseId,
        in_qty: Decimal,
        out_qty: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LedgerEntryId::new(),
            warehouse_id,
            product_id: line.product_id,
            ref_doc_id: doc.id,
            ref_line_id: line.id,
            ref_type: doc.doc_type,
            biz_date: doc.biz_date,
            in_qty,
            out_qty,
            unit_cost: None,
            created_at,
        }
    }

    /// Returns the direction of this movement.
    #[must_use]
    pub fn movement_kind(&self) -> Movement {
        if self.in_qty.is_zero() {
            Movement::Out
        } else {
            Movement::In
        }
    }

    /// Returns `in_qty - out_qty`.
    #[must_use]
    pub fn signed_qty(&self) -> Decimal {
        self.in_qty - self.out_qty
    }

    /// Returns the balance row this entry moves.
    #[must_use]
    pub const fn balance_key(&self) -> BalanceKey {
        BalanceKey::new(self.warehouse_id, self.product_id)
    }
}
