//! Serialized unit domain types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stockledger_shared::types::{DocLineId, DocumentId, ProductId, SerialId, WarehouseId};

/// Lifecycle status of a serialized unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnStatus {
    /// Presented against a line of an undecided document, not yet received.
    Locked,
    /// On hand at `ProductSn::warehouse_id`.
    InStock,
    /// Sold.
    OutStock,
}

impl SnStatus {
    /// Returns true if the serial may be linked to a new line.
    #[must_use]
    pub const fn is_linkable(&self) -> bool {
        matches!(self, Self::Locked | Self::InStock)
    }

    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Locked => "LOCKED",
            Self::InStock => "IN_STOCK",
            Self::OutStock => "OUT_STOCK",
        }
    }
}

impl std::fmt::Display for SnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SnStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOCKED" => Ok(Self::Locked),
            "IN_STOCK" => Ok(Self::InStock),
            "OUT_STOCK" => Ok(Self::OutStock),
            other => Err(format!("Unknown serial status: {other}")),
        }
    }
}

/// A serialized physical unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSn {
    /// Unique identifier.
    pub id: SerialId,
    /// Product the unit belongs to.
    pub product_id: ProductId,
    /// Globally unique serial code.
    pub sn: String,
    /// Lifecycle status.
    pub status: SnStatus,
    /// Current (or last) warehouse.
    pub warehouse_id: Option<WarehouseId>,
    /// Receiving document.
    pub in_doc_id: Option<DocumentId>,
    /// Receiving line.
    pub in_line_id: Option<DocLineId>,
    /// Receiving business date.
    pub in_date: Option<NaiveDate>,
    /// Selling document.
    pub out_doc_id: Option<DocumentId>,
    /// Selling line.
    pub out_line_id: Option<DocLineId>,
    /// Selling business date.
    pub out_date: Option<NaiveDate>,
    /// Warranty start (sale date).
    pub warranty_start: Option<NaiveDate>,
    /// Warranty end.
    pub warranty_end: Option<NaiveDate>,
}

impl ProductSn {
    /// Registers a new serial in LOCKED status with no location or history.
    #[must_use]
    pub fn locked(sn: impl Into<String>, product_id: ProductId) -> Self {
        Self {
            id: SerialId::new(),
            product_id,
            sn: sn.into(),
            status: SnStatus::Locked,
            warehouse_id: None,
            in_doc_id: None,
            in_line_id: None,
            in_date: None,
            out_doc_id: None,
            out_line_id: None,
            out_date: None,
            warranty_start: None,
            warranty_end: None,
        }
    }

    /// Marks the unit received at `warehouse_id`.
    pub fn receive(
        &mut self,
        warehouse_id: WarehouseId,
        doc_id: DocumentId,
        line_id: DocLineId,
        date: NaiveDate,
    ) {
        self.status = SnStatus::InStock;
        self.warehouse_id = Some(warehouse_id);
        self.in_doc_id = Some(doc_id);
        self.in_line_id = Some(line_id);
        self.in_date = Some(date);
    }

    /// Marks the unit sold from `warehouse_id` and starts its warranty.
    ///
    /// `warranty_end` is only written when the product grants a warranty.
    pub fn ship(
        &mut self,
        warehouse_id: WarehouseId,
        doc_id: DocumentId,
        line_id: DocLineId,
        date: NaiveDate,
        warranty_end: Option<NaiveDate>,
    ) {
        self.status = SnStatus::OutStock;
        self.warehouse_id = Some(warehouse_id);
        self.out_doc_id = Some(doc_id);
        self.out_line_id = Some(line_id);
        self.out_date = Some(date);
        self.warranty_start = Some(date);
        if let Some(end) = warranty_end {
            self.warranty_end = Some(end);
        }
    }

    /// Moves an in-stock unit to another warehouse. Inbound and outbound
    /// history is left untouched.
    pub fn relocate(&mut self, warehouse_id: WarehouseId) {
        self.status = SnStatus::InStock;
        self.warehouse_id = Some(warehouse_id);
    }

    /// Applies a posting transition through the matching setter.
    pub fn apply(&mut self, transition: &SnTransition) {
        match *transition {
            SnTransition::Receive {
                warehouse_id,
                doc_id,
                line_id,
                date,
            } => self.receive(warehouse_id, doc_id, line_id, date),
            SnTransition::Ship {
                warehouse_id,
                doc_id,
                line_id,
                date,
                warranty_end,
            } => self.ship(warehouse_id, doc_id, line_id, date, warranty_end),
            SnTransition::Relocate { warehouse_id } => self.relocate(warehouse_id),
        }
    }

    /// Returns true if the unit is on hand at `warehouse_id`.
    #[must_use]
    pub fn is_in_stock_at(&self, warehouse_id: WarehouseId) -> bool {
        self.status == SnStatus::InStock && self.warehouse_id == Some(warehouse_id)
    }
}

/// State change applied to a serial while a document posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnTransition {
    /// Purchase receipt.
    Receive {
        /// Receiving warehouse.
        warehouse_id: WarehouseId,
        /// Receiving document.
        doc_id: DocumentId,
        /// Receiving line.
        line_id: DocLineId,
        /// Business date.
        date: NaiveDate,
    },
    /// Sale.
    Ship {
        /// Issuing warehouse.
        warehouse_id: WarehouseId,
        /// Selling document.
        doc_id: DocumentId,
        /// Selling line.
        line_id: DocLineId,
        /// Business date, also the warranty start.
        date: NaiveDate,
        /// Warranty end, when the product grants one.
        warranty_end: Option<NaiveDate>,
    },
    /// Transfer between warehouses.
    Relocate {
        /// Destination warehouse.
        warehouse_id: WarehouseId,
    },
}

impl SnTransition {
    /// Status the serial ends in.
    #[must_use]
    pub const fn target_status(&self) -> SnStatus {
        match self {
            Self::Receive { .. } | Self::Relocate { .. } => SnStatus::InStock,
            Self::Ship { .. } => SnStatus::OutStock,
        }
    }
}

/// Link between a document line and a serial presented against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocLineSn {
    /// Document owning the line.
    pub doc_id: DocumentId,
    /// Line the serial was presented against.
    pub line_id: DocLineId,
    /// Serial presented.
    pub sn_id: SerialId,
}
