//! Balance store contract and the map-backed implementation.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stockledger_shared::types::{ProductId, WarehouseId};

/// Natural key of a balance row.
///
/// Ordered by warehouse then product so that loaders lock rows in a stable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BalanceKey {
    /// Warehouse holding the stock.
    pub warehouse_id: WarehouseId,
    /// Product held.
    pub product_id: ProductId,
}

impl BalanceKey {
    /// Creates a balance key.
    #[must_use]
    pub const fn new(warehouse_id: WarehouseId, product_id: ProductId) -> Self {
        Self {
            warehouse_id,
            product_id,
        }
    }
}

/// On-hand quantity of one product in one warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBalance {
    /// Warehouse holding the stock.
    pub warehouse_id: WarehouseId,
    /// Product held.
    pub product_id: ProductId,
    /// Running on-hand quantity.
    pub qty_on_hand: Decimal,
}

impl StockBalance {
    /// A zero row for `key`.
    #[must_use]
    pub const fn empty(key: BalanceKey) -> Self {
        Self {
            warehouse_id: key.warehouse_id,
            product_id: key.product_id,
            qty_on_hand: Decimal::ZERO,
        }
    }

    /// Returns the natural key of this row.
    #[must_use]
    pub const fn key(&self) -> BalanceKey {
        BalanceKey::new(self.warehouse_id, self.product_id)
    }
}

/// Keyed aggregate of on-hand quantities.
///
/// The store does not guard against negative results; the posting engine
/// validates sufficiency before it adjusts.
pub trait BalanceStore {
    /// Returns the on-hand quantity, zero for unknown pairs.
    fn qty_on_hand(&self, key: BalanceKey) -> Decimal;

    /// Adds `delta` (positive or negative), creating the row on first touch.
    /// Returns the new on-hand quantity.
    fn adjust(&mut self, key: BalanceKey, delta: Decimal) -> Decimal;
}

/// Map-backed balance store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceSheet {
    rows: BTreeMap<BalanceKey, Decimal>,
}

impl BalanceSheet {
    /// Creates an empty sheet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a sheet from existing rows.
    pub fn from_rows(rows: impl IntoIterator<Item = StockBalance>) -> Self {
        Self {
            rows: rows.into_iter().map(|row| (row.key(), row.qty_on_hand)).collect(),
        }
    }

    /// Returns the stored row for a key, if one was ever created.
    #[must_use]
    pub fn row(&self, key: BalanceKey) -> Option<StockBalance> {
        self.rows.get(&key).map(|qty| StockBalance {
            warehouse_id: key.warehouse_id,
            product_id: key.product_id,
            qty_on_hand: *qty,
        })
    }

    /// Overwrites a row with a known final quantity.
    pub fn put(&mut self, row: StockBalance) {
        self.rows.insert(row.key(), row.qty_on_hand);
    }

    /// Iterates over all stored rows in key order.
    pub fn rows(&self) -> impl Iterator<Item = StockBalance> + '_ {
        self.rows.iter().map(|(key, qty)| StockBalance {
            warehouse_id: key.warehouse_id,
            product_id: key.product_id,
            qty_on_hand: *qty,
        })
    }
}

impl BalanceStore for BalanceSheet {
    fn qty_on_hand(&self, key: BalanceKey) -> Decimal {
        self.rows.get(&key).copied().unwrap_or(Decimal::ZERO)
    }

    fn adjust(&mut self, key: BalanceKey, delta: Decimal) -> Decimal {
        let qty = self.rows.entry(key).or_insert(Decimal::ZERO);
        *qty += delta;
        *qty
    }
}
