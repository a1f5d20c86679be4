//! Ledger-to-balance reconciliation checks.
//!
//! These functions only report. Repairing a discrepancy is an operator decision.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::Serialize;

use super::entry::StockLedgerEntry;
use crate::balance::{BalanceKey, StockBalance};

/// A balance row that disagrees with its ledger history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    /// The disagreeing row.
    pub key: BalanceKey,
    /// Quantity stored on the balance row (zero when absent).
    pub stored: Decimal,
    /// Signed sum of the ledger rows.
    pub derived: Decimal,
}

/// Sums `in_qty - out_qty` per (warehouse, product).
pub fn derive_balances<'a>(
    entries: impl IntoIterator<Item = &'a StockLedgerEntry>,
) -> BTreeMap<BalanceKey, Decimal> {
    let mut derived = BTreeMap::new();
    for entry in entries {
        *derived.entry(entry.balance_key()).or_insert(Decimal::ZERO) += entry.signed_qty();
    }
    derived
}

/// Compares stored balances against the ledger and returns every mismatch.
pub fn find_discrepancies<'a>(
    entries: impl IntoIterator<Item = &'a StockLedgerEntry>,
    balances: impl IntoIterator<Item = StockBalance>,
) -> Vec<Discrepancy> {
    let derived = derive_balances(entries);
    let stored: BTreeMap<BalanceKey, Decimal> = balances
        .into_iter()
        .map(|row| (row.key(), row.qty_on_hand))
        .collect();

    let keys: BTreeSet<BalanceKey> = derived.keys().chain(stored.keys()).copied().collect();
    keys.into_iter()
        .filter_map(|key| {
            let stored = stored.get(&key).copied().unwrap_or(Decimal::ZERO);
            let derived = derived.get(&key).copied().unwrap_or(Decimal::ZERO);
            (stored != derived).then_some(Discrepancy {
                key,
                stored,
                derived,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use stockledger_shared::types::{ProductId, UserId, WarehouseId};

    use crate::document::{DocLine, DocType, Document};

    fn entries(wh: WarehouseId, product: ProductId) -> Vec<StockLedgerEntry> {
        let doc = Document::draft(
            DocType::PurchaseIn,
            "PI-1",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            UserId::new(),
        );
        let receive = DocLine::new(doc.id, 1, product, dec!(10)).unwrap();
        let issue = DocLine::new(doc.id, 2, product, dec!(3.5)).unwrap();
        vec![
            StockLedgerEntry::inbound(&doc, &receive, wh, Utc::now()),
            StockLedgerEntry::outbound(&doc, &issue, wh, Utc::now()),
        ]
    }

    #[test]
    fn test_derive_balances_signed_sum() {
        let wh = WarehouseId::new();
        let product = ProductId::new();
        let derived = derive_balances(&entries(wh, product));

        assert_eq!(derived[&BalanceKey::new(wh, product)], dec!(6.5));
    }

    #[test]
    fn test_no_discrepancy_when_consistent() {
        let wh = WarehouseId::new();
        let product = ProductId::new();
        let rows = [StockBalance {
            warehouse_id: wh,
            product_id: product,
            qty_on_hand: dec!(6.5),
        }];

        assert!(find_discrepancies(&entries(wh, product), rows).is_empty());
    }

    #[test]
    fn test_discrepancy_reported_both_ways() {
        let wh = WarehouseId::new();
        let product = ProductId::new();
        let orphan = BalanceKey::new(WarehouseId::new(), product);
        let rows = [
            StockBalance {
                warehouse_id: wh,
                product_id: product,
                qty_on_hand: dec!(7),
            },
            StockBalance {
                warehouse_id: orphan.warehouse_id,
                product_id: orphan.product_id,
                qty_on_hand: dec!(1),
            },
        ];

        let found = find_discrepancies(&entries(wh, product), rows);

        assert_eq!(found.len(), 2);
        assert!(found.contains(&Discrepancy {
            key: BalanceKey::new(wh, product),
            stored: dec!(7),
            derived: dec!(6.5),
        }));
        assert!(found.contains(&Discrepancy {
            key: orphan,
            stored: dec!(1),
            derived: Decimal::ZERO,
        }));
    }
}
