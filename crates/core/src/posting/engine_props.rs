//! Property-based tests for the posting engine.

use proptest::prelude::*;
use rust_decimal::Decimal;
use stockledger_shared::types::{ProductId, WarehouseId};

use super::tests::{World, biz_date};
use crate::balance::BalanceKey;
use crate::ledger::{derive_balances, find_discrepancies};

#[derive(Debug, Clone, Copy)]
enum Op {
    Purchase { to: usize, product: usize, qty: i64 },
    Sale { from: usize, product: usize, qty: i64 },
    Transfer { from: usize, to: usize, product: usize, qty: i64 },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..3usize, 0..2usize, 1..20i64).prop_map(|(to, product, qty)| Op::Purchase {
            to,
            product,
            qty
        }),
        (0..3usize, 0..2usize, 1..20i64).prop_map(|(from, product, qty)| Op::Sale {
            from,
            product,
            qty
        }),
        (0..3usize, 0..3usize, 0..2usize, 1..20i64).prop_map(|(from, to, product, qty)| {
            Op::Transfer {
                from,
                to,
                product,
                qty,
            }
        }),
    ]
}

struct Fixture {
    world: World,
    warehouses: [WarehouseId; 3],
    products: [ProductId; 2],
}

impl Fixture {
    fn new() -> Self {
        let mut world = World::new();
        let products = [world.stocked(), world.stocked()];
        Self {
            world,
            warehouses: [WarehouseId::new(), WarehouseId::new(), WarehouseId::new()],
            products,
        }
    }

    fn document_for(&mut self, op: Op) -> stockledger_shared::types::DocumentId {
        let (doc, _) = match op {
            Op::Purchase { to, product, qty } => self.world.purchase(
                self.warehouses[to],
                self.products[product],
                Decimal::from(qty),
                biz_date(),
            ),
            Op::Sale { from, product, qty } => self.world.sale(
                self.warehouses[from],
                self.products[product],
                Decimal::from(qty),
                biz_date(),
            ),
            Op::Transfer {
                from,
                to,
                product,
                qty,
            } => self.world.transfer(
                self.warehouses[from],
                self.warehouses[to],
                self.products[product],
                Decimal::from(qty),
            ),
        };
        doc
    }

    fn total(&self, product: ProductId) -> Decimal {
        self.warehouses
            .iter()
            .map(|wh| self.world.qty(*wh, product))
            .sum()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Balances always equal the signed ledger sum and never go negative.
    #[test]
    fn prop_balances_match_ledger(ops in prop::collection::vec(arb_op(), 1..40)) {
        let mut fx = Fixture::new();

        for op in ops {
            let doc = fx.document_for(op);
            let _ = fx.world.post(doc);

            prop_assert!(
                find_discrepancies(fx.world.ledger.entries(), fx.world.balances.rows()).is_empty()
            );
            for row in fx.world.balances.rows() {
                prop_assert!(row.qty_on_hand >= Decimal::ZERO);
            }
        }

        let derived = derive_balances(fx.world.ledger.entries());
        for wh in fx.warehouses {
            for product in fx.products {
                let key = BalanceKey::new(wh, product);
                let expected = derived.get(&key).copied().unwrap_or(Decimal::ZERO);
                prop_assert_eq!(fx.world.qty(wh, product), expected);
            }
        }
    }

    /// A failed posting changes nothing; a successful one can be repeated
    /// without effect.
    #[test]
    fn prop_failure_is_atomic_and_repost_is_noop(ops in prop::collection::vec(arb_op(), 1..40)) {
        let mut fx = Fixture::new();

        for op in ops {
            let doc = fx.document_for(op);
            let before = fx.world.fingerprint();

            match fx.world.post(doc) {
                Ok(outcome) => {
                    prop_assert!(!outcome.already_posted);
                    let after = fx.world.fingerprint();
                    let again = fx.world.post(doc).unwrap();
                    prop_assert!(again.already_posted);
                    prop_assert_eq!(again.ledger_entries_written, 0);
                    prop_assert_eq!(fx.world.fingerprint(), after);
                }
                Err(_) => prop_assert_eq!(fx.world.fingerprint(), before),
            }
        }
    }

    /// Transfers never change a product's total across warehouses.
    #[test]
    fn prop_transfer_conserves_total(
        seed in 1..50i64,
        moves in prop::collection::vec((0..3usize, 0..3usize, 1..20i64), 1..20),
    ) {
        let mut fx = Fixture::new();
        let product = fx.products[0];
        let seed_doc = fx.document_for(Op::Purchase { to: 0, product: 0, qty: seed });
        fx.world.post(seed_doc).unwrap();
        let total = fx.total(product);

        for (from, to, qty) in moves {
            let doc = fx.document_for(Op::Transfer { from, to, product: 0, qty });
            let rows_before = fx.world.ledger.len();
            if let Ok(outcome) = fx.world.post(doc) {
                prop_assert_eq!(outcome.ledger_entries_written, 2);
                prop_assert_eq!(fx.world.ledger.len(), rows_before + 2);
            }
            prop_assert_eq!(fx.total(product), total);
        }
    }
}
