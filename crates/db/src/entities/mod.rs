//! `SeaORM` entities for the inventory schema.

pub mod doc_line_sns;
pub mod doc_lines;
pub mod docs;
pub mod product_sns;
pub mod products;
pub mod stock_balances;
pub mod stock_ledger;
