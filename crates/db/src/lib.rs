//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the inventory schema
//! - The transactional posting repository
//! - Repositories for documents, products, serials, and read queries

pub mod entities;
pub mod repositories;

pub use repositories::{InventoryError, InventoryRepository, PostingRepository};

use sea_orm::sea_query::{Expr, Index};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};
use stockledger_core::document::product::MAX_WARRANTY_MONTHS;
use stockledger_shared::DatabaseConfig;
use tracing::info;

use entities::{doc_line_sns, doc_lines, docs, product_sns, products, stock_balances, stock_ledger};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection sized from configuration.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);
    Database::connect(options).await
}

/// Unique line numbers within one document.
pub const DOC_LINE_NO_INDEX: &str = "ux_doc_lines_doc_line_no";
/// Ledger rows by source document.
pub const LEDGER_REF_DOC_INDEX: &str = "ix_ledger_ref_doc";
/// Ledger rows by warehouse, product, and business date.
pub const LEDGER_WH_PROD_DATE_INDEX: &str = "ix_ledger_wh_prod_date";
/// Serial links by document.
pub const DOC_LINE_SN_DOC_INDEX: &str = "ix_doc_line_sns_doc";

/// Creates any missing inventory tables and indexes from the entity definitions.
///
/// Tables are created parents first so foreign keys resolve. Check
/// constraints only land on tables created here; existing tables keep theirs.
///
/// # Errors
///
/// Returns an error if a statement fails.
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut products_table = schema.create_table_from_entity(products::Entity);
    products_table.check(
        Expr::col(products::Column::WarrantyMonths).between(0, i64::from(MAX_WARRANTY_MONTHS)),
    );

    let mut lines_table = schema.create_table_from_entity(doc_lines::Entity);
    lines_table.check(Expr::col(doc_lines::Column::Qty).gt(0));

    let mut balances_table = schema.create_table_from_entity(stock_balances::Entity);
    balances_table.check(Expr::col(stock_balances::Column::QtyOnHand).gte(0));

    let mut ledger_table = schema.create_table_from_entity(stock_ledger::Entity);
    ledger_table
        .check(Expr::col(stock_ledger::Column::InQty).gte(0))
        .check(Expr::col(stock_ledger::Column::OutQty).gte(0));

    let tables = [
        products_table,
        schema.create_table_from_entity(docs::Entity),
        lines_table,
        balances_table,
        ledger_table,
        schema.create_table_from_entity(product_sns::Entity),
        schema.create_table_from_entity(doc_line_sns::Entity),
    ];
    for mut table in tables {
        table.if_not_exists();
        db.execute(backend.build(&table)).await?;
    }

    let indexes = [
        Index::create()
            .name(DOC_LINE_NO_INDEX)
            .table(doc_lines::Entity)
            .col(doc_lines::Column::DocId)
            .col(doc_lines::Column::LineNo)
            .unique()
            .to_owned(),
        Index::create()
            .name(LEDGER_REF_DOC_INDEX)
            .table(stock_ledger::Entity)
            .col(stock_ledger::Column::RefDocId)
            .to_owned(),
        Index::create()
            .name(LEDGER_WH_PROD_DATE_INDEX)
            .table(stock_ledger::Entity)
            .col(stock_ledger::Column::WarehouseId)
            .col(stock_ledger::Column::ProductId)
            .col(stock_ledger::Column::BizDate)
            .to_owned(),
        Index::create()
            .name(DOC_LINE_SN_DOC_INDEX)
            .table(doc_line_sns::Entity)
            .col(doc_line_sns::Column::DocId)
            .to_owned(),
    ];
    for mut index in indexes {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }

    info!("Inventory schema ready");
    Ok(())
}
