//! Posting repository: runs the posting engine inside a database transaction.
//!
//! Isolation comes from row locks taken in a fixed order: the document row,
//! then linked serial rows by id, then balance rows by (warehouse, product).
//! Postings that share rows therefore serialize without deadlocking, while
//! postings over disjoint rows proceed in parallel.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use stockledger_core::balance::{BalanceKey, StockBalance};
use stockledger_core::document::{DocLine, Document, DocumentError, Product};
use stockledger_core::posting::{
    PostError, PostingChanges, PostingEngine, PostingOutcome, PostingSnapshot, StagedPosting,
};
use stockledger_core::serial::{DocLineSn, ProductSn};
use stockledger_shared::types::{DocumentId, ProductId, UserId};
use tracing::{debug, info};

use super::convert::{
    balance_active, balance_from_model, document_active, document_from_model, ledger_active,
    line_from_model, link_from_model, product_from_model, serial_active, serial_from_model,
};
use crate::entities::{
    doc_line_sns, doc_lines, docs, product_sns, products, stock_balances, stock_ledger,
};

fn storage(err: DbErr) -> PostError {
    PostError::Storage(err.to_string())
}

fn from_document_error(err: DocumentError) -> PostError {
    match err {
        DocumentError::UnknownStatus(status) => PostError::DocumentStatusNotPostable { status },
        other => PostError::Storage(other.to_string()),
    }
}

/// Repository that posts documents against PostgreSQL.
#[derive(Debug, Clone)]
pub struct PostingRepository {
    db: DatabaseConnection,
}

impl PostingRepository {
    /// Creates a new posting repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Posts a document in one transaction.
    ///
    /// Reposting a POSTED document is a no-op that reports `already_posted`.
    /// Any error rolls the transaction back, leaving every row untouched.
    pub async fn post_document(
        &self,
        doc_id: DocumentId,
        posted_by: UserId,
    ) -> Result<PostingOutcome, PostError> {
        let txn = self.db.begin().await.map_err(storage)?;

        let snapshot = match Self::lock_snapshot(&txn, doc_id).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                txn.rollback().await.map_err(storage)?;
                return Err(err);
            }
        };

        let mut staged = StagedPosting::new(snapshot);
        let outcome = match PostingEngine::post(&mut staged, doc_id, posted_by, Utc::now()) {
            Ok(outcome) => outcome,
            Err(err) => {
                txn.rollback().await.map_err(storage)?;
                debug!(document_id = %doc_id, error = %err, "Posting rolled back");
                return Err(err);
            }
        };

        if outcome.already_posted {
            txn.rollback().await.map_err(storage)?;
            return Ok(outcome);
        }

        Self::write_changes(&txn, staged.into_changes())
            .await
            .map_err(storage)?;
        txn.commit().await.map_err(storage)?;

        info!(
            document_id = %doc_id,
            ledger_entries = outcome.ledger_entries_written,
            "Posting committed"
        );

        Ok(outcome)
    }

    /// Locks and loads every row the posting reads.
    async fn lock_snapshot(
        txn: &DatabaseTransaction,
        doc_id: DocumentId,
    ) -> Result<PostingSnapshot, PostError> {
        let document = docs::Entity::find_by_id(doc_id.into_inner())
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(storage)?
            .ok_or(PostError::DocumentNotFound(doc_id))?;
        let document = document_from_model(document).map_err(from_document_error)?;

        if !document.status.is_postable() {
            return Ok(PostingSnapshot {
                document,
                lines: Vec::new(),
                products: Vec::new(),
                balances: Vec::new(),
                serials: Vec::new(),
                links: Vec::new(),
            });
        }

        let lines = Self::load_lines(txn, doc_id).await.map_err(storage)?;
        let products = Self::load_products(txn, &lines).await.map_err(storage)?;
        let links: Vec<DocLineSn> = doc_line_sns::Entity::find()
            .filter(doc_line_sns::Column::DocId.eq(doc_id.into_inner()))
            .all(txn)
            .await
            .map_err(storage)?
            .into_iter()
            .map(link_from_model)
            .collect();
        let serials = Self::lock_serials(txn, &links).await.map_err(storage)?;
        let balances = Self::lock_balances(txn, &document, &lines)
            .await
            .map_err(storage)?;

        Ok(PostingSnapshot {
            document,
            lines,
            products,
            balances,
            serials,
            links,
        })
    }

    async fn load_lines(
        txn: &DatabaseTransaction,
        doc_id: DocumentId,
    ) -> Result<Vec<DocLine>, DbErr> {
        Ok(doc_lines::Entity::find()
            .filter(doc_lines::Column::DocId.eq(doc_id.into_inner()))
            .order_by_asc(doc_lines::Column::LineNo)
            .order_by_asc(doc_lines::Column::Id)
            .all(txn)
            .await?
            .into_iter()
            .map(line_from_model)
            .collect())
    }

    async fn load_products(
        txn: &DatabaseTransaction,
        lines: &[DocLine],
    ) -> Result<Vec<Product>, DbErr> {
        let ids: Vec<uuid::Uuid> = PostingSnapshot::product_ids(lines)
            .into_iter()
            .map(ProductId::into_inner)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(products::Entity::find()
            .filter(products::Column::Id.is_in(ids))
            .all(txn)
            .await?
            .into_iter()
            .map(product_from_model)
            .collect())
    }

    async fn lock_serials(
        txn: &DatabaseTransaction,
        links: &[DocLineSn],
    ) -> Result<Vec<ProductSn>, DbErr> {
        let mut ids: Vec<uuid::Uuid> = links.iter().map(|link| link.sn_id.into_inner()).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        product_sns::Entity::find()
            .filter(product_sns::Column::Id.is_in(ids))
            .order_by_asc(product_sns::Column::Id)
            .lock_exclusive()
            .all(txn)
            .await?
            .into_iter()
            .map(serial_from_model)
            .collect()
    }

    /// Creates missing balance rows at zero and locks every touched row in key order.
    async fn lock_balances(
        txn: &DatabaseTransaction,
        document: &Document,
        lines: &[DocLine],
    ) -> Result<Vec<StockBalance>, DbErr> {
        let keys = PostingSnapshot::balance_keys(document, lines);
        let mut rows = Vec::with_capacity(keys.len());

        for key in keys {
            Self::ensure_balance_row(txn, key).await?;
            let row = stock_balances::Entity::find_by_id((
                key.warehouse_id.into_inner(),
                key.product_id.into_inner(),
            ))
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or_else(|| {
                DbErr::RecordNotFound(format!(
                    "stock balance {}/{}",
                    key.warehouse_id, key.product_id
                ))
            })?;
            rows.push(balance_from_model(row));
        }

        Ok(rows)
    }

    async fn ensure_balance_row(txn: &DatabaseTransaction, key: BalanceKey) -> Result<(), DbErr> {
        let zero = balance_active(&StockBalance::empty(key));
        stock_balances::Entity::insert(zero)
            .on_conflict(
                OnConflict::columns([
                    stock_balances::Column::WarehouseId,
                    stock_balances::Column::ProductId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(txn)
            .await?;
        Ok(())
    }

    async fn write_changes(txn: &DatabaseTransaction, changes: PostingChanges) -> Result<(), DbErr> {
        document_active(&changes.document).update(txn).await?;

        for row in &changes.balances {
            balance_active(row).update(txn).await?;
        }

        if !changes.ledger_entries.is_empty() {
            stock_ledger::Entity::insert_many(changes.ledger_entries.iter().map(ledger_active))
                .exec_without_returning(txn)
                .await?;
        }

        for sn in &changes.serials {
            serial_active(sn).update(txn).await?;
        }

        Ok(())
    }
}
