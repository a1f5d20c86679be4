//! Inventory repository for documents, products, serials, and read queries.

use std::collections::HashSet;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use stockledger_core::balance::StockBalance;
use stockledger_core::document::{DocLine, Document, DocumentError, Product};
use stockledger_core::ledger::{Discrepancy, StockLedgerEntry, find_discrepancies};
use stockledger_core::serial::{DocLineSn, ProductSn, SerialBook, SerialError, import_serials};
use stockledger_shared::AppError;
use stockledger_shared::types::{DocLineId, DocumentId, ProductId, SerialId, UserId, WarehouseId};
use tracing::info;

use super::convert::{
    balance_from_model, document_active, document_from_model, ledger_from_model, line_active,
    line_from_model, link_active, link_from_model, product_active, product_from_model,
    serial_active, serial_from_model,
};
use crate::entities::{
    doc_line_sns, doc_lines, docs, product_sns, products, stock_balances, stock_ledger,
};

/// Error types for inventory operations.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    /// Document rule violated.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Serial rule violated.
    #[error(transparent)]
    Serial(#[from] SerialError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        let message = err.to_string();
        match err {
            InventoryError::Document(DocumentError::NotFound(_))
            | InventoryError::Serial(
                SerialError::DocumentNotFound(_)
                | SerialError::LineNotFound(_)
                | SerialError::ProductNotFound(_)
                | SerialError::SerialNotFound(_)
                | SerialError::LinkNotFound { .. },
            ) => Self::NotFound(message),
            InventoryError::Document(DocumentError::AlreadyExists(_)) => Self::Conflict(message),
            InventoryError::Document(
                DocumentError::InvalidTransition { .. } | DocumentError::ForeignLine { .. },
            )
            | InventoryError::Serial(_) => Self::BusinessRule(message),
            InventoryError::Document(_) => Self::Validation(message),
            InventoryError::Database(_) => Self::Database(message),
        }
    }
}

/// Repository for inventory master data and read models.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    db: DatabaseConnection,
}

impl InventoryRepository {
    /// Creates a new inventory repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts a product, or updates it when the id exists.
    pub async fn upsert_product(&self, product: &Product) -> Result<(), InventoryError> {
        product.validate()?;
        products::Entity::insert(product_active(product))
            .on_conflict(
                OnConflict::column(products::Column::Id)
                    .update_columns([
                        products::Column::Sku,
                        products::Column::Name,
                        products::Column::TrackSn,
                        products::Column::WarrantyMonths,
                        products::Column::IsActive,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    /// Stores a new document with its lines.
    pub async fn create_document(
        &self,
        document: &Document,
        lines: &[DocLine],
    ) -> Result<DocumentId, InventoryError> {
        let doc_id = document.id;
        DocLine::check_lines(doc_id, lines)?;

        let txn = self.db.begin().await?;

        if docs::Entity::find_by_id(doc_id.into_inner())
            .one(&txn)
            .await?
            .is_some()
        {
            return Err(DocumentError::AlreadyExists(doc_id).into());
        }

        document_active(document).insert(&txn).await?;
        if !lines.is_empty() {
            doc_lines::Entity::insert_many(lines.iter().map(line_active))
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;

        info!(
            document_id = %doc_id,
            doc_no = %document.doc_no,
            lines = lines.len(),
            "Document created"
        );
        Ok(doc_id)
    }

    /// Approves a draft document.
    pub async fn approve_document(
        &self,
        doc_id: DocumentId,
        user: UserId,
    ) -> Result<Document, InventoryError> {
        let txn = self.db.begin().await?;

        let mut document = Self::lock_document(&txn, doc_id)
            .await?
            .ok_or(DocumentError::NotFound(doc_id))?;
        document.approve(user, Utc::now())?;
        document_active(&document).update(&txn).await?;

        txn.commit().await?;
        Ok(document)
    }

    /// Resolves serial codes and links them to a line, all or nothing.
    pub async fn import_serials<S: AsRef<str>>(
        &self,
        doc_id: DocumentId,
        line_id: DocLineId,
        codes: &[S],
    ) -> Result<Vec<ProductSn>, InventoryError> {
        let txn = self.db.begin().await?;

        let document = Self::lock_document(&txn, doc_id)
            .await?
            .ok_or(SerialError::DocumentNotFound(doc_id))?;
        let line = Self::line(&txn, doc_id, line_id).await?;
        let product = products::Entity::find_by_id(line.product_id.into_inner())
            .one(&txn)
            .await?
            .map(product_from_model)
            .ok_or(SerialError::ProductNotFound(line.product_id))?;

        let trimmed: Vec<String> = codes
            .iter()
            .map(|code| code.as_ref().trim().to_string())
            .filter(|code| !code.is_empty())
            .collect();
        let existing: Vec<ProductSn> = if trimmed.is_empty() {
            Vec::new()
        } else {
            product_sns::Entity::find()
                .filter(product_sns::Column::Sn.is_in(trimmed))
                .order_by_asc(product_sns::Column::Id)
                .lock_exclusive()
                .all(&txn)
                .await?
                .into_iter()
                .map(serial_from_model)
                .collect::<Result<_, _>>()?
        };
        let existing_links: Vec<DocLineSn> = doc_line_sns::Entity::find()
            .filter(doc_line_sns::Column::LineId.eq(line_id.into_inner()))
            .all(&txn)
            .await?
            .into_iter()
            .map(link_from_model)
            .collect();

        let known_serials: HashSet<SerialId> = existing.iter().map(|sn| sn.id).collect();
        let known_links: HashSet<SerialId> = existing_links.iter().map(|link| link.sn_id).collect();

        let mut book = SerialBook::from_parts(existing, existing_links);
        let resolved = import_serials(&mut book, &document, &line, &product, codes)?;

        let mut inserted = HashSet::new();
        for sn in &resolved {
            if !known_serials.contains(&sn.id) && inserted.insert(sn.id) {
                serial_active(sn).insert(&txn).await?;
            }
        }
        let new_links: Vec<_> = book
            .links_for_line(line_id)
            .iter()
            .filter(|link| !known_links.contains(&link.sn_id))
            .map(link_active)
            .collect();
        if !new_links.is_empty() {
            doc_line_sns::Entity::insert_many(new_links)
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(resolved)
    }

    /// Removes a serial link from a line of an unposted document.
    pub async fn unlink_serial(
        &self,
        doc_id: DocumentId,
        line_id: DocLineId,
        sn_id: SerialId,
    ) -> Result<(), InventoryError> {
        let txn = self.db.begin().await?;

        let document = Self::lock_document(&txn, doc_id)
            .await?
            .ok_or(SerialError::DocumentNotFound(doc_id))?;
        if !document.status.is_postable() {
            return Err(SerialError::DocumentPosted(doc_id).into());
        }
        Self::line(&txn, doc_id, line_id).await?;

        let deleted = doc_line_sns::Entity::delete_by_id((line_id.into_inner(), sn_id.into_inner()))
            .exec(&txn)
            .await?;
        if deleted.rows_affected == 0 {
            return Err(SerialError::LinkNotFound { line_id, sn_id }.into());
        }

        txn.commit().await?;
        Ok(())
    }

    /// Finds a document header by id.
    pub async fn document(&self, doc_id: DocumentId) -> Result<Option<Document>, InventoryError> {
        docs::Entity::find_by_id(doc_id.into_inner())
            .one(&self.db)
            .await?
            .map(document_from_model)
            .transpose()
            .map_err(Into::into)
    }

    /// Lists a document's lines ordered by line number.
    pub async fn lines(&self, doc_id: DocumentId) -> Result<Vec<DocLine>, InventoryError> {
        Ok(doc_lines::Entity::find()
            .filter(doc_lines::Column::DocId.eq(doc_id.into_inner()))
            .order_by_asc(doc_lines::Column::LineNo)
            .all(&self.db)
            .await?
            .into_iter()
            .map(line_from_model)
            .collect())
    }

    /// Returns the on-hand quantity, zero when no row exists.
    pub async fn qty_on_hand(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
    ) -> Result<Decimal, InventoryError> {
        Ok(
            stock_balances::Entity::find_by_id((
                warehouse_id.into_inner(),
                product_id.into_inner(),
            ))
            .one(&self.db)
            .await?
            .map_or(Decimal::ZERO, |row| row.qty_on_hand),
        )
    }

    /// Lists the ledger rows written for a document in write order.
    pub async fn ledger_for_document(
        &self,
        doc_id: DocumentId,
    ) -> Result<Vec<StockLedgerEntry>, InventoryError> {
        let rows = stock_ledger::Entity::find()
            .filter(stock_ledger::Column::RefDocId.eq(doc_id.into_inner()))
            .order_by_asc(stock_ledger::Column::Id)
            .all(&self.db)
            .await?;
        rows.into_iter()
            .map(|row| ledger_from_model(row).map_err(Into::into))
            .collect()
    }

    /// Finds a serial by its code.
    pub async fn serial_by_code(&self, code: &str) -> Result<Option<ProductSn>, InventoryError> {
        product_sns::Entity::find()
            .filter(product_sns::Column::Sn.eq(code.trim()))
            .one(&self.db)
            .await?
            .map(serial_from_model)
            .transpose()
            .map_err(Into::into)
    }

    /// Compares every stored balance against the ledger.
    pub async fn reconcile(&self) -> Result<Vec<Discrepancy>, InventoryError> {
        let entries = stock_ledger::Entity::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(ledger_from_model)
            .collect::<Result<Vec<_>, _>>()?;
        let balances: Vec<StockBalance> = stock_balances::Entity::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(balance_from_model)
            .collect();
        Ok(find_discrepancies(&entries, balances))
    }

    async fn lock_document(
        txn: &DatabaseTransaction,
        doc_id: DocumentId,
    ) -> Result<Option<Document>, InventoryError> {
        docs::Entity::find_by_id(doc_id.into_inner())
            .lock_exclusive()
            .one(txn)
            .await?
            .map(document_from_model)
            .transpose()
            .map_err(Into::into)
    }

    /// Loads a line and checks that it belongs to `doc_id`.
    async fn line(
        txn: &DatabaseTransaction,
        doc_id: DocumentId,
        line_id: DocLineId,
    ) -> Result<DocLine, InventoryError> {
        let line = doc_lines::Entity::find_by_id(line_id.into_inner())
            .one(txn)
            .await?
            .map(line_from_model)
            .ok_or(SerialError::LineNotFound(line_id))?;
        if line.doc_id != doc_id {
            return Err(SerialError::LineNotInDocument { line_id, doc_id }.into());
        }
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_errors_map_to_app_errors() {
        let doc_id = DocumentId::new();

        let missing = AppError::from(InventoryError::from(DocumentError::NotFound(doc_id)));
        assert_eq!(missing.status_code(), 404);

        let duplicate = AppError::from(InventoryError::from(DocumentError::AlreadyExists(doc_id)));
        assert_eq!(duplicate.error_code(), "CONFLICT");

        let posted = AppError::from(InventoryError::from(SerialError::DocumentPosted(doc_id)));
        assert_eq!(posted.status_code(), 422);

        let blank = AppError::from(InventoryError::from(DocumentError::UnknownStatus(
            "VOIDED".to_string(),
        )));
        assert_eq!(blank.error_code(), "VALIDATION_ERROR");

        let fine = AppError::from(InventoryError::from(DocumentError::QuantityScale(
            Decimal::new(1005, 3),
        )));
        assert_eq!(fine.status_code(), 400);

        let db = AppError::from(InventoryError::from(DbErr::Custom("boom".to_string())));
        assert_eq!(db.status_code(), 500);
    }
}
