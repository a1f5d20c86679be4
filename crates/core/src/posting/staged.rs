//! Buffered unit of work over a loaded snapshot.
//!
//! Storage backends load a [`PostingSnapshot`], run the engine against a
//! [`StagedPosting`], and persist the resulting [`PostingChanges`] only when the
//! engine succeeds. Dropping the staged posting discards every write.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use stockledger_shared::types::{DocLineId, DocumentId, ProductId, SerialId, UserId};

use super::error::PostError;
use super::unit_of_work::{PostingUnitOfWork, sort_lines};
use crate::balance::{BalanceKey, BalanceSheet, BalanceStore, StockBalance};
use crate::document::{DocLine, DocType, Document, Product};
use crate::ledger::{LedgerBook, StockLedger, StockLedgerEntry};
use crate::serial::{
    DocLineSn, PostingSerials, ProductSn, SerialBook, SerialError, SnTransition,
};

/// Rows one posting reads.
#[derive(Debug, Clone)]
pub struct PostingSnapshot {
    /// Document header.
    pub document: Document,
    /// Document lines.
    pub lines: Vec<DocLine>,
    /// Products referenced by the lines.
    pub products: Vec<Product>,
    /// Balance rows the document can touch. Missing keys read as zero.
    pub balances: Vec<StockBalance>,
    /// Serials linked to the document's lines.
    pub serials: Vec<ProductSn>,
    /// Links between the document's lines and serials.
    pub links: Vec<DocLineSn>,
}

impl PostingSnapshot {
    /// Balance keys a document can touch, in lock order.
    ///
    /// Lines whose warehouses cannot be resolved contribute nothing; the engine
    /// rejects them before any balance is read.
    #[must_use]
    pub fn balance_keys(doc: &Document, lines: &[DocLine]) -> BTreeSet<BalanceKey> {
        let mut keys = BTreeSet::new();
        for line in lines {
            let source = doc.source_for(line);
            let destination = doc.destination_for(line);
            let sides = match doc.doc_type {
                DocType::PurchaseIn => [None, destination],
                DocType::SalesOut => [source, None],
                DocType::Transfer => [source, destination],
            };
            keys.extend(
                sides
                    .into_iter()
                    .flatten()
                    .map(|warehouse_id| BalanceKey::new(warehouse_id, line.product_id)),
            );
        }
        keys
    }

    /// Products the lines reference.
    #[must_use]
    pub fn product_ids(lines: &[DocLine]) -> BTreeSet<ProductId> {
        lines.iter().map(|line| line.product_id).collect()
    }
}

/// Writes produced by a successful posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingChanges {
    /// Updated document header.
    pub document: Document,
    /// Final state of every balance row written.
    pub balances: Vec<StockBalance>,
    /// New ledger rows in write order.
    pub ledger_entries: Vec<StockLedgerEntry>,
    /// Final state of every serial written.
    pub serials: Vec<ProductSn>,
}

/// Unit of work that buffers writes in memory.
#[derive(Debug, Clone)]
pub struct StagedPosting {
    document: Document,
    lines: Vec<DocLine>,
    products: HashMap<ProductId, Product>,
    balances: BalanceSheet,
    touched_balances: BTreeSet<BalanceKey>,
    ledger: LedgerBook,
    serials: SerialBook,
    touched_serials: BTreeSet<SerialId>,
}

impl StagedPosting {
    /// Stages a posting over a snapshot.
    #[must_use]
    pub fn new(snapshot: PostingSnapshot) -> Self {
        let mut lines = snapshot.lines;
        sort_lines(&mut lines);
        Self {
            document: snapshot.document,
            lines,
            products: snapshot
                .products
                .into_iter()
                .map(|product| (product.id, product))
                .collect(),
            balances: BalanceSheet::from_rows(snapshot.balances),
            touched_balances: BTreeSet::new(),
            ledger: LedgerBook::new(),
            serials: SerialBook::from_parts(snapshot.serials, snapshot.links),
            touched_serials: BTreeSet::new(),
        }
    }

    /// Consumes the staged posting and returns its writes.
    #[must_use]
    pub fn into_changes(self) -> PostingChanges {
        let balances = self
            .touched_balances
            .iter()
            .filter_map(|key| self.balances.row(*key))
            .collect();
        let serials = self
            .touched_serials
            .iter()
            .filter_map(|id| self.serials.get(*id).cloned())
            .collect();
        PostingChanges {
            document: self.document,
            balances,
            ledger_entries: self.ledger.entries().to_vec(),
            serials,
        }
    }
}

impl BalanceStore for StagedPosting {
    fn qty_on_hand(&self, key: BalanceKey) -> Decimal {
        self.balances.qty_on_hand(key)
    }

    fn adjust(&mut self, key: BalanceKey, delta: Decimal) -> Decimal {
        self.touched_balances.insert(key);
        self.balances.adjust(key, delta)
    }
}

impl StockLedger for StagedPosting {
    fn append(&mut self, entry: StockLedgerEntry) {
        self.ledger.append(entry);
    }
}

impl PostingSerials for StagedPosting {
    fn serials_for_line(&self, line_id: DocLineId) -> Vec<ProductSn> {
        self.serials.serials_for_line(line_id)
    }

    fn transition_for_posting(
        &mut self,
        sn_id: SerialId,
        transition: &SnTransition,
    ) -> Result<ProductSn, SerialError> {
        let sn = self.serials.transition_for_posting(sn_id, transition)?;
        self.touched_serials.insert(sn_id);
        Ok(sn)
    }
}

impl PostingUnitOfWork for StagedPosting {
    fn document(&self, doc_id: DocumentId) -> Option<Document> {
        (self.document.id == doc_id).then(|| self.document.clone())
    }

    fn lines(&self, doc_id: DocumentId) -> Vec<DocLine> {
        self.lines
            .iter()
            .filter(|line| line.doc_id == doc_id)
            .cloned()
            .collect()
    }

    fn product(&self, product_id: ProductId) -> Option<Product> {
        self.products.get(&product_id).cloned()
    }

    fn mark_posted(
        &mut self,
        doc_id: DocumentId,
        posted_by: UserId,
        posted_at: DateTime<Utc>,
    ) -> Result<Document, PostError> {
        if self.document.id != doc_id {
            return Err(PostError::DocumentNotFound(doc_id));
        }
        self.document.mark_posted(posted_by, posted_at);
        Ok(self.document.clone())
    }
}
