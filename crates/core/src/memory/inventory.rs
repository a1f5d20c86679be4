//! Thread-safe in-memory inventory with optimistic posting.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rust_decimal::Decimal;
use stockledger_shared::PostingConfig;
use stockledger_shared::types::{
    DocLineId, DocumentId, ProductId, SerialId, UserId, WarehouseId,
};
use tracing::{debug, warn};

use crate::balance::{BalanceKey, BalanceSheet, BalanceStore};
use crate::document::{DocLine, Document, DocumentError, Product};
use crate::ledger::{Discrepancy, LedgerBook, StockLedgerEntry, find_discrepancies};
use crate::posting::{
    PostError, PostingChanges, PostingEngine, PostingOutcome, PostingSnapshot, StagedPosting,
};
use crate::serial::{ProductSn, SerialBook, SerialError, SerialRegistry, import_serials};

/// Row versions bumped on every committed write.
#[derive(Debug, Default)]
struct Versions {
    documents: HashMap<DocumentId, u64>,
    balances: HashMap<BalanceKey, u64>,
    serials: HashMap<SerialId, u64>,
}

impl Versions {
    fn document(&self, id: DocumentId) -> u64 {
        self.documents.get(&id).copied().unwrap_or_default()
    }

    fn balance(&self, key: BalanceKey) -> u64 {
        self.balances.get(&key).copied().unwrap_or_default()
    }

    fn serial(&self, id: SerialId) -> u64 {
        self.serials.get(&id).copied().unwrap_or_default()
    }

    fn bump_document(&mut self, id: DocumentId) {
        *self.documents.entry(id).or_default() += 1;
    }
}

/// Versions observed while taking a posting snapshot.
#[derive(Debug)]
struct ReadSet {
    document: (DocumentId, u64),
    balances: Vec<(BalanceKey, u64)>,
    serials: Vec<(SerialId, u64)>,
}

#[derive(Debug, Default)]
struct State {
    documents: HashMap<DocumentId, Document>,
    lines: HashMap<DocumentId, Vec<DocLine>>,
    products: HashMap<ProductId, Product>,
    balances: BalanceSheet,
    ledger: LedgerBook,
    serials: SerialBook,
    versions: Versions,
}

impl State {
    fn snapshot(&self, doc_id: DocumentId) -> Result<(PostingSnapshot, ReadSet), PostError> {
        let document = self
            .documents
            .get(&doc_id)
            .cloned()
            .ok_or(PostError::DocumentNotFound(doc_id))?;
        let lines = self.lines.get(&doc_id).cloned().unwrap_or_default();

        let products = PostingSnapshot::product_ids(&lines)
            .into_iter()
            .filter_map(|id| self.products.get(&id).cloned())
            .collect();

        let keys = PostingSnapshot::balance_keys(&document, &lines);
        let balances = keys.iter().filter_map(|key| self.balances.row(*key)).collect();

        let links = self.serials.links_for_document(doc_id);
        let serials: Vec<ProductSn> = links
            .iter()
            .filter_map(|link| self.serials.get(link.sn_id).cloned())
            .collect();

        let read = ReadSet {
            document: (doc_id, self.versions.document(doc_id)),
            balances: keys
                .iter()
                .map(|key| (*key, self.versions.balance(*key)))
                .collect(),
            serials: serials
                .iter()
                .map(|sn| (sn.id, self.versions.serial(sn.id)))
                .collect(),
        };

        Ok((
            PostingSnapshot {
                document,
                lines,
                products,
                balances,
                serials,
                links,
            },
            read,
        ))
    }

    fn is_current(&self, read: &ReadSet) -> bool {
        let (doc_id, doc_version) = read.document;
        self.versions.document(doc_id) == doc_version
            && read
                .balances
                .iter()
                .all(|(key, version)| self.versions.balance(*key) == *version)
            && read
                .serials
                .iter()
                .all(|(id, version)| self.versions.serial(*id) == *version)
    }

    fn apply(&mut self, changes: PostingChanges) {
        let doc_id = changes.document.id;
        self.documents.insert(doc_id, changes.document);
        self.versions.bump_document(doc_id);

        for row in changes.balances {
            *self.versions.balances.entry(row.key()).or_default() += 1;
            self.balances.put(row);
        }

        self.ledger.extend(changes.ledger_entries);

        for sn in changes.serials {
            *self.versions.serials.entry(sn.id).or_default() += 1;
            self.serials.insert(sn);
        }
    }

    /// Finds a line and checks that it belongs to `doc_id`.
    fn line(&self, doc_id: DocumentId, line_id: DocLineId) -> Result<DocLine, SerialError> {
        if let Some(line) = self
            .lines
            .get(&doc_id)
            .and_then(|lines| lines.iter().find(|line| line.id == line_id))
        {
            return Ok(line.clone());
        }
        let elsewhere = self
            .lines
            .values()
            .flatten()
            .any(|line| line.id == line_id);
        if elsewhere {
            Err(SerialError::LineNotInDocument { line_id, doc_id })
        } else {
            Err(SerialError::LineNotFound(line_id))
        }
    }
}

/// Inventory kept entirely in memory.
///
/// Postings snapshot the rows they read together with their versions, run the
/// engine without holding the lock, and commit only if none of those rows
/// changed in the meantime. A losing posting is retried from a fresh
/// snapshot up to [`PostingConfig::max_attempts`] times.
#[derive(Debug, Default)]
pub struct InMemoryInventory {
    config: PostingConfig,
    state: Mutex<State>,
}

impl InMemoryInventory {
    /// Creates an empty inventory.
    #[must_use]
    pub fn new(config: PostingConfig) -> Self {
        Self {
            config,
            state: Mutex::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or replaces a product after checking its master data.
    pub fn upsert_product(&self, product: Product) -> Result<(), DocumentError> {
        product.validate()?;
        self.lock().products.insert(product.id, product);
        Ok(())
    }

    /// Stores a new document with its lines.
    pub fn create_document(
        &self,
        document: Document,
        lines: Vec<DocLine>,
    ) -> Result<DocumentId, DocumentError> {
        let doc_id = document.id;
        DocLine::check_lines(doc_id, &lines)?;

        let mut state = self.lock();
        if state.documents.contains_key(&doc_id) {
            return Err(DocumentError::AlreadyExists(doc_id));
        }
        state.documents.insert(doc_id, document);
        state.lines.insert(doc_id, lines);
        Ok(doc_id)
    }

    /// Approves a draft document.
    pub fn approve_document(
        &self,
        doc_id: DocumentId,
        user: UserId,
    ) -> Result<Document, DocumentError> {
        let mut state = self.lock();
        let document = state
            .documents
            .get_mut(&doc_id)
            .ok_or(DocumentError::NotFound(doc_id))?;
        document.approve(user, Utc::now())?;
        let approved = document.clone();
        state.versions.bump_document(doc_id);
        Ok(approved)
    }

    /// Resolves serial codes and links them to a line, all or nothing.
    pub fn import_serials<S: AsRef<str>>(
        &self,
        doc_id: DocumentId,
        line_id: DocLineId,
        codes: &[S],
    ) -> Result<Vec<ProductSn>, SerialError> {
        let mut state = self.lock();
        let document = state
            .documents
            .get(&doc_id)
            .cloned()
            .ok_or(SerialError::DocumentNotFound(doc_id))?;
        let line = state.line(doc_id, line_id)?;
        let product = state
            .products
            .get(&line.product_id)
            .cloned()
            .ok_or(SerialError::ProductNotFound(line.product_id))?;

        let mut staged = state.serials.slice_for_import(line_id, codes);
        let serials = import_serials(&mut staged, &document, &line, &product, codes)?;
        state.serials.merge(staged);
        state.versions.bump_document(doc_id);
        Ok(serials)
    }

    /// Resolves and links a single scanned code.
    pub fn scan_serial(
        &self,
        doc_id: DocumentId,
        line_id: DocLineId,
        code: &str,
    ) -> Result<ProductSn, SerialError> {
        self.import_serials(doc_id, line_id, &[code])?
            .into_iter()
            .next()
            .ok_or(SerialError::NoSerials)
    }

    /// Removes a serial link from a line of an unposted document.
    pub fn unlink_serial(
        &self,
        doc_id: DocumentId,
        line_id: DocLineId,
        sn_id: SerialId,
    ) -> Result<(), SerialError> {
        let mut state = self.lock();
        let document = state
            .documents
            .get(&doc_id)
            .ok_or(SerialError::DocumentNotFound(doc_id))?;
        if !document.status.is_postable() {
            return Err(SerialError::DocumentPosted(doc_id));
        }
        state.line(doc_id, line_id)?;
        if !state.serials.unlink(line_id, sn_id) {
            return Err(SerialError::LinkNotFound { line_id, sn_id });
        }
        state.versions.bump_document(doc_id);
        Ok(())
    }

    /// Posts a document, retrying on concurrent modification.
    pub fn post_document(
        &self,
        doc_id: DocumentId,
        user: UserId,
    ) -> Result<PostingOutcome, PostError> {
        let attempts = self.config.max_attempts.max(1);

        for attempt in 1..=attempts {
            let (snapshot, read) = self.lock().snapshot(doc_id)?;

            let mut staged = StagedPosting::new(snapshot);
            let outcome = PostingEngine::post(&mut staged, doc_id, user, Utc::now())?;
            if outcome.already_posted {
                return Ok(outcome);
            }

            let mut state = self.lock();
            if state.is_current(&read) {
                state.apply(staged.into_changes());
                debug!(document_id = %doc_id, attempt, "Posting committed");
                return Ok(outcome);
            }
            drop(state);

            warn!(document_id = %doc_id, attempt, "Posting lost a concurrent update, retrying");
        }

        Err(PostError::ConcurrentModification { attempts })
    }

    /// Returns a document header.
    #[must_use]
    pub fn document(&self, doc_id: DocumentId) -> Option<Document> {
        self.lock().documents.get(&doc_id).cloned()
    }

    /// Returns the lines of a document.
    #[must_use]
    pub fn lines(&self, doc_id: DocumentId) -> Vec<DocLine> {
        self.lock().lines.get(&doc_id).cloned().unwrap_or_default()
    }

    /// Returns the on-hand quantity, zero for unknown pairs.
    #[must_use]
    pub fn qty_on_hand(&self, warehouse_id: WarehouseId, product_id: ProductId) -> Decimal {
        self.lock()
            .balances
            .qty_on_hand(BalanceKey::new(warehouse_id, product_id))
    }

    /// Returns every ledger row in write order.
    #[must_use]
    pub fn ledger_entries(&self) -> Vec<StockLedgerEntry> {
        self.lock().ledger.entries().to_vec()
    }

    /// Returns a serial by id.
    #[must_use]
    pub fn serial(&self, sn_id: SerialId) -> Option<ProductSn> {
        self.lock().serials.get(sn_id).cloned()
    }

    /// Returns a serial by code.
    #[must_use]
    pub fn serial_by_code(&self, code: &str) -> Option<ProductSn> {
        self.lock().serials.by_code(code).cloned()
    }

    /// Compares stored balances against the ledger.
    #[must_use]
    pub fn reconcile(&self) -> Vec<Discrepancy> {
        let state = self.lock();
        find_discrepancies(state.ledger.entries(), state.balances.rows())
    }
}
