//! Ledger append contract and the in-memory journal.

use stockledger_shared::types::DocumentId;

use super::entry::StockLedgerEntry;

/// Append-only journal of stock movements.
///
/// The trait exposes no update or delete: rows are the audit trail balances
/// are derived from.
pub trait StockLedger {
    /// Appends one entry.
    fn append(&mut self, entry: StockLedgerEntry);
}

/// In-memory journal.
#[derive(Debug, Clone, Default)]
pub struct LedgerBook {
    entries: Vec<StockLedgerEntry>,
}

impl LedgerBook {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all entries in append order.
    #[must_use]
    pub fn entries(&self) -> &[StockLedgerEntry] {
        &self.entries
    }

    /// Returns the entries written for one document.
    pub fn for_document(&self, doc_id: DocumentId) -> impl Iterator<Item = &StockLedgerEntry> {
        self.entries.iter().filter(move |e| e.ref_doc_id == doc_id)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was journaled yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StockLedger for LedgerBook {
    fn append(&mut self, entry: StockLedgerEntry) {
        self.entries.push(entry);
    }
}

impl Extend<StockLedgerEntry> for LedgerBook {
    fn extend<T: IntoIterator<Item = StockLedgerEntry>>(&mut self, iter: T) {
        self.entries.extend(iter);
    }
}
