//! Transactional context the posting engine reads and writes through.

use chrono::{DateTime, Utc};
use stockledger_shared::types::{DocumentId, ProductId, UserId};

use super::error::PostError;
use crate::balance::BalanceStore;
use crate::document::{DocLine, Document, Product};
use crate::ledger::StockLedger;
use crate::serial::PostingSerials;

/// Everything one posting touches, behind a single atomicity boundary.
///
/// Implementations decide how isolation is achieved (row locks, version
/// checks). Writes made through the unit of work must be discarded when the
/// engine returns an error.
pub trait PostingUnitOfWork: BalanceStore + StockLedger + PostingSerials {
    /// Loads a document header.
    fn document(&self, doc_id: DocumentId) -> Option<Document>;

    /// Loads the lines of a document ordered by line number.
    fn lines(&self, doc_id: DocumentId) -> Vec<DocLine>;

    /// Loads a product.
    fn product(&self, product_id: ProductId) -> Option<Product>;

    /// Stamps the document POSTED and returns the updated header.
    fn mark_posted(
        &mut self,
        doc_id: DocumentId,
        posted_by: UserId,
        posted_at: DateTime<Utc>,
    ) -> Result<Document, PostError>;
}

/// Sorts lines by line number, then id, for deterministic processing.
pub(crate) fn sort_lines(lines: &mut [DocLine]) {
    lines.sort_by_key(|line| (line.line_no, line.id));
}

