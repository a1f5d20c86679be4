//! Serial registry contracts and the in-memory registry.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use stockledger_shared::types::{DocLineId, DocumentId, ProductId, SerialId};

use super::error::SerialError;
use super::types::{DocLineSn, ProductSn, SnTransition};

/// The part of the serial registry the posting engine uses.
pub trait PostingSerials {
    /// Serials linked to a line, ordered by serial id.
    fn serials_for_line(&self, line_id: DocLineId) -> Vec<ProductSn>;

    /// Applies a posting transition to one serial.
    ///
    /// Only the posting engine calls this, inside its apply phase.
    fn transition_for_posting(
        &mut self,
        sn_id: SerialId,
        transition: &SnTransition,
    ) -> Result<ProductSn, SerialError>;
}

/// Full serial registry contract used by the surrounding application.
pub trait SerialRegistry: PostingSerials {
    /// Fetches a serial by code, creating it LOCKED when unseen.
    ///
    /// Fails when the code belongs to another product, or when the serial is
    /// neither LOCKED nor IN_STOCK.
    fn resolve(&mut self, code: &str, product_id: ProductId) -> Result<ProductSn, SerialError>;

    /// Links a serial to a line. Relinking the same pair is a no-op.
    ///
    /// Returns true if a new link was created.
    fn link_to_line(&mut self, doc_id: DocumentId, line_id: DocLineId, sn_id: SerialId) -> bool;

    /// Removes a link. The caller guarantees the owning document is not posted.
    ///
    /// Returns true if a link was removed.
    fn unlink(&mut self, line_id: DocLineId, sn_id: SerialId) -> bool;
}

/// In-memory serial registry.
#[derive(Debug, Clone, Default)]
pub struct SerialBook {
    serials: HashMap<SerialId, ProductSn>,
    by_code: HashMap<String, SerialId>,
    links: BTreeMap<(DocLineId, SerialId), DocumentId>,
    by_doc: HashMap<DocumentId, BTreeSet<(DocLineId, SerialId)>>,
}

impl SerialBook {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from loaded serials and links.
    pub fn from_parts(
        serials: impl IntoIterator<Item = ProductSn>,
        links: impl IntoIterator<Item = DocLineSn>,
    ) -> Self {
        let mut book = Self::new();
        for sn in serials {
            book.insert(sn);
        }
        for link in links {
            book.link_to_line(link.doc_id, link.line_id, link.sn_id);
        }
        book
    }

    /// Copies out the part of the registry an import onto `line_id` reads:
    /// the serials behind `codes` and the links already on the line.
    #[must_use]
    pub fn slice_for_import<S: AsRef<str>>(&self, line_id: DocLineId, codes: &[S]) -> Self {
        let serials = codes
            .iter()
            .filter_map(|code| self.by_code(code.as_ref().trim()).cloned());
        Self::from_parts(serials, self.links_for_line(line_id))
    }

    /// Writes every serial and link of `staged` into this registry.
    pub fn merge(&mut self, staged: Self) {
        for sn in staged.serials.into_values() {
            self.insert(sn);
        }
        for ((line_id, sn_id), doc_id) in staged.links {
            self.link_to_line(doc_id, line_id, sn_id);
        }
    }

    /// Inserts or replaces a serial.
    pub fn insert(&mut self, sn: ProductSn) {
        self.by_code.insert(sn.sn.clone(), sn.id);
        self.serials.insert(sn.id, sn);
    }

    /// Looks a serial up by id.
    #[must_use]
    pub fn get(&self, sn_id: SerialId) -> Option<&ProductSn> {
        self.serials.get(&sn_id)
    }

    /// Looks a serial up by code.
    #[must_use]
    pub fn by_code(&self, code: &str) -> Option<&ProductSn> {
        self.by_code.get(code).and_then(|id| self.serials.get(id))
    }

    /// All links held for lines of one document.
    #[must_use]
    pub fn links_for_document(&self, doc_id: DocumentId) -> Vec<DocLineSn> {
        self.by_doc
            .get(&doc_id)
            .into_iter()
            .flatten()
            .map(|&(line_id, sn_id)| DocLineSn {
                doc_id,
                line_id,
                sn_id,
            })
            .collect()
    }

    /// All links held for one line, ordered by serial id.
    #[must_use]
    pub fn links_for_line(&self, line_id: DocLineId) -> Vec<DocLineSn> {
        self.line_links(line_id)
            .map(|(&(line_id, sn_id), &doc_id)| DocLineSn {
                doc_id,
                line_id,
                sn_id,
            })
            .collect()
    }

    fn line_links(
        &self,
        line_id: DocLineId,
    ) -> impl Iterator<Item = (&(DocLineId, SerialId), &DocumentId)> {
        self.links
            .range((line_id, SerialId::from_uuid(uuid::Uuid::nil()))..)
            .take_while(move |((line, _), _)| *line == line_id)
    }

    /// Iterates over every serial.
    pub fn serials(&self) -> impl Iterator<Item = &ProductSn> {
        self.serials.values()
    }
}

impl PostingSerials for SerialBook {
    fn serials_for_line(&self, line_id: DocLineId) -> Vec<ProductSn> {
        self.line_links(line_id)
            .filter_map(|((_, sn_id), _)| self.serials.get(sn_id).cloned())
            .collect()
    }

    fn transition_for_posting(
        &mut self,
        sn_id: SerialId,
        transition: &SnTransition,
    ) -> Result<ProductSn, SerialError> {
        let sn = self
            .serials
            .get_mut(&sn_id)
            .ok_or(SerialError::SerialNotFound(sn_id))?;
        sn.apply(transition);
        Ok(sn.clone())
    }
}

impl SerialRegistry for SerialBook {
    fn resolve(&mut self, code: &str, product_id: ProductId) -> Result<ProductSn, SerialError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(SerialError::EmptySerial);
        }

        if let Some(existing) = self.by_code(code) {
            if existing.product_id != product_id {
                return Err(SerialError::ProductMismatch {
                    sn: existing.sn.clone(),
                    expected: product_id,
                    actual: existing.product_id,
                });
            }
            if !existing.status.is_linkable() {
                return Err(SerialError::InvalidState {
                    sn: existing.sn.clone(),
                    status: existing.status,
                });
            }
            return Ok(existing.clone());
        }

        let sn = ProductSn::locked(code, product_id);
        self.insert(sn.clone());
        Ok(sn)
    }

    fn link_to_line(&mut self, doc_id: DocumentId, line_id: DocLineId, sn_id: SerialId) -> bool {
        if self.links.contains_key(&(line_id, sn_id)) {
            return false;
        }
        self.links.insert((line_id, sn_id), doc_id);
        self.by_doc.entry(doc_id).or_default().insert((line_id, sn_id));
        true
    }

    fn unlink(&mut self, line_id: DocLineId, sn_id: SerialId) -> bool {
        let Some(doc_id) = self.links.remove(&(line_id, sn_id)) else {
            return false;
        };
        if let Some(doc_links) = self.by_doc.get_mut(&doc_id) {
            doc_links.remove(&(line_id, sn_id));
            if doc_links.is_empty() {
                self.by_doc.remove(&doc_id);
            }
        }
        true
    }
}
