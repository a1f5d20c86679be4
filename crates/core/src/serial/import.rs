//! Presenting serial codes against a document line.

use crate::document::{DocLine, DocStatus, Document, Product};

use super::error::SerialError;
use super::registry::SerialRegistry;
use super::types::ProductSn;

/// Resolves each code for the line's product and links it to the line.
///
/// Codes are trimmed before lookup. Linking is idempotent, so importing the
/// same code twice returns the same serial twice and creates one link.
///
/// Stops at the first failing code. Earlier codes stay resolved and linked in
/// `registry`, so callers that need all-or-nothing behaviour import into a
/// copy and keep it only on success.
pub fn import_serials<R, S>(
    registry: &mut R,
    doc: &Document,
    line: &DocLine,
    product: &Product,
    codes: &[S],
) -> Result<Vec<ProductSn>, SerialError>
where
    R: SerialRegistry + ?Sized,
    S: AsRef<str>,
{
    if doc.status == DocStatus::Posted {
        return Err(SerialError::DocumentPosted(doc.id));
    }
    if line.doc_id != doc.id {
        return Err(SerialError::LineNotInDocument {
            line_id: line.id,
            doc_id: doc.id,
        });
    }
    if product.id != line.product_id {
        return Err(SerialError::ProductNotFound(line.product_id));
    }
    if !product.track_sn {
        return Err(SerialError::ProductNotTracked(product.id));
    }
    if codes.is_empty() {
        return Err(SerialError::NoSerials);
    }

    let mut resolved = Vec::with_capacity(codes.len());
    for code in codes {
        let sn = registry.resolve(code.as_ref(), product.id)?;
        registry.link_to_line(doc.id, line.id, sn.id);
        resolved.push(sn);
    }

    tracing::debug!(
        document_id = %doc.id,
        line_id = %line.id,
        count = resolved.len(),
        "Serials linked to line"
    );

    Ok(resolved)
}
