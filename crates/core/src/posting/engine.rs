//! Two-phase document posting.
//!
//! Phase 1 validates every line against the unit of work without writing
//! anything and produces a plan per line. Phase 2 applies the plans in
//! line order. A document whose validation fails leaves the unit of work
//! untouched; a failure during apply leaves partial writes that the caller
//! must discard with the unit of work.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use stockledger_shared::types::{DocumentId, SerialId, UserId, WarehouseId};
use tracing::{debug, info, info_span};

use super::error::{PostError, WarehouseSide};
use super::unit_of_work::{PostingUnitOfWork, sort_lines};
use crate::balance::BalanceKey;
use crate::document::{DocLine, DocStatus, DocType, Document, Product};
use crate::ledger::StockLedgerEntry;
use crate::serial::{ProductSn, SnTransition};

/// Result of a posting call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostingOutcome {
    /// Document after the call.
    pub document: Document,
    /// Ledger rows written by this call.
    pub ledger_entries_written: usize,
    /// True when the document was already POSTED and nothing was written.
    pub already_posted: bool,
}

/// Validated effect of one line.
#[derive(Debug, Clone)]
enum LinePlan {
    Receive {
        line: DocLine,
        to: WarehouseId,
        serials: Vec<SerialId>,
    },
    Ship {
        line: DocLine,
        from: WarehouseId,
        serials: Vec<SerialId>,
        warranty_end: Option<NaiveDate>,
    },
    Move {
        line: DocLine,
        from: WarehouseId,
        to: WarehouseId,
        serials: Vec<SerialId>,
    },
}

/// Running state shared by the validation of one document's lines.
#[derive(Default)]
struct Validation {
    demand: BTreeMap<BalanceKey, Decimal>,
    seen_serials: HashSet<SerialId>,
}

/// Stateless posting engine.
pub struct PostingEngine;

impl PostingEngine {
    /// Posts a document through `uow`.
    ///
    /// A POSTED document is returned unchanged with `already_posted` set.
    pub fn post<U>(
        uow: &mut U,
        document_id: DocumentId,
        posted_by: UserId,
        posted_at: DateTime<Utc>,
    ) -> Result<PostingOutcome, PostError>
    where
        U: PostingUnitOfWork + ?Sized,
    {
        let span = info_span!(
            "post_document",
            document_id = %document_id,
            doc_type = tracing::field::Empty
        );
        let _guard = span.enter();

        let document = uow
            .document(document_id)
            .ok_or(PostError::DocumentNotFound(document_id))?;
        span.record("doc_type", document.doc_type.as_str());

        match document.status {
            DocStatus::Posted => {
                debug!("Document already posted");
                return Ok(PostingOutcome {
                    document,
                    ledger_entries_written: 0,
                    already_posted: true,
                });
            }
            DocStatus::Draft | DocStatus::Approved => {}
        }

        let mut lines = uow.lines(document_id);
        sort_lines(&mut lines);

        let plans = Self::validate(uow, &document, lines)?;
        let written = Self::apply(uow, &document, plans, posted_at)?;
        let document = uow.mark_posted(document_id, posted_by, posted_at)?;

        info!(ledger_entries = written, "Document posted");

        Ok(PostingOutcome {
            document,
            ledger_entries_written: written,
            already_posted: false,
        })
    }

    fn validate<U>(
        uow: &U,
        doc: &Document,
        lines: Vec<DocLine>,
    ) -> Result<Vec<LinePlan>, PostError>
    where
        U: PostingUnitOfWork + ?Sized,
    {
        let mut state = Validation::default();
        let mut plans = Vec::with_capacity(lines.len());

        for line in lines {
            if line.qty <= Decimal::ZERO {
                return Err(PostError::NonPositiveQuantity {
                    line_id: line.id,
                    qty: line.qty,
                });
            }
            let product = uow
                .product(line.product_id)
                .ok_or(PostError::ProductNotFound(line.product_id))?;

            let plan = match doc.doc_type {
                DocType::PurchaseIn => Self::validate_receipt(uow, doc, line, &product, &mut state)?,
                DocType::SalesOut => Self::validate_sale(uow, doc, line, &product, &mut state)?,
                DocType::Transfer => Self::validate_transfer(uow, doc, line, &product, &mut state)?,
            };
            plans.push(plan);
        }

        Ok(plans)
    }

    fn validate_receipt<U>(
        uow: &U,
        doc: &Document,
        line: DocLine,
        product: &Product,
        state: &mut Validation,
    ) -> Result<LinePlan, PostError>
    where
        U: PostingUnitOfWork + ?Sized,
    {
        let to = doc
            .destination_for(&line)
            .ok_or(PostError::MissingWarehouse {
                line_id: line.id,
                side: WarehouseSide::Destination,
            })?;

        let serials = Self::linked_serials(uow, &line, product, state, |sn| {
            if sn.status.is_linkable() {
                Ok(())
            } else {
                Err(PostError::InvalidSnState {
                    sn: sn.sn.clone(),
                    status: sn.status,
                })
            }
        })?;

        debug!(line_no = line.line_no, warehouse_id = %to, qty = %line.qty, "Receipt line validated");
        Ok(LinePlan::Receive { line, to, serials })
    }

    fn validate_sale<U>(
        uow: &U,
        doc: &Document,
        line: DocLine,
        product: &Product,
        state: &mut Validation,
    ) -> Result<LinePlan, PostError>
    where
        U: PostingUnitOfWork + ?Sized,
    {
        let from = doc.source_for(&line).ok_or(PostError::MissingWarehouse {
            line_id: line.id,
            side: WarehouseSide::Source,
        })?;

        Self::reserve(uow, &line, from, state)?;
        let serials = Self::linked_serials(uow, &line, product, state, |sn| {
            Self::require_in_stock(sn, from)
        })?;
        let warranty_end = product.warranty_end(doc.biz_date);
        if warranty_end.is_none() && product.grants_warranty() && !serials.is_empty() {
            return Err(PostError::WarrantyOutOfRange {
                line_id: line.id,
                product_id: product.id,
            });
        }

        debug!(line_no = line.line_no, warehouse_id = %from, qty = %line.qty, "Sale line validated");
        Ok(LinePlan::Ship {
            line,
            from,
            serials,
            warranty_end,
        })
    }

    fn validate_transfer<U>(
        uow: &U,
        doc: &Document,
        line: DocLine,
        product: &Product,
        state: &mut Validation,
    ) -> Result<LinePlan, PostError>
    where
        U: PostingUnitOfWork + ?Sized,
    {
        let (from, to) = match (doc.source_for(&line), doc.destination_for(&line)) {
            (Some(from), Some(to)) if from != to => (from, to),
            _ => return Err(PostError::InvalidTransfer { line_id: line.id }),
        };

        Self::reserve(uow, &line, from, state)?;
        let serials = Self::linked_serials(uow, &line, product, state, |sn| {
            Self::require_in_stock(sn, from)
        })?;

        debug!(
            line_no = line.line_no,
            from = %from,
            to = %to,
            qty = %line.qty,
            "Transfer line validated"
        );
        Ok(LinePlan::Move {
            line,
            from,
            to,
            serials,
        })
    }

    /// Adds the line to the cumulative demand on its source balance.
    fn reserve<U>(
        uow: &U,
        line: &DocLine,
        from: WarehouseId,
        state: &mut Validation,
    ) -> Result<(), PostError>
    where
        U: PostingUnitOfWork + ?Sized,
    {
        let key = BalanceKey::new(from, line.product_id);
        let requested = state.demand.get(&key).copied().unwrap_or(Decimal::ZERO) + line.qty;
        let available = uow.qty_on_hand(key);
        if requested > available {
            return Err(PostError::InsufficientStock {
                line_id: line.id,
                warehouse_id: from,
                product_id: line.product_id,
                requested,
                available,
            });
        }
        state.demand.insert(key, requested);
        Ok(())
    }

    fn require_in_stock(sn: &ProductSn, warehouse_id: WarehouseId) -> Result<(), PostError> {
        if sn.is_in_stock_at(warehouse_id) {
            Ok(())
        } else {
            Err(PostError::SnNotInStock {
                sn: sn.sn.clone(),
                warehouse_id,
            })
        }
    }

    /// Checks the serials linked to a tracked line and returns their ids.
    fn linked_serials<U, F>(
        uow: &U,
        line: &DocLine,
        product: &Product,
        state: &mut Validation,
        check_state: F,
    ) -> Result<Vec<SerialId>, PostError>
    where
        U: PostingUnitOfWork + ?Sized,
        F: Fn(&ProductSn) -> Result<(), PostError>,
    {
        if !product.track_sn {
            return Ok(Vec::new());
        }

        let serials = uow.serials_for_line(line.id);
        // Fractional quantities can never match a serial count.
        if line.qty.fract() != Decimal::ZERO || line.qty != Decimal::from(serials.len()) {
            return Err(PostError::SnCountMismatch {
                line_id: line.id,
                expected: line.qty,
                linked: serials.len(),
            });
        }

        let mut ids = Vec::with_capacity(serials.len());
        for sn in &serials {
            if sn.product_id != line.product_id {
                return Err(PostError::SnProductMismatch {
                    sn: sn.sn.clone(),
                    line_id: line.id,
                });
            }
            if !state.seen_serials.insert(sn.id) {
                return Err(PostError::SnLinkedTwice { sn: sn.sn.clone() });
            }
            check_state(sn)?;
            ids.push(sn.id);
        }
        Ok(ids)
    }

    fn apply<U>(
        uow: &mut U,
        doc: &Document,
        plans: Vec<LinePlan>,
        posted_at: DateTime<Utc>,
    ) -> Result<usize, PostError>
    where
        U: PostingUnitOfWork + ?Sized,
    {
        let mut written = 0;

        for plan in plans {
            match plan {
                LinePlan::Receive { line, to, serials } => {
                    Self::inbound(uow, doc, &line, to, posted_at);
                    written += 1;
                    let transition = SnTransition::Receive {
                        warehouse_id: to,
                        doc_id: doc.id,
                        line_id: line.id,
                        date: doc.biz_date,
                    };
                    Self::transition_all(uow, &serials, &transition)?;
                }
                LinePlan::Ship {
                    line,
                    from,
                    serials,
                    warranty_end,
                } => {
                    Self::outbound(uow, doc, &line, from, posted_at)?;
                    written += 1;
                    let transition = SnTransition::Ship {
                        warehouse_id: from,
                        doc_id: doc.id,
                        line_id: line.id,
                        date: doc.biz_date,
                        warranty_end,
                    };
                    Self::transition_all(uow, &serials, &transition)?;
                }
                LinePlan::Move {
                    line,
                    from,
                    to,
                    serials,
                } => {
                    Self::outbound(uow, doc, &line, from, posted_at)?;
                    Self::inbound(uow, doc, &line, to, posted_at);
                    written += 2;
                    let transition = SnTransition::Relocate { warehouse_id: to };
                    Self::transition_all(uow, &serials, &transition)?;
                }
            }
        }

        Ok(written)
    }

    fn inbound<U>(
        uow: &mut U,
        doc: &Document,
        line: &DocLine,
        warehouse_id: WarehouseId,
        posted_at: DateTime<Utc>,
    ) where
        U: PostingUnitOfWork + ?Sized,
    {
        uow.append(StockLedgerEntry::inbound(doc, line, warehouse_id, posted_at));
        uow.adjust(BalanceKey::new(warehouse_id, line.product_id), line.qty);
    }

    fn outbound<U>(
        uow: &mut U,
        doc: &Document,
        line: &DocLine,
        warehouse_id: WarehouseId,
        posted_at: DateTime<Utc>,
    ) -> Result<(), PostError>
    where
        U: PostingUnitOfWork + ?Sized,
    {
        uow.append(StockLedgerEntry::outbound(doc, line, warehouse_id, posted_at));
        let key = BalanceKey::new(warehouse_id, line.product_id);
        let remaining = uow.adjust(key, -line.qty);
        if remaining < Decimal::ZERO {
            return Err(PostError::Internal(format!(
                "balance of product {} in warehouse {} would become {remaining}",
                key.product_id, key.warehouse_id
            )));
        }
        Ok(())
    }

    fn transition_all<U>(
        uow: &mut U,
        serials: &[SerialId],
        transition: &SnTransition,
    ) -> Result<(), PostError>
    where
        U: PostingUnitOfWork + ?Sized,
    {
        for sn_id in serials {
            let sn = uow
                .transition_for_posting(*sn_id, transition)
                .map_err(|e| PostError::Internal(e.to_string()))?;
            debug_assert_eq!(sn.status, transition.target_status());
        }
        Ok(())
    }
}
