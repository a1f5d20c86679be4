//! Tests for the in-memory inventory, including concurrent postings.

use std::thread;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stockledger_shared::PostingConfig;
use stockledger_shared::types::{DocLineId, DocumentId, ProductId, UserId, WarehouseId};

use super::InMemoryInventory;
use crate::document::{DocLine, DocStatus, DocType, Document, DocumentError, Product};
use crate::posting::PostError;
use crate::serial::{SerialError, SnStatus};

fn biz_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
}

fn inventory(max_attempts: u32) -> InMemoryInventory {
    InMemoryInventory::new(PostingConfig { max_attempts })
}

fn product(inv: &InMemoryInventory, product: Product) -> ProductId {
    let id = product.id;
    inv.upsert_product(product).unwrap();
    id
}

fn document(
    inv: &InMemoryInventory,
    doc_type: DocType,
    from: Option<WarehouseId>,
    to: Option<WarehouseId>,
    product: ProductId,
    qty: Decimal,
) -> (DocumentId, DocLineId) {
    let mut doc = Document::draft(doc_type, "DOC", biz_date(), UserId::new());
    doc.from_wh = from;
    doc.to_wh = to;
    let line = DocLine::new(doc.id, 1, product, qty).unwrap();
    let line_id = line.id;
    (inv.create_document(doc, vec![line]).unwrap(), line_id)
}

fn receive(inv: &InMemoryInventory, wh: WarehouseId, product: ProductId, qty: Decimal) {
    let (doc, _) = document(inv, DocType::PurchaseIn, None, Some(wh), product, qty);
    inv.post_document(doc, UserId::new()).unwrap();
}

#[test]
fn test_purchase_transfer_sale_scenario() {
    let inv = inventory(3);
    let user = UserId::new();
    let w1 = WarehouseId::new();
    let w2 = WarehouseId::new();
    let p1 = product(&inv, Product::new("CBL-1", "Cable"));

    let (purchase, _) = document(&inv, DocType::PurchaseIn, None, Some(w1), p1, dec!(5));
    let (transfer, _) = document(&inv, DocType::Transfer, Some(w1), Some(w2), p1, dec!(5));
    let (sale, _) = document(&inv, DocType::SalesOut, Some(w2), None, p1, dec!(5));
    inv.post_document(purchase, user).unwrap();
    inv.post_document(transfer, user).unwrap();
    inv.post_document(sale, user).unwrap();

    assert_eq!(inv.qty_on_hand(w1, p1), Decimal::ZERO);
    assert_eq!(inv.qty_on_hand(w2, p1), Decimal::ZERO);
    assert_eq!(inv.ledger_entries().len(), 4);
    assert!(inv.reconcile().is_empty());
    assert_eq!(inv.document(sale).unwrap().status, DocStatus::Posted);
}

#[test]
fn test_insufficient_stock_writes_nothing() {
    let inv = inventory(3);
    let w1 = WarehouseId::new();
    let p1 = product(&inv, Product::new("CBL-1", "Cable"));
    receive(&inv, w1, p1, dec!(10));

    let (sale, _) = document(&inv, DocType::SalesOut, Some(w1), None, p1, dec!(12));
    let err = inv.post_document(sale, UserId::new()).unwrap_err();

    assert_eq!(err.error_code(), "INSUFFICIENT_STOCK");
    assert!(!err.is_retryable());
    assert_eq!(inv.qty_on_hand(w1, p1), dec!(10));
    assert_eq!(inv.ledger_entries().len(), 1);
    assert_eq!(inv.document(sale).unwrap().status, DocStatus::Draft);
}

#[test]
fn test_serial_lifecycle_through_inventory() {
    let inv = inventory(3);
    let user = UserId::new();
    let wh = WarehouseId::new();
    let phone = product(&inv, Product::new("PHN-1", "Phone").serialized(Some(12)));

    let (purchase, line) = document(&inv, DocType::PurchaseIn, None, Some(wh), phone, dec!(3));
    inv.import_serials(purchase, line, &["SN001", "SN002"]).unwrap();
    assert!(matches!(
        inv.post_document(purchase, user),
        Err(PostError::SnCountMismatch { linked: 2, .. })
    ));

    let third = inv.scan_serial(purchase, line, " SN003 ").unwrap();
    assert_eq!(third.sn, "SN003");
    inv.approve_document(purchase, user).unwrap();
    inv.post_document(purchase, user).unwrap();

    for code in ["SN001", "SN002", "SN003"] {
        let sn = inv.serial_by_code(code).unwrap();
        assert_eq!(sn.status, SnStatus::InStock);
        assert_eq!(sn.warehouse_id, Some(wh));
    }
    assert_eq!(inv.serial(third.id).unwrap().in_doc_id, Some(purchase));
    assert_eq!(
        inv.import_serials(purchase, line, &["SN004"]),
        Err(SerialError::DocumentPosted(purchase))
    );
}

#[test]
fn test_failed_import_links_nothing() {
    let inv = inventory(3);
    let wh = WarehouseId::new();
    let phone = product(&inv, Product::new("PHN-1", "Phone").serialized(None));
    let tablet = product(&inv, Product::new("TAB-1", "Tablet").serialized(None));
    let (tablet_doc, tablet_line) =
        document(&inv, DocType::PurchaseIn, None, Some(wh), tablet, dec!(1));
    inv.import_serials(tablet_doc, tablet_line, &["TAB-1"]).unwrap();

    let (doc, line) = document(&inv, DocType::PurchaseIn, None, Some(wh), phone, dec!(2));
    let err = inv.import_serials(doc, line, &["PHN-1", "TAB-1"]).unwrap_err();

    assert!(matches!(err, SerialError::ProductMismatch { .. }));
    assert!(inv.serial_by_code("PHN-1").is_none());

    inv.post_document(tablet_doc, UserId::new()).unwrap();
    assert_eq!(inv.serial_by_code("TAB-1").unwrap().status, SnStatus::InStock);
}

#[test]
fn test_repeated_import_keeps_earlier_links() {
    let inv = inventory(3);
    let wh = WarehouseId::new();
    let phone = product(&inv, Product::new("PHN-1", "Phone").serialized(None));
    let (other_doc, other_line) =
        document(&inv, DocType::PurchaseIn, None, Some(wh), phone, dec!(1));
    inv.scan_serial(other_doc, other_line, "SN-OTHER").unwrap();
    let (doc, line) = document(&inv, DocType::PurchaseIn, None, Some(wh), phone, dec!(3));

    inv.import_serials(doc, line, &["SN001", "SN002"]).unwrap();
    inv.import_serials(doc, line, &["SN002", "SN003"]).unwrap();
    inv.post_document(doc, UserId::new()).unwrap();

    assert_eq!(inv.qty_on_hand(wh, phone), dec!(3));
    for code in ["SN001", "SN002", "SN003"] {
        assert_eq!(inv.serial_by_code(code).unwrap().status, SnStatus::InStock);
    }
    assert_eq!(inv.serial_by_code("SN-OTHER").unwrap().status, SnStatus::Locked);
    inv.post_document(other_doc, UserId::new()).unwrap();
    assert_eq!(inv.qty_on_hand(wh, phone), dec!(4));
}

#[test]
fn test_upsert_product_rejects_overlong_warranty() {
    let inv = inventory(3);
    let product = Product::new("SRV-1", "Server").serialized(Some(u32::MAX));
    let id = product.id;

    assert_eq!(
        inv.upsert_product(product),
        Err(DocumentError::WarrantyTooLong(u32::MAX))
    );
    let wh = WarehouseId::new();
    let (doc, _) = document(&inv, DocType::PurchaseIn, None, Some(wh), id, dec!(1));
    assert_eq!(
        inv.post_document(doc, UserId::new()),
        Err(PostError::ProductNotFound(id))
    );
}

#[test]
fn test_create_document_rejects_unstorable_lines() {
    let inv = inventory(3);
    let product = ProductId::new();
    let doc = Document::draft(DocType::PurchaseIn, "PI", biz_date(), UserId::new());
    let mut line = DocLine::new(doc.id, 1, product, dec!(1)).unwrap();
    line.qty = dec!(1.005);

    assert_eq!(
        inv.create_document(doc.clone(), vec![line]),
        Err(DocumentError::QuantityScale(dec!(1.005)))
    );

    let lines = vec![
        DocLine::new(doc.id, 1, product, dec!(1)).unwrap(),
        DocLine::new(doc.id, 1, product, dec!(2)).unwrap(),
    ];
    assert_eq!(
        inv.create_document(doc.clone(), lines),
        Err(DocumentError::DuplicateLineNo(1))
    );
    assert!(inv.document(doc.id).is_none());
}

#[test]
fn test_unlink_serial() {
    let inv = inventory(3);
    let user = UserId::new();
    let wh = WarehouseId::new();
    let phone = product(&inv, Product::new("PHN-1", "Phone").serialized(None));
    let (doc, line) = document(&inv, DocType::PurchaseIn, None, Some(wh), phone, dec!(1));
    let wrong = inv.scan_serial(doc, line, "WRONG").unwrap();
    inv.scan_serial(doc, line, "RIGHT").unwrap();

    inv.unlink_serial(doc, line, wrong.id).unwrap();
    assert_eq!(
        inv.unlink_serial(doc, line, wrong.id),
        Err(SerialError::LinkNotFound {
            line_id: line,
            sn_id: wrong.id,
        })
    );
    inv.post_document(doc, user).unwrap();

    assert_eq!(inv.serial_by_code("RIGHT").unwrap().status, SnStatus::InStock);
    assert_eq!(inv.serial(wrong.id).unwrap().status, SnStatus::Locked);
}

#[test]
fn test_import_checks_line_ownership() {
    let inv = inventory(3);
    let wh = WarehouseId::new();
    let phone = product(&inv, Product::new("PHN-1", "Phone").serialized(None));
    let (first, _) = document(&inv, DocType::PurchaseIn, None, Some(wh), phone, dec!(1));
    let (_, second_line) = document(&inv, DocType::PurchaseIn, None, Some(wh), phone, dec!(1));

    assert_eq!(
        inv.import_serials(first, second_line, &["SN001"]),
        Err(SerialError::LineNotInDocument {
            line_id: second_line,
            doc_id: first,
        })
    );
    let ghost = DocLineId::new();
    assert_eq!(
        inv.import_serials(first, ghost, &["SN001"]),
        Err(SerialError::LineNotFound(ghost))
    );
}

#[test]
fn test_create_document_rejects_foreign_lines_and_duplicates() {
    let inv = inventory(3);
    let product = ProductId::new();
    let doc = Document::draft(DocType::PurchaseIn, "PI", biz_date(), UserId::new());
    let foreign = DocLine::new(DocumentId::new(), 1, product, dec!(1)).unwrap();

    assert!(matches!(
        inv.create_document(doc.clone(), vec![foreign]),
        Err(DocumentError::ForeignLine { .. })
    ));

    inv.create_document(doc.clone(), Vec::new()).unwrap();
    assert_eq!(
        inv.create_document(doc.clone(), Vec::new()),
        Err(DocumentError::AlreadyExists(doc.id))
    );
}

#[test]
fn test_approve_twice_fails() {
    let inv = inventory(3);
    let user = UserId::new();
    let (doc, _) = document(
        &inv,
        DocType::PurchaseIn,
        None,
        Some(WarehouseId::new()),
        ProductId::new(),
        dec!(1),
    );

    let approved = inv.approve_document(doc, user).unwrap();
    assert_eq!(approved.status, DocStatus::Approved);
    assert!(matches!(
        inv.approve_document(doc, user),
        Err(DocumentError::InvalidTransition { .. })
    ));
    let ghost = DocumentId::new();
    assert_eq!(
        inv.approve_document(ghost, user),
        Err(DocumentError::NotFound(ghost))
    );
}

#[test]
fn test_concurrent_sales_never_oversell() {
    let inv = inventory(32);
    let wh = WarehouseId::new();
    let p1 = product(&inv, Product::new("CBL-1", "Cable"));
    receive(&inv, wh, p1, dec!(5));

    let sales: Vec<DocumentId> = (0..8)
        .map(|_| document(&inv, DocType::SalesOut, Some(wh), None, p1, dec!(1)).0)
        .collect();

    let results: Vec<Result<_, PostError>> = thread::scope(|scope| {
        let handles: Vec<_> = sales
            .iter()
            .map(|doc| {
                let inv = &inv;
                scope.spawn(move || inv.post_document(*doc, UserId::new()))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let posted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(posted, 5);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.error_code(), "INSUFFICIENT_STOCK");
    }
    assert_eq!(inv.qty_on_hand(wh, p1), Decimal::ZERO);
    assert_eq!(inv.ledger_entries().len(), 1 + 5);
    assert!(inv.reconcile().is_empty());
}

#[test]
fn test_concurrent_transfers_preserve_totals() {
    let inv = inventory(64);
    let w1 = WarehouseId::new();
    let w2 = WarehouseId::new();
    let p1 = product(&inv, Product::new("CBL-1", "Cable"));
    receive(&inv, w1, p1, dec!(50));
    receive(&inv, w2, p1, dec!(50));

    let transfers: Vec<DocumentId> = (0..10)
        .map(|i| {
            let (from, to) = if i % 2 == 0 { (w1, w2) } else { (w2, w1) };
            document(&inv, DocType::Transfer, Some(from), Some(to), p1, dec!(3)).0
        })
        .collect();

    thread::scope(|scope| {
        for doc in &transfers {
            let inv = &inv;
            scope.spawn(move || inv.post_document(*doc, UserId::new()).unwrap());
        }
    });

    assert_eq!(inv.qty_on_hand(w1, p1), dec!(50));
    assert_eq!(inv.qty_on_hand(w2, p1), dec!(50));
    assert_eq!(inv.ledger_entries().len(), 2 + 20);
    assert!(inv.reconcile().is_empty());
}

#[test]
fn test_concurrent_posting_of_one_document_writes_once() {
    let inv = inventory(8);
    let wh = WarehouseId::new();
    let p1 = product(&inv, Product::new("CBL-1", "Cable"));
    let (doc, _) = document(&inv, DocType::PurchaseIn, None, Some(wh), p1, dec!(4));

    let outcomes: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let inv = &inv;
                scope.spawn(move || inv.post_document(doc, UserId::new()).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(outcomes.iter().filter(|o| !o.already_posted).count(), 1);
    assert_eq!(inv.qty_on_hand(wh, p1), dec!(4));
    assert_eq!(inv.ledger_entries().len(), 1);
}

#[test]
fn test_single_attempt_reports_conflict() {
    let inv = inventory(1);
    let wh = WarehouseId::new();
    let p1 = product(&inv, Product::new("CBL-1", "Cable"));
    receive(&inv, wh, p1, dec!(1000));

    let sales: Vec<DocumentId> = (0..16)
        .map(|_| document(&inv, DocType::SalesOut, Some(wh), None, p1, dec!(1)).0)
        .collect();

    let results: Vec<Result<_, PostError>> = thread::scope(|scope| {
        let handles: Vec<_> = sales
            .iter()
            .map(|doc| {
                let inv = &inv;
                scope.spawn(move || inv.post_document(*doc, UserId::new()))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let posted = results.iter().filter(|r| r.is_ok()).count();
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(*err, PostError::ConcurrentModification { attempts: 1 });
        assert!(err.is_retryable());
    }
    let expected = dec!(1000) - Decimal::from(posted);
    assert_eq!(inv.qty_on_hand(wh, p1), expected);
    assert!(inv.reconcile().is_empty());
}
