//! Conversions between database rows and core domain types.

use chrono::Utc;
use sea_orm::{DbErr, Set};
use stockledger_core::balance::StockBalance;
use stockledger_core::document::{DocLine, DocType, Document, DocumentError, Product};
use stockledger_core::ledger::StockLedgerEntry;
use stockledger_core::serial::{DocLineSn, ProductSn, SnStatus};
use stockledger_shared::types::{
    DocLineId, DocumentId, LedgerEntryId, PartnerId, ProductId, SerialId, UserId, WarehouseId,
};

use crate::entities::{
    doc_line_sns, doc_lines, docs, product_sns, products, stock_balances, stock_ledger,
};

/// Converts a document row. Unknown status or type strings are reported as such.
pub fn document_from_model(model: docs::Model) -> Result<Document, DocumentError> {
    Ok(Document {
        id: DocumentId::from(model.id),
        doc_type: model.doc_type.parse()?,
        doc_no: model.doc_no,
        biz_date: model.biz_date,
        partner_id: model.partner_id.map(PartnerId::from),
        from_wh: model.from_wh_id.map(WarehouseId::from),
        to_wh: model.to_wh_id.map(WarehouseId::from),
        status: model.status.parse()?,
        remark: model.remark,
        created_by: model.created_by.map(UserId::from),
        created_at: model.created_at.with_timezone(&Utc),
        approved_by: model.approved_by.map(UserId::from),
        approved_at: model.approved_at.map(|at| at.with_timezone(&Utc)),
        posted_by: model.posted_by.map(UserId::from),
        posted_at: model.posted_at.map(|at| at.with_timezone(&Utc)),
    })
}

/// Builds a fully set document row.
pub fn document_active(doc: &Document) -> docs::ActiveModel {
    docs::ActiveModel {
        id: Set(doc.id.into_inner()),
        doc_type: Set(doc.doc_type.as_str().to_string()),
        doc_no: Set(doc.doc_no.clone()),
        biz_date: Set(doc.biz_date),
        partner_id: Set(doc.partner_id.map(PartnerId::into_inner)),
        from_wh_id: Set(doc.from_wh.map(WarehouseId::into_inner)),
        to_wh_id: Set(doc.to_wh.map(WarehouseId::into_inner)),
        status: Set(doc.status.as_str().to_string()),
        remark: Set(doc.remark.clone()),
        created_by: Set(doc.created_by.map(UserId::into_inner)),
        created_at: Set(doc.created_at.into()),
        approved_by: Set(doc.approved_by.map(UserId::into_inner)),
        approved_at: Set(doc.approved_at.map(Into::into)),
        posted_by: Set(doc.posted_by.map(UserId::into_inner)),
        posted_at: Set(doc.posted_at.map(Into::into)),
    }
}

/// Converts a line row.
pub fn line_from_model(model: doc_lines::Model) -> DocLine {
    DocLine {
        id: DocLineId::from(model.id),
        doc_id: DocumentId::from(model.doc_id),
        line_no: model.line_no,
        product_id: ProductId::from(model.product_id),
        qty: model.qty,
        unit_price: model.unit_price,
        amount: model.amount,
        from_wh: model.from_wh_id.map(WarehouseId::from),
        to_wh: model.to_wh_id.map(WarehouseId::from),
        remark: model.remark,
    }
}

/// Builds a fully set line row.
pub fn line_active(line: &DocLine) -> doc_lines::ActiveModel {
    doc_lines::ActiveModel {
        id: Set(line.id.into_inner()),
        doc_id: Set(line.doc_id.into_inner()),
        line_no: Set(line.line_no),
        product_id: Set(line.product_id.into_inner()),
        qty: Set(line.qty),
        unit_price: Set(line.unit_price),
        amount: Set(line.amount),
        from_wh_id: Set(line.from_wh.map(WarehouseId::into_inner)),
        to_wh_id: Set(line.to_wh.map(WarehouseId::into_inner)),
        remark: Set(line.remark.clone()),
    }
}

/// Converts a product row. Negative warranty lengths read as no warranty.
pub fn product_from_model(model: products::Model) -> Product {
    Product {
        id: ProductId::from(model.id),
        sku: model.sku,
        name: model.name,
        track_sn: model.track_sn,
        warranty_months: model.warranty_months.and_then(|m| u32::try_from(m).ok()),
        is_active: model.is_active,
    }
}

/// Builds a fully set product row.
pub fn product_active(product: &Product) -> products::ActiveModel {
    products::ActiveModel {
        id: Set(product.id.into_inner()),
        sku: Set(product.sku.clone()),
        name: Set(product.name.clone()),
        track_sn: Set(product.track_sn),
        warranty_months: Set(product.warranty_months.and_then(|m| i32::try_from(m).ok())),
        is_active: Set(product.is_active),
    }
}

/// Converts a balance row.
pub fn balance_from_model(model: stock_balances::Model) -> StockBalance {
    StockBalance {
        warehouse_id: WarehouseId::from(model.warehouse_id),
        product_id: ProductId::from(model.product_id),
        qty_on_hand: model.qty_on_hand,
    }
}

/// Builds a fully set balance row.
pub fn balance_active(row: &StockBalance) -> stock_balances::ActiveModel {
    stock_balances::ActiveModel {
        warehouse_id: Set(row.warehouse_id.into_inner()),
        product_id: Set(row.product_id.into_inner()),
        qty_on_hand: Set(row.qty_on_hand),
    }
}

/// Converts a ledger row.
pub fn ledger_from_model(model: stock_ledger::Model) -> Result<StockLedgerEntry, DocumentError> {
    Ok(StockLedgerEntry {
        id: LedgerEntryId::from(model.id),
        warehouse_id: WarehouseId::from(model.warehouse_id),
        product_id: ProductId::from(model.product_id),
        ref_doc_id: DocumentId::from(model.ref_doc_id),
        ref_line_id: DocLineId::from(model.ref_line_id),
        ref_type: model.ref_type.parse::<DocType>()?,
        biz_date: model.biz_date,
        in_qty: model.in_qty,
        out_qty: model.out_qty,
        unit_cost: model.unit_cost,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

/// Builds a ledger row for insertion.
pub fn ledger_active(entry: &StockLedgerEntry) -> stock_ledger::ActiveModel {
    stock_ledger::ActiveModel {
        id: Set(entry.id.into_inner()),
        warehouse_id: Set(entry.warehouse_id.into_inner()),
        product_id: Set(entry.product_id.into_inner()),
        ref_doc_id: Set(entry.ref_doc_id.into_inner()),
        ref_line_id: Set(entry.ref_line_id.into_inner()),
        ref_type: Set(entry.ref_type.as_str().to_string()),
        biz_date: Set(entry.biz_date),
        in_qty: Set(entry.in_qty),
        out_qty: Set(entry.out_qty),
        unit_cost: Set(entry.unit_cost),
        created_at: Set(entry.created_at.into()),
    }
}

/// Converts a serial row.
pub fn serial_from_model(model: product_sns::Model) -> Result<ProductSn, DbErr> {
    let status: SnStatus = model.status.parse().map_err(DbErr::Type)?;
    Ok(ProductSn {
        id: SerialId::from(model.id),
        product_id: ProductId::from(model.product_id),
        sn: model.sn,
        status,
        warehouse_id: model.warehouse_id.map(WarehouseId::from),
        in_doc_id: model.in_doc_id.map(DocumentId::from),
        in_line_id: model.in_line_id.map(DocLineId::from),
        in_date: model.in_date,
        out_doc_id: model.out_doc_id.map(DocumentId::from),
        out_line_id: model.out_line_id.map(DocLineId::from),
        out_date: model.out_date,
        warranty_start: model.warranty_start,
        warranty_end: model.warranty_end,
    })
}

/// Builds a fully set serial row.
pub fn serial_active(sn: &ProductSn) -> product_sns::ActiveModel {
    product_sns::ActiveModel {
        id: Set(sn.id.into_inner()),
        product_id: Set(sn.product_id.into_inner()),
        sn: Set(sn.sn.clone()),
        status: Set(sn.status.as_str().to_string()),
        warehouse_id: Set(sn.warehouse_id.map(WarehouseId::into_inner)),
        in_doc_id: Set(sn.in_doc_id.map(DocumentId::into_inner)),
        in_line_id: Set(sn.in_line_id.map(DocLineId::into_inner)),
        in_date: Set(sn.in_date),
        out_doc_id: Set(sn.out_doc_id.map(DocumentId::into_inner)),
        out_line_id: Set(sn.out_line_id.map(DocLineId::into_inner)),
        out_date: Set(sn.out_date),
        warranty_start: Set(sn.warranty_start),
        warranty_end: Set(sn.warranty_end),
    }
}

/// Converts a link row.
pub fn link_from_model(model: doc_line_sns::Model) -> DocLineSn {
    DocLineSn {
        doc_id: DocumentId::from(model.doc_id),
        line_id: DocLineId::from(model.line_id),
        sn_id: SerialId::from(model.sn_id),
    }
}

/// Builds a link row for insertion.
pub fn link_active(link: &DocLineSn) -> doc_line_sns::ActiveModel {
    doc_line_sns::ActiveModel {
        line_id: Set(link.line_id.into_inner()),
        sn_id: Set(link.sn_id.into_inner()),
        doc_id: Set(link.doc_id.into_inner()),
    }
}
