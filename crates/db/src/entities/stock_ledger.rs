//! `SeaORM` Entity for stock_ledger table.
//!
//! Rows are inserted only. Nothing in this crate updates or deletes them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_ledger")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub ref_doc_id: Uuid,
    pub ref_line_id: Uuid,
    pub ref_type: String,
    pub biz_date: Date,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub in_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub out_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))", nullable)]
    pub unit_cost: Option<Decimal>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::docs::Entity",
        from = "Column::RefDocId",
        to = "super::docs::Column::Id"
    )]
    Docs,
}

impl Related<super::docs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Docs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
