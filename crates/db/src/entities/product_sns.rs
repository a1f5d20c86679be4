//! `SeaORM` Entity for product_sns table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "product_sns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    #[sea_orm(unique)]
    pub sn: String,
    pub status: String,
    pub warehouse_id: Option<Uuid>,
    pub in_doc_id: Option<Uuid>,
    pub in_line_id: Option<Uuid>,
    pub in_date: Option<Date>,
    pub out_doc_id: Option<Uuid>,
    pub out_line_id: Option<Uuid>,
    pub out_date: Option<Date>,
    pub warranty_start: Option<Date>,
    pub warranty_end: Option<Date>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::ProductId",
        to = "super::products::Column::Id"
    )]
    Products,
    #[sea_orm(has_many = "super::doc_line_sns::Entity")]
    DocLineSns,
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl Related<super::doc_line_sns::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DocLineSns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
