//! `SeaORM` Entity for docs table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "docs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub doc_type: String,
    #[sea_orm(unique)]
    pub doc_no: String,
    pub biz_date: Date,
    pub partner_id: Option<Uuid>,
    pub from_wh_id: Option<Uuid>,
    pub to_wh_id: Option<Uuid>,
    pub status: String,
    pub remark: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTimeWithTimeZone>,
    pub posted_by: Option<Uuid>,
    pub posted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::doc_lines::Entity")]
    DocLines,
}

impl Related<super::doc_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DocLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
