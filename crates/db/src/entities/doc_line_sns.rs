//! `SeaORM` Entity for doc_line_sns table.
//!
//! The (line_id, sn_id) primary key makes relinking a no-op.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "doc_line_sns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub line_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub sn_id: Uuid,
    pub doc_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::doc_lines::Entity",
        from = "Column::LineId",
        to = "super::doc_lines::Column::Id"
    )]
    DocLines,
    #[sea_orm(
        belongs_to = "super::product_sns::Entity",
        from = "Column::SnId",
        to = "super::product_sns::Column::Id"
    )]
    ProductSns,
}

impl Related<super::doc_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DocLines.def()
    }
}

impl Related<super::product_sns::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductSns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
