//! `SeaORM` Entity, hand-maintained in the style of `sea-orm-codegen` output.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "photo_group_assignments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub photo_group_id: Uuid,
    pub photo_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::photo_groups::Entity",
        from = "Column::PhotoGroupId",
        to = "super::photo_groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    PhotoGroups,
    #[sea_orm(
        belongs_to = "super::photos::Entity",
        from = "Column::PhotoId",
        to = "super::photos::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Photos,
}

impl Related<super::photo_groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PhotoGroups.def()
    }
}

impl Related<super::photos::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Photos.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
