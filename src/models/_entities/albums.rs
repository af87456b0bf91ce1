//! `SeaORM` Entity, hand-maintained in the style of `sea-orm-codegen` output.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "albums")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub allow_download: bool,
    pub allow_batch_download: bool,
    pub allow_share: bool,
    pub show_exif: bool,
    pub layout: String,
    pub sort_rule: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub expires_at: Option<DateTimeWithTimeZone>,
    pub watermark_enabled: bool,
    pub watermark_type: String,
    pub watermark_config: Option<Json>,
    pub color_grading: Option<Json>,
    pub cover_photo_id: Option<Uuid>,
    pub photo_count: i32,
    pub selected_count: i32,
    pub view_count: i32,
    #[serde(skip_serializing)]
    pub upload_token: String,
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::photos::Entity")]
    Photos,
    #[sea_orm(has_many = "super::photo_groups::Entity")]
    PhotoGroups,
}

impl Related<super::photos::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Photos.def()
    }
}

impl Related<super::photo_groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PhotoGroups.def()
    }
}
