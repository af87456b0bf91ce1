pub use super::_entities::photo_groups::{ActiveModel, Column, Entity, Model};
use crate::common::errors::CoreError;
use crate::models::_entities::photo_group_assignments;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveValue::Set, ConnectionTrait};
use uuid::Uuid;

impl ActiveModelBehavior for ActiveModel {}

impl Entity {
    /// Logical cascade on album soft-delete (spec §3: "cascade ... is
    /// logical, not physical"): groups are themselves soft-deleted, their
    /// assignment rows are left in place as harmless orphans behind the
    /// album's own tombstone.
    pub async fn soft_delete_for_album<C: ConnectionTrait>(
        db: &C,
        album_id: Uuid,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), CoreError> {
        Entity::update_many()
            .col_expr(Column::DeletedAt, Expr::value(Some(at)))
            .filter(Column::AlbumId.eq(album_id))
            .filter(Column::DeletedAt.is_null())
            .exec(db)
            .await
            .map_err(CoreError::from)?;
        Ok(())
    }

    pub async fn assign_photo<C: ConnectionTrait>(
        db: &C,
        group_id: Uuid,
        photo_id: Uuid,
    ) -> Result<photo_group_assignments::Model, CoreError> {
        let existing = photo_group_assignments::Entity::find()
            .filter(photo_group_assignments::Column::PhotoGroupId.eq(group_id))
            .filter(photo_group_assignments::Column::PhotoId.eq(photo_id))
            .one(db)
            .await
            .map_err(CoreError::from)?;
        if let Some(existing) = existing {
            return Ok(existing);
        }
        let active = photo_group_assignments::ActiveModel {
            id: Set(Uuid::new_v4()),
            photo_group_id: Set(group_id),
            photo_id: Set(photo_id),
        };
        active.insert(db).await.map_err(CoreError::from)
    }
}
