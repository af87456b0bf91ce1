//! Append-only write helpers for the event-log tables (spec §3, §9 OQ1): the
//! core only ever inserts rows here; any analytics shape built on top reads
//! independently and is out of scope.

use crate::common::errors::CoreError;
use crate::models::_entities::{audit_logs, album_views, download_logs, photo_views, translations};
use sea_orm::{ActiveValue::Set, ConnectionTrait};
use serde_json::Value as Json;
use uuid::Uuid;

pub async fn record_audit_log<C: ConnectionTrait>(
    db: &C,
    actor_id: Option<Uuid>,
    action: &str,
    subject: &str,
    details: Option<Json>,
) -> Result<audit_logs::Model, CoreError> {
    let active = audit_logs::ActiveModel {
        id: Set(Uuid::new_v4()),
        actor_id: Set(actor_id),
        action: Set(action.to_string()),
        subject: Set(subject.to_string()),
        details: Set(details),
        ..Default::default()
    };
    active.insert(db).await.map_err(CoreError::from)
}

pub async fn record_album_view<C: ConnectionTrait>(
    db: &C,
    album_id: Uuid,
    viewer_ip: Option<String>,
) -> Result<album_views::Model, CoreError> {
    let active = album_views::ActiveModel {
        id: Set(Uuid::new_v4()),
        album_id: Set(album_id),
        viewer_ip: Set(viewer_ip),
        ..Default::default()
    };
    active.insert(db).await.map_err(CoreError::from)
}

pub async fn record_photo_view<C: ConnectionTrait>(
    db: &C,
    photo_id: Uuid,
    viewer_ip: Option<String>,
) -> Result<photo_views::Model, CoreError> {
    let active = photo_views::ActiveModel {
        id: Set(Uuid::new_v4()),
        photo_id: Set(photo_id),
        viewer_ip: Set(viewer_ip),
        ..Default::default()
    };
    active.insert(db).await.map_err(CoreError::from)
}

pub async fn record_download<C: ConnectionTrait>(
    db: &C,
    photo_id: Option<Uuid>,
    album_id: Option<Uuid>,
    batch: bool,
) -> Result<download_logs::Model, CoreError> {
    let active = download_logs::ActiveModel {
        id: Set(Uuid::new_v4()),
        photo_id: Set(photo_id),
        album_id: Set(album_id),
        batch: Set(batch),
        ..Default::default()
    };
    active.insert(db).await.map_err(CoreError::from)
}

/// Write-through upsert of one `(locale, key)` translation pair (a
/// distillation-dropped feature, supplemented per the original's template
/// store: see SPEC_FULL.md §11).
pub async fn upsert_translation<C: ConnectionTrait>(
    db: &C,
    locale: &str,
    key: &str,
    value: &str,
) -> Result<translations::Model, CoreError> {
    use sea_orm::EntityTrait;
    use sea_orm::QueryFilter;
    use sea_orm::ColumnTrait;

    let existing = translations::Entity::find()
        .filter(translations::Column::Locale.eq(locale))
        .filter(translations::Column::Key.eq(key))
        .one(db)
        .await
        .map_err(CoreError::from)?;

    if let Some(existing) = existing {
        let mut active: translations::ActiveModel = existing.into();
        active.value = Set(value.to_string());
        return active.update(db).await.map_err(CoreError::from);
    }

    let active = translations::ActiveModel {
        id: Set(Uuid::new_v4()),
        locale: Set(locale.to_string()),
        key: Set(key.to_string()),
        value: Set(value.to_string()),
    };
    active.insert(db).await.map_err(CoreError::from)
}
