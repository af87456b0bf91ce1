pub use super::_entities::albums::{ActiveModel, Column, Entity, Model};
use crate::common::errors::CoreError;
use crate::db::filter::{Filter, Op};
use crate::db::{from_row, DatabaseAdapter};
use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait};
use serde_json::{json, Value as Json};
use uuid::Uuid;

const TABLE: &str = "albums";
const PHOTOS_TABLE: &str = "photos";

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert && self.updated_at.is_unchanged() {
            let mut this = self;
            this.updated_at = Set(Utc::now().into());
            Ok(this)
        } else {
            Ok(self)
        }
    }
}

/// Resolves `username` the way the FTP login path does (spec §4.6): first
/// as a UUID, falling back to the unique `slug`. Soft-deleted albums are
/// invisible to this lookup.
pub async fn find_by_id_or_slug(
    db: &dyn DatabaseAdapter,
    id_or_slug: &str,
) -> Result<Option<Model>, CoreError> {
    let filter = Uuid::parse_str(id_or_slug)
        .map(|id| Filter::new("id", Op::Eq, json!(id)))
        .unwrap_or_else(|_| Filter::new("slug", Op::Eq, json!(id_or_slug)));
    let filters = vec![filter, Filter::new("deleted_at", Op::Eq, Json::Null)];
    match db.find_one(TABLE, &filters).await? {
        Some(row) => Ok(Some(from_row(row)?)),
        None => Ok(None),
    }
}

/// Plain by-id lookup with no soft-delete filter, used by the album
/// metadata cache (spec §4.4), which only needs the latest row regardless
/// of tombstone state — a deleted album's policy still governs any photo
/// still mid-flight in the pipeline.
pub async fn find_by_id(db: &dyn DatabaseAdapter, album_id: Uuid) -> Result<Option<Model>, CoreError> {
    let filters = vec![Filter::new("id", Op::Eq, json!(album_id))];
    match db.find_one(TABLE, &filters).await? {
        Some(row) => Ok(Some(from_row(row)?)),
        None => Ok(None),
    }
}

/// Lazily reconciles `photo_count` against the authoritative count of
/// non-deleted, completed photos (spec §3 invariant, §9 OQ3: this is a
/// best-effort convention, not a transactional guarantee). Call on read
/// paths that return album rows to external callers; the processing
/// pipeline itself never touches this column.
pub async fn reconcile_photo_count(db: &dyn DatabaseAdapter, album: &Model) -> Result<i32, CoreError> {
    let filters = vec![
        Filter::new("album_id", Op::Eq, json!(album.id)),
        Filter::new("status", Op::Eq, json!("completed")),
        Filter::new("deleted_at", Op::Eq, Json::Null),
    ];
    let actual = db.count(PHOTOS_TABLE, &filters).await?;
    let actual = i32::try_from(actual).unwrap_or(i32::MAX);
    if actual != album.photo_count {
        let patch = json!({ "photo_count": actual });
        db.update(TABLE, &[Filter::new("id", Op::Eq, json!(album.id))], patch)
            .await?;
    }
    Ok(actual)
}
