//! In-process album metadata cache (spec §4.4). One cache per worker
//! process; freshness is bounded by TTL, not cross-process invalidation.

use crate::common::errors::CoreError;
use crate::db::DatabaseAdapter;
use crate::models::albums;
use crate::models::_entities::albums as album_entity;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// The watermark/style/policy subset the pipeline needs per photo — not the
/// full album row, so a cache hit never leaks unrelated admin fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumPolicy {
    pub watermark_enabled: bool,
    pub watermark_type: String,
    pub watermark_config: Option<serde_json::Value>,
    pub color_grading: Option<serde_json::Value>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<album_entity::Model> for AlbumPolicy {
    fn from(m: album_entity::Model) -> Self {
        Self {
            watermark_enabled: m.watermark_enabled,
            watermark_type: m.watermark_type,
            watermark_config: m.watermark_config,
            color_grading: m.color_grading,
            deleted_at: m.deleted_at.map(Into::into),
        }
    }
}

pub struct AlbumCache {
    inner: Cache<Uuid, Arc<AlbumPolicy>>,
}

impl AlbumCache {
    #[must_use]
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            inner: Cache::builder()
                .time_to_live(Duration::from_millis(ttl_ms))
                .build(),
        }
    }

    /// On miss, a single DB read fills the entry (spec §4.4).
    pub async fn get_or_load(
        &self,
        db: &dyn DatabaseAdapter,
        album_id: Uuid,
    ) -> Result<Arc<AlbumPolicy>, CoreError> {
        if let Some(hit) = self.inner.get(&album_id).await {
            return Ok(hit);
        }
        let model = albums::find_by_id(db, album_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("album".to_string()))?;
        let policy = Arc::new(AlbumPolicy::from(model));
        self.inner.insert(album_id, policy.clone()).await;
        Ok(policy)
    }

    pub async fn invalidate(&self, album_id: Uuid) {
        self.inner.invalidate(&album_id).await;
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
    }
}
