pub use super::_entities::photos::{ActiveModel, Column, Entity, Model};
use crate::common::errors::CoreError;
use crate::db::filter::{Filter, Op};
use crate::db::{from_row, DatabaseAdapter};
use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait};
use serde_json::{json, Value as Json};
use uuid::Uuid;

const TABLE: &str = "photos";

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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl PhotoStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PhotoStatus::Pending => "pending",
            PhotoStatus::Processing => "processing",
            PhotoStatus::Completed => "completed",
            PhotoStatus::Failed => "failed",
        }
    }
}

pub struct CompletedDerivatives {
    pub thumb_key: String,
    pub preview_key: String,
    pub variant_keys: Option<Json>,
    pub width: i32,
    pub height: i32,
    pub rotation: i32,
    pub captured_at: Option<chrono::DateTime<Utc>>,
}

fn find_by_id_filter(photo_id: Uuid) -> Vec<Filter> {
    vec![Filter::new("id", Op::Eq, json!(photo_id))]
}

async fn load(db: &dyn DatabaseAdapter, photo_id: Uuid) -> Result<Option<Model>, CoreError> {
    match db.find_one(TABLE, &find_by_id_filter(photo_id)).await? {
        Some(row) => Ok(Some(from_row(row)?)),
        None => Ok(None),
    }
}

async fn load_required(db: &dyn DatabaseAdapter, photo_id: Uuid) -> Result<Model, CoreError> {
    load(db, photo_id)
        .await?
        .ok_or_else(|| CoreError::NotFound("photo".to_string()))
}

/// Step 1 of the per-job procedure (spec §4.5): the conditional UPDATE that
/// is the sole synchronization primitive for "one processor per photo".
/// Transitions `pending|failed|completed -> processing`, bumping `attempts`
/// and stamping `processing_started_at`, but only if the row is not
/// soft-deleted and still carries the status this call observed before
/// issuing the update. A single `UPDATE ... WHERE status = <prior>` is
/// already atomic at the SQL layer, so no surrounding transaction is
/// needed to close the race between two claimants — `rows_affected == 0`
/// means the row moved out from under us and the caller must drop the job.
pub async fn claim_for_processing(
    db: &dyn DatabaseAdapter,
    photo_id: Uuid,
) -> Result<Option<Model>, CoreError> {
    let Some(existing) = load(db, photo_id).await? else {
        return Ok(None);
    };
    if existing.deleted_at.is_some() {
        return Ok(None);
    }
    if !matches!(existing.status.as_str(), "pending" | "failed" | "completed") {
        return Ok(None);
    }

    let patch = json!({
        "status": PhotoStatus::Processing.as_str(),
        "attempts": existing.attempts + 1,
        "processing_started_at": Utc::now(),
        "error_message": Json::Null,
    });
    let filters = vec![
        Filter::new("id", Op::Eq, json!(photo_id)),
        Filter::new("status", Op::Eq, json!(existing.status)),
        Filter::new("deleted_at", Op::Eq, Json::Null),
    ];
    let updated = db.update(TABLE, &filters, patch).await?;
    if updated == 0 {
        return Ok(None);
    }
    load(db, photo_id).await
}

/// Step 6, the linearization point: single DB update that makes the photo
/// visible to readers. Applied even if the album was soft-deleted mid-run
/// (spec B3) — the row simply stays hidden behind its own or its album's
/// tombstone.
pub async fn commit_completed(
    db: &dyn DatabaseAdapter,
    photo_id: Uuid,
    derivatives: CompletedDerivatives,
) -> Result<Model, CoreError> {
    let patch = json!({
        "status": PhotoStatus::Completed.as_str(),
        "thumb_key": derivatives.thumb_key,
        "preview_key": derivatives.preview_key,
        "variant_keys": derivatives.variant_keys,
        "width": derivatives.width,
        "height": derivatives.height,
        "rotation": derivatives.rotation,
        "captured_at": derivatives.captured_at,
        "error_message": Json::Null,
    });
    db.update(TABLE, &find_by_id_filter(photo_id), patch).await?;
    load_required(db, photo_id).await
}

/// Terminal failure path (original missing, decode exhausted retries, ...).
pub async fn commit_failed(
    db: &dyn DatabaseAdapter,
    photo_id: Uuid,
    error_message: &str,
) -> Result<Model, CoreError> {
    let patch = json!({
        "status": PhotoStatus::Failed.as_str(),
        "error_message": error_message,
    });
    db.update(TABLE, &find_by_id_filter(photo_id), patch).await?;
    load_required(db, photo_id).await
}

/// Requeues a transient failure back to `pending`; the job queue is
/// responsible for the actual backoff delay (spec §4.5 retry table).
pub async fn requeue_pending(
    db: &dyn DatabaseAdapter,
    photo_id: Uuid,
    error_message: &str,
) -> Result<Model, CoreError> {
    let patch = json!({
        "status": PhotoStatus::Pending.as_str(),
        "error_message": error_message,
    });
    db.update(TABLE, &find_by_id_filter(photo_id), patch).await?;
    load_required(db, photo_id).await
}

/// Administrative "reprocess": drops a terminal row back into `processing`
/// with `attempts` reset (spec §4.5 state diagram).
pub async fn reprocess(db: &dyn DatabaseAdapter, photo_id: Uuid) -> Result<Model, CoreError> {
    let patch = json!({
        "status": PhotoStatus::Processing.as_str(),
        "attempts": 1,
        "error_message": Json::Null,
        "processing_started_at": Utc::now(),
    });
    db.update(TABLE, &find_by_id_filter(photo_id), patch).await?;
    load_required(db, photo_id).await
}

/// Tombstones a photo (spec §3 "Tombstone"): sets `deleted_at`, hiding it
/// from all reads and from `photo_count` reconciliation. Does not touch
/// storage — orphaned derivatives are tolerated (spec §6.1) and the CDN
/// purge of their URLs is the caller's job (`cdn::purge`), since a CDN
/// failure must never block or unwind the tombstone (spec §4.7, S6).
pub async fn soft_delete(db: &dyn DatabaseAdapter, photo_id: Uuid) -> Result<Model, CoreError> {
    load_required(db, photo_id).await?;
    let patch = json!({ "deleted_at": Utc::now() });
    db.update(TABLE, &find_by_id_filter(photo_id), patch).await?;
    load_required(db, photo_id).await
}

/// Crash recovery (spec §4.5): rows stuck in `processing` whose start
/// timestamp predates the recovery horizon are demoted back to `pending` so
/// they can be re-enqueued (the queue's `jobId` dedup makes the re-enqueue
/// a safe no-op if the original attempt is somehow still alive).
pub async fn find_stuck_processing(
    db: &dyn DatabaseAdapter,
    horizon: chrono::DateTime<Utc>,
) -> Result<Vec<Model>, CoreError> {
    let filters = vec![
        Filter::new("status", Op::Eq, json!(PhotoStatus::Processing.as_str())),
        Filter::new("processing_started_at", Op::Lt, json!(horizon)),
    ];
    db.find_many(TABLE, &filters, &[], None)
        .await?
        .into_iter()
        .map(from_row)
        .collect()
}
