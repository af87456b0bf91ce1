//! Crash recovery sweep (spec §4.5 / §9 OQ4): demotes photos stuck in
//! `processing` past the configured horizon back to `pending` and
//! re-enqueues them. Runs on a timer from `initializers::core_initializer`,
//! independently of `queue::JobQueue::reclaim_expired` (that half recovers
//! lost queue leases; this half recovers the photo row itself, which can be
//! orphaned by a worker crash between claim and its own job-queue lease).

use crate::common::errors::CoreError;
use crate::db::DatabaseAdapter;
use crate::models::photos;
use crate::queue::{EnqueueOptions, JobQueue};
use serde_json::json;

/// Queue name the process-photo worker polls; shared with whatever enqueues
/// the initial job on ingest.
pub const PROCESS_PHOTO_QUEUE: &str = "process-photo";

/// Sweeps once. Returns the number of photos requeued.
pub async fn sweep(
    db: &dyn DatabaseAdapter,
    queue: &dyn JobQueue,
    horizon_ms: i64,
) -> Result<usize, CoreError> {
    let horizon = chrono::Utc::now() - chrono::Duration::milliseconds(horizon_ms);
    let stuck = photos::find_stuck_processing(db, horizon).await?;

    for photo in &stuck {
        photos::requeue_pending(db, photo.id, "recovered from stuck processing").await?;
        // `jobId = photoId` makes this a safe no-op if the original attempt
        // is somehow still alive and holding its own queue lease.
        queue
            .enqueue(
                PROCESS_PHOTO_QUEUE,
                json!({ "photo_id": photo.id, "album_id": photo.album_id }),
                EnqueueOptions {
                    job_id: Some(photo.id.to_string()),
                    ..Default::default()
                },
            )
            .await?;
    }

    Ok(stuck.len())
}

#[cfg(test)]
mod tests {
    // Sweep behavior is exercised against a real database in the crate's
    // integration tests (`tests/pipeline/recovery.rs`), since it needs rows
    // actually stuck in `processing`.
}
