//! Queue consumer loops (spec §4.3: `worker(Q, handler, {concurrency})`).
//! The core has no push-style broker to subscribe through, so each consumer
//! is a poll loop over `JobQueue::claim` — the same claim/execute/ack shape
//! the teacher's `BackgroundWorker` impls (`GenerateThumbnailsWorker`,
//! `FindUnprocessedImagesWorker`) get for free from loco's sidekiq-backed
//! queue, generalized here to the `jobs` table in `queue::pg_queue` since
//! the spec's queue is a first-class component of the core rather than a
//! framework convenience.

use crate::cdn::purge::CdnPurger;
use crate::common::errors::CoreError;
use crate::common::settings::QueueSettings;
use crate::db::DatabaseAdapter;
use crate::pipeline::process_photo::{self, PipelineContext, ProcessPhotoJob};
use crate::pipeline::recovery::PROCESS_PHOTO_QUEUE;
use crate::queue::{Job, JobQueue};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const POLL_IDLE_MS: u64 = 500;
const LEASE_SECS: i64 = 300;
pub const CDN_PURGE_QUEUE: &str = "cdn-purge";

/// Spawns `settings.photo_concurrency` independent consumers of the
/// `process-photo` queue. Bounded concurrency here is the "upper bound on
/// *simultaneous* photo jobs" from spec §5; the queue's own `jobId =
/// photoId` dedup (not any lock these loops hold) is what keeps at most one
/// consumer working a given photo.
pub fn spawn_process_photo_workers(
    ctx: Arc<PipelineContext>,
    queue: Arc<dyn JobQueue>,
    settings: QueueSettings,
    shutdown: CancellationToken,
) -> Vec<JoinHandle<()>> {
    (0..settings.photo_concurrency.max(1))
        .map(|worker_idx| {
            let ctx = ctx.clone();
            let queue = queue.clone();
            let settings = settings.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(run_process_photo_loop(worker_idx, ctx, queue, settings, shutdown))
        })
        .collect()
}

async fn run_process_photo_loop(
    worker_idx: usize,
    ctx: Arc<PipelineContext>,
    queue: Arc<dyn JobQueue>,
    settings: QueueSettings,
    shutdown: CancellationToken,
) {
    loop {
        if shutdown.is_cancelled() {
            tracing::info!(worker_idx, "process-photo worker draining, stopping");
            return;
        }

        // Cancellation is only observed between claims, never mid-flight:
        // a job already claimed runs to completion (spec §5 "wait up to a
        // grace period for in-flight jobs"). Anything still running once the
        // grace period elapses is force-aborted by the caller's JoinHandle.
        let jobs = match queue.claim(PROCESS_PHOTO_QUEUE, 1, LEASE_SECS).await {
            Ok(jobs) => jobs,
            Err(err) => {
                tracing::warn!(worker_idx, error = %err, "process-photo claim failed");
                sleep_or_stop(POLL_IDLE_MS, &shutdown).await;
                continue;
            }
        };

        if jobs.is_empty() {
            sleep_or_stop(POLL_IDLE_MS, &shutdown).await;
            continue;
        }

        for job in jobs {
            match handle_one(&ctx, &job).await {
                Ok(()) => {
                    if let Err(err) = queue.complete(job.id).await {
                        tracing::warn!(error = %err, "failed to mark process-photo job complete");
                    }
                }
                Err(err) => {
                    tracing::warn!(job_id = %job.job_id, error = %err, "process-photo job failed, scheduling retry");
                    if let Err(err) = queue.fail(job.id, &err.to_string(), settings.backoff_base_ms).await {
                        tracing::warn!(error = %err, "failed to record process-photo failure");
                    }
                }
            }
        }
    }
}

async fn sleep_or_stop(idle_ms: u64, shutdown: &CancellationToken) {
    tokio::select! {
        () = tokio::time::sleep(Duration::from_millis(idle_ms)) => {}
        () = shutdown.cancelled() => {}
    }
}

async fn handle_one(ctx: &PipelineContext, job: &Job) -> Result<(), CoreError> {
    let photo_id = parse_uuid_field(&job.payload, "photo_id")?;
    let album_id = parse_uuid_field(&job.payload, "album_id")?;

    process_photo::run(
        ctx,
        &ProcessPhotoJob {
            photo_id,
            album_id,
            max_attempts: job.max_attempts,
        },
    )
    .await
}

fn parse_uuid_field(payload: &serde_json::Value, field: &str) -> Result<Uuid, CoreError> {
    payload
        .get(field)
        .and_then(serde_json::Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| CoreError::Validation(format!("job payload missing {field}")))
}

/// Best-effort CDN purge consumer (spec §4.7). Always acks the job whether
/// or not the purge itself succeeded: a CDN outage must never surface back
/// to the photo-deletion caller, and retrying purge indefinitely would just
/// be noise once it has been logged once.
pub fn spawn_cdn_purge_worker(
    purger: Arc<CdnPurger>,
    queue: Arc<dyn JobQueue>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if shutdown.is_cancelled() {
                tracing::info!("cdn-purge worker draining, stopping");
                return;
            }

            let jobs = match queue.claim(CDN_PURGE_QUEUE, 4, LEASE_SECS).await {
                Ok(jobs) => jobs,
                Err(err) => {
                    tracing::warn!(error = %err, "cdn-purge claim failed");
                    sleep_or_stop(POLL_IDLE_MS, &shutdown).await;
                    continue;
                }
            };

            if jobs.is_empty() {
                sleep_or_stop(POLL_IDLE_MS, &shutdown).await;
                continue;
            }

            for job in jobs {
                let urls: Vec<String> = job
                    .payload
                    .get("urls")
                    .and_then(serde_json::Value::as_array)
                    .map(|arr| {
                        arr.iter()
                            .filter_map(|v| v.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();

                let outcome = purger.purge(&urls).await;
                if !outcome.success {
                    tracing::warn!(
                        job_id = %job.job_id,
                        failed = ?outcome.failed_urls,
                        "cdn purge incomplete for deleted photo"
                    );
                }
                if let Err(err) = queue.complete(job.id).await {
                    tracing::warn!(error = %err, "failed to mark cdn-purge job complete");
                }
            }
        }
    })
}

/// Periodic crash-recovery sweep (spec §4.5 "on a periodic sweep"). Runs
/// independently of the per-photo workers above; `pipeline::recovery::sweep`
/// does the actual row scan and re-enqueue.
pub fn spawn_recovery_sweep(
    db: Arc<dyn DatabaseAdapter>,
    queue: Arc<dyn JobQueue>,
    horizon_ms: i64,
    interval_ms: u64,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = tokio::time::sleep(Duration::from_millis(interval_ms)) => {}
                () = shutdown.cancelled() => {
                    tracing::info!("recovery sweep stopping");
                    return;
                }
            }
            match crate::pipeline::recovery::sweep(db.as_ref(), queue.as_ref(), horizon_ms).await {
                Ok(0) => {}
                Ok(n) => tracing::info!(recovered = n, "recovery sweep requeued stuck photos"),
                Err(err) => tracing::warn!(error = %err, "recovery sweep failed"),
            }
        }
    })
}

/// Periodic queue-side visibility-timeout sweep (spec §4.3 "An active job
/// whose worker dies is rescheduled after a visibility timeout"). Distinct
/// from `spawn_recovery_sweep`: that one demotes *photos* stuck in
/// `processing`; this one demotes *jobs* stuck `active` past their lease, so
/// `jobId` dedup stops blocking the photo-side sweep's re-enqueue forever.
pub fn spawn_lease_reclaim_sweep(
    queue: Arc<dyn JobQueue>,
    interval_ms: u64,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = tokio::time::sleep(Duration::from_millis(interval_ms)) => {}
                () = shutdown.cancelled() => {
                    tracing::info!("lease reclaim sweep stopping");
                    return;
                }
            }
            match queue.reclaim_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::info!(reclaimed = n, "lease reclaim sweep requeued expired jobs"),
                Err(err) => tracing::warn!(error = %err, "lease reclaim sweep failed"),
            }
        }
    })
}
