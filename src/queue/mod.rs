pub mod backoff;
pub mod pg_queue;

use crate::common::errors::CoreError;
use async_trait::async_trait;
use serde_json::Value as Json;

#[derive(Debug, Clone, Default)]
pub struct EnqueueOptions {
    pub job_id: Option<String>,
    pub delay_ms: Option<u64>,
    pub attempts: Option<i32>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QueueCounts {
    pub waiting: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
    pub delayed: u64,
}

/// A claimed unit of work. `complete`/`fail` report the outcome back to the
/// queue; dropping a `Job` without calling either leaves it locked until the
/// visibility timeout elapses, at which point it becomes reclaimable.
pub struct Job {
    pub id: uuid::Uuid,
    pub job_id: String,
    pub payload: Json,
    pub attempts: i32,
    pub max_attempts: i32,
}

/// The durable job queue contract (spec §4.3).
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// If `job_id` names a row already waiting/active/delayed in `queue`,
    /// the enqueue is ignored (spec's dedup primitive).
    async fn enqueue(
        &self,
        queue: &str,
        payload: Json,
        opts: EnqueueOptions,
    ) -> Result<(), CoreError>;

    /// Claims up to `limit` runnable jobs, marking them active with a
    /// visibility timeout. Workers call this in a poll loop rather than
    /// registering a push-style handler, since the core has no long-lived
    /// broker connection to subscribe through.
    async fn claim(&self, queue: &str, limit: u64, lease_secs: i64) -> Result<Vec<Job>, CoreError>;

    async fn complete(&self, job_id: uuid::Uuid) -> Result<(), CoreError>;

    /// Schedules a retry after `backoff(base, attempt)` unless attempts are
    /// exhausted, in which case the job moves to the dead-letter status
    /// (spec §4.3).
    async fn fail(&self, job_id: uuid::Uuid, error: &str, backoff_base_ms: u64) -> Result<(), CoreError>;

    async fn pause(&self, queue: &str) -> Result<(), CoreError>;

    async fn resume(&self, queue: &str) -> Result<(), CoreError>;

    async fn counts(&self, queue: &str) -> Result<QueueCounts, CoreError>;

    /// Demotes jobs whose lease (the `lease_secs` passed to `claim`) has
    /// expired back to waiting (the queue-side half of crash recovery; the
    /// pipeline-side half lives in `pipeline::recovery`). Meant to be polled
    /// on an interval shorter than the shortest lease in use.
    async fn reclaim_expired(&self) -> Result<u64, CoreError>;
}
