use super::{backoff, EnqueueOptions, Job, JobQueue, QueueCounts};
use crate::common::errors::CoreError;
use crate::db::filter::{Direction, Filter, Op, OrderBy};
use crate::db::DatabaseAdapter;
use crate::models::_entities::jobs::Model;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value as Json};
use std::sync::Arc;
use uuid::Uuid;

const TABLE: &str = "jobs";

const STATUS_WAITING: &str = "waiting";
const STATUS_ACTIVE: &str = "active";
const STATUS_COMPLETED: &str = "completed";
const STATUS_DEAD_LETTER: &str = "dead_letter";
const STATUS_PAUSED: &str = "paused";

const DEFAULT_MAX_ATTEMPTS: i32 = 5;

/// Postgres-backed durable queue (spec §4.3), built on the `jobs` table
/// rather than a KV-plus-sorted-set pair: the core already keeps a
/// relational store on the hot path (C2), so a second storage system for
/// queueing would duplicate an operational dependency for no gain. `jobId`
/// dedup and visibility-timeout reclaim are both expressed as conditional
/// UPDATEs through the same `DatabaseAdapter` the rest of the core's models
/// use — the same primitive `models::photos::claim_for_processing` uses for
/// the photo state machine.
pub struct PgJobQueue {
    db: Arc<dyn DatabaseAdapter>,
}

impl PgJobQueue {
    #[must_use]
    pub fn new(db: Arc<dyn DatabaseAdapter>) -> Self {
        Self { db }
    }

    async fn find_by_id(&self, job_id: Uuid) -> Result<Option<Model>, CoreError> {
        match self
            .db
            .find_one(TABLE, &[Filter::new("id", Op::Eq, json!(job_id))])
            .await?
        {
            Some(row) => Ok(Some(crate::db::from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Conditional UPDATE: only succeeds if the row is still `waiting` at
    /// the moment of the claim, closing the race between two pollers that
    /// selected the same candidate (mirrors
    /// `models::photos::claim_for_processing`). A single `UPDATE ... WHERE
    /// status = 'waiting'` is already atomic, so no surrounding transaction
    /// is needed.
    async fn try_claim_one(&self, candidate: &Model, lease_secs: i64) -> Result<Option<Model>, CoreError> {
        let patch = json!({
            "status": STATUS_ACTIVE,
            "attempts": candidate.attempts + 1,
            "locked_at": Utc::now(),
            "locked_by": format!("{}", std::process::id()),
            "lease_expires_at": Utc::now() + chrono::Duration::seconds(lease_secs),
        });
        let updated = self
            .db
            .update(
                TABLE,
                &[
                    Filter::new("id", Op::Eq, json!(candidate.id)),
                    Filter::new("status", Op::Eq, json!(STATUS_WAITING)),
                ],
                patch,
            )
            .await?;
        if updated == 0 {
            return Ok(None);
        }
        self.find_by_id(candidate.id).await
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(
        &self,
        queue: &str,
        payload: Json,
        opts: EnqueueOptions,
    ) -> Result<(), CoreError> {
        let job_id = opts.job_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let run_at = Utc::now()
            + chrono::Duration::milliseconds(i64::try_from(opts.delay_ms.unwrap_or(0)).unwrap_or(0));

        // Dedup primitive: ignore the enqueue if a non-terminal row for this
        // (queue, jobId) already exists (spec §4.3). Two racing enqueues of
        // the same jobId can both pass this check before either inserts —
        // an accepted gap, the same class as the Supabase adapter's
        // non-atomic upsert (no unique constraint backs this check).
        let existing = self
            .db
            .find_one(
                TABLE,
                &[
                    Filter::new("queue", Op::Eq, json!(queue)),
                    Filter::new("job_id", Op::Eq, json!(job_id)),
                    Filter::new("status", Op::In, json!([STATUS_WAITING, STATUS_ACTIVE])),
                ],
            )
            .await?;
        if existing.is_some() {
            return Ok(());
        }

        let row = json!({
            "id": Uuid::new_v4(),
            "queue": queue,
            "job_id": job_id,
            "payload": payload,
            "status": STATUS_WAITING,
            "attempts": 0,
            "max_attempts": opts.attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            "run_at": run_at,
        });
        self.db.insert(TABLE, row).await?;
        Ok(())
    }

    async fn claim(&self, queue: &str, limit: u64, lease_secs: i64) -> Result<Vec<Job>, CoreError> {
        let now = Utc::now();
        let rows = self
            .db
            .find_many(
                TABLE,
                &[
                    Filter::new("queue", Op::Eq, json!(queue)),
                    Filter::new("status", Op::Eq, json!(STATUS_WAITING)),
                    Filter::new("run_at", Op::Le, json!(now)),
                ],
                &[OrderBy {
                    column: "run_at".to_string(),
                    direction: Direction::Asc,
                }],
                Some(limit),
            )
            .await?;
        let candidates: Vec<Model> = rows
            .into_iter()
            .map(crate::db::from_row)
            .collect::<Result<_, _>>()?;

        let mut claimed = Vec::with_capacity(candidates.len());
        for row in &candidates {
            if let Some(model) = self.try_claim_one(row, lease_secs).await? {
                claimed.push(Job {
                    id: model.id,
                    job_id: model.job_id,
                    payload: model.payload,
                    attempts: model.attempts,
                    max_attempts: model.max_attempts,
                });
            }
        }
        Ok(claimed)
    }

    async fn complete(&self, job_id: Uuid) -> Result<(), CoreError> {
        let patch = json!({
            "status": STATUS_COMPLETED,
            "locked_at": Json::Null,
            "locked_by": Json::Null,
            "lease_expires_at": Json::Null,
        });
        self.db
            .update(TABLE, &[Filter::new("id", Op::Eq, json!(job_id))], patch)
            .await?;
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str, backoff_base_ms: u64) -> Result<(), CoreError> {
        let Some(existing) = self.find_by_id(job_id).await? else {
            return Ok(());
        };
        let attempt = existing.attempts;
        let exhausted = attempt >= existing.max_attempts;

        let patch = if exhausted {
            json!({
                "status": STATUS_DEAD_LETTER,
                "last_error": error,
                "locked_at": Json::Null,
                "locked_by": Json::Null,
                "lease_expires_at": Json::Null,
            })
        } else {
            let delay_ms = backoff::compute_delay_ms(backoff_base_ms, attempt.max(0) as u32, 60_000);
            let run_at = Utc::now() + chrono::Duration::milliseconds(delay_ms as i64);
            json!({
                "status": STATUS_WAITING,
                "last_error": error,
                "locked_at": Json::Null,
                "locked_by": Json::Null,
                "lease_expires_at": Json::Null,
                "run_at": run_at,
            })
        };
        self.db
            .update(TABLE, &[Filter::new("id", Op::Eq, json!(job_id))], patch)
            .await?;
        Ok(())
    }

    async fn pause(&self, queue: &str) -> Result<(), CoreError> {
        self.db
            .update(
                TABLE,
                &[
                    Filter::new("queue", Op::Eq, json!(queue)),
                    Filter::new("status", Op::Eq, json!(STATUS_WAITING)),
                ],
                json!({ "status": STATUS_PAUSED }),
            )
            .await?;
        Ok(())
    }

    async fn resume(&self, queue: &str) -> Result<(), CoreError> {
        self.db
            .update(
                TABLE,
                &[
                    Filter::new("queue", Op::Eq, json!(queue)),
                    Filter::new("status", Op::Eq, json!(STATUS_PAUSED)),
                ],
                json!({ "status": STATUS_WAITING }),
            )
            .await?;
        Ok(())
    }

    async fn counts(&self, queue: &str) -> Result<QueueCounts, CoreError> {
        let now = Utc::now();
        let mut counts = QueueCounts::default();
        counts.waiting = self
            .db
            .count(
                TABLE,
                &[
                    Filter::new("queue", Op::Eq, json!(queue)),
                    Filter::new("status", Op::Eq, json!(STATUS_WAITING)),
                    Filter::new("run_at", Op::Le, json!(now)),
                ],
            )
            .await?;
        counts.delayed = self
            .db
            .count(
                TABLE,
                &[
                    Filter::new("queue", Op::Eq, json!(queue)),
                    Filter::new("status", Op::Eq, json!(STATUS_WAITING)),
                    Filter::new("run_at", Op::Gt, json!(now)),
                ],
            )
            .await?;
        counts.active = self
            .db
            .count(
                TABLE,
                &[
                    Filter::new("queue", Op::Eq, json!(queue)),
                    Filter::new("status", Op::Eq, json!(STATUS_ACTIVE)),
                ],
            )
            .await?;
        counts.completed = self
            .db
            .count(
                TABLE,
                &[
                    Filter::new("queue", Op::Eq, json!(queue)),
                    Filter::new("status", Op::Eq, json!(STATUS_COMPLETED)),
                ],
            )
            .await?;
        counts.failed = self
            .db
            .count(
                TABLE,
                &[
                    Filter::new("queue", Op::Eq, json!(queue)),
                    Filter::new("status", Op::Eq, json!(STATUS_DEAD_LETTER)),
                ],
            )
            .await?;
        Ok(counts)
    }

    async fn reclaim_expired(&self) -> Result<u64, CoreError> {
        let now = Utc::now();
        let patch = json!({
            "status": STATUS_WAITING,
            "locked_at": Json::Null,
            "locked_by": Json::Null,
            "lease_expires_at": Json::Null,
        });
        self.db
            .update(
                TABLE,
                &[
                    Filter::new("status", Op::Eq, json!(STATUS_ACTIVE)),
                    Filter::new("lease_expires_at", Op::Lt, json!(now)),
                ],
                patch,
            )
            .await
    }
}
