use chrono::Duration;

use crate::{
    db_types::{NewWebhookJob, WebhookJob},
    traits::{IntegrationError, JobOutcome},
};

/// The durable webhook job queue.
///
/// Enqueueing is deduplicating: a job whose `job_id` already exists in a live state is acknowledged but not
/// inserted, which is what makes marketplace redelivery harmless at the queue layer. Claiming is atomic: a job
/// claimed by one worker is invisible to the others.
#[allow(async_fn_in_trait)]
pub trait JobQueue {
    /// Enqueue a job. Returns `true` if the job was inserted, `false` if an existing live job with the same
    /// `job_id` absorbed the redelivery.
    async fn enqueue_job(&self, job: NewWebhookJob) -> Result<bool, IntegrationError>;

    /// Atomically claims up to `limit` due jobs (queued, with `next_attempt_at` in the past) and marks them
    /// in-progress.
    async fn claim_due_jobs(&self, limit: i64) -> Result<Vec<WebhookJob>, IntegrationError>;

    /// Reports the outcome of a claimed job. Retries are re-queued with exponential backoff
    /// (`base * 2^attempts`), and dead-lettered once `max_attempts` is reached.
    async fn complete_job(
        &self,
        job_id: i64,
        outcome: JobOutcome,
        base_backoff: Duration,
        max_attempts: i64,
    ) -> Result<(), IntegrationError>;

    /// Number of jobs still waiting or in flight, for the health endpoint.
    async fn queue_depth(&self) -> Result<i64, IntegrationError>;

    /// Requeues jobs that have been in-progress for longer than `stale_after`. Covers workers that died
    /// mid-job; a timed-out job is retried per policy, never silently dropped.
    async fn requeue_stale_jobs(&self, stale_after: Duration) -> Result<u64, IntegrationError>;
}
