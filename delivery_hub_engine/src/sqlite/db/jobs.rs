use chrono::{Duration, Utc};
use log::{debug, warn};
use sqlx::SqliteConnection;

use crate::{
    db_types::{JobState, NewWebhookJob, WebhookJob},
    traits::{IntegrationError, JobOutcome},
};

/// Enqueues a webhook job. The UNIQUE constraint on `job_id` absorbs marketplace redeliveries while a job
/// for the order is still live (queued or in progress). Once that job has finished, a fresh webhook for the
/// same order requeues the id with the new payload, so later status events flow through the same key.
pub async fn enqueue(job: NewWebhookJob, conn: &mut SqliteConnection) -> Result<bool, IntegrationError> {
    let result = sqlx::query(
        r#"
            INSERT INTO webhook_jobs (
                job_id, platform_code, event_type, external_order_id, payload,
                received_at, client_ip, user_agent, correlation_id, next_attempt_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $6)
            ON CONFLICT (job_id) DO UPDATE SET
                event_type = excluded.event_type,
                payload = excluded.payload,
                received_at = excluded.received_at,
                client_ip = excluded.client_ip,
                user_agent = excluded.user_agent,
                correlation_id = excluded.correlation_id,
                state = 'queued',
                attempts = 0,
                next_attempt_at = excluded.next_attempt_at,
                last_error = NULL,
                updated_at = excluded.received_at
            WHERE webhook_jobs.state IN ('done', 'dead');
        "#,
    )
    .bind(&job.job_id)
    .bind(job.platform_code)
    .bind(&job.event_type)
    .bind(job.external_order_id.as_str())
    .bind(&job.payload)
    .bind(job.received_at)
    .bind(&job.client_ip)
    .bind(&job.user_agent)
    .bind(&job.correlation_id)
    .execute(conn)
    .await?;
    let inserted = result.rows_affected() == 1;
    if !inserted {
        debug!("📮️ Job {} already queued; redelivery absorbed", job.job_id);
    }
    Ok(inserted)
}

/// Atomically claims up to `limit` due jobs. The claim is a single UPDATE, so concurrent workers never see
/// the same job.
pub async fn claim_due(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<WebhookJob>, IntegrationError> {
    let now = Utc::now();
    let jobs = sqlx::query_as(
        r#"
            UPDATE webhook_jobs SET state = 'in_progress', updated_at = $1
            WHERE id IN (
                SELECT id FROM webhook_jobs
                WHERE state = 'queued' AND next_attempt_at <= $1
                ORDER BY next_attempt_at
                LIMIT $2
            )
            RETURNING *;
        "#,
    )
    .bind(now)
    .bind(limit)
    .fetch_all(conn)
    .await?;
    Ok(jobs)
}

pub async fn complete(
    job_id: i64,
    outcome: JobOutcome,
    base_backoff: Duration,
    max_attempts: i64,
    conn: &mut SqliteConnection,
) -> Result<(), IntegrationError> {
    let now = Utc::now();
    match outcome {
        JobOutcome::Done => {
            let result =
                sqlx::query("UPDATE webhook_jobs SET state = 'done', updated_at = $1, last_error = NULL WHERE id = $2")
                    .bind(now)
                    .bind(job_id)
                    .execute(conn)
                    .await?;
            if result.rows_affected() == 0 {
                return Err(IntegrationError::JobNotFound(job_id.to_string()));
            }
        },
        JobOutcome::Retry(error) => {
            let job: Option<WebhookJob> =
                sqlx::query_as("SELECT * FROM webhook_jobs WHERE id = $1").bind(job_id).fetch_optional(&mut *conn).await?;
            let job = job.ok_or_else(|| IntegrationError::JobNotFound(job_id.to_string()))?;
            let attempts = job.attempts + 1;
            if attempts >= max_attempts {
                warn!("📮️ Job {} exhausted its {max_attempts} attempts; dead-lettering. Last error: {error}", job.job_id);
                set_state(job_id, JobState::Dead, attempts, &error, &mut *conn).await?;
            } else {
                // Exponential backoff: base * 2^(attempts - 1), so the first retry waits one base interval.
                let backoff = base_backoff * 2_i32.pow((attempts - 1).min(16) as u32);
                let next = now + backoff;
                sqlx::query(
                    r#"
                        UPDATE webhook_jobs
                        SET state = 'queued', attempts = $1, next_attempt_at = $2, last_error = $3, updated_at = $4
                        WHERE id = $5;
                    "#,
                )
                .bind(attempts)
                .bind(next)
                .bind(&error)
                .bind(now)
                .bind(job_id)
                .execute(conn)
                .await?;
                debug!("📮️ Job {} scheduled for retry #{attempts} at {next}", job.job_id);
            }
        },
        JobOutcome::Dead(error) => {
            warn!("📮️ Job id {job_id} dead-lettered: {error}");
            let job: Option<WebhookJob> =
                sqlx::query_as("SELECT * FROM webhook_jobs WHERE id = $1").bind(job_id).fetch_optional(&mut *conn).await?;
            let job = job.ok_or_else(|| IntegrationError::JobNotFound(job_id.to_string()))?;
            set_state(job_id, JobState::Dead, job.attempts + 1, &error, conn).await?;
        },
    }
    Ok(())
}

async fn set_state(
    job_id: i64,
    state: JobState,
    attempts: i64,
    error: &str,
    conn: &mut SqliteConnection,
) -> Result<(), IntegrationError> {
    sqlx::query(
        "UPDATE webhook_jobs SET state = $1, attempts = $2, last_error = $3, updated_at = $4 WHERE id = $5",
    )
    .bind(state)
    .bind(attempts)
    .bind(error)
    .bind(Utc::now())
    .bind(job_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn queue_depth(conn: &mut SqliteConnection) -> Result<i64, IntegrationError> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM webhook_jobs WHERE state IN ('queued', 'in_progress')")
            .fetch_one(conn)
            .await?;
    Ok(count)
}

/// Returns jobs claimed by workers that never reported back to the queue. A job that times out is requeued
/// per the retry policy, not silently dropped.
pub async fn requeue_stale(stale_after: Duration, conn: &mut SqliteConnection) -> Result<u64, IntegrationError> {
    let cutoff = Utc::now() - stale_after;
    let result = sqlx::query(
        "UPDATE webhook_jobs SET state = 'queued', updated_at = $1 WHERE state = 'in_progress' AND updated_at < $2",
    )
    .bind(Utc::now())
    .bind(cutoff)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
