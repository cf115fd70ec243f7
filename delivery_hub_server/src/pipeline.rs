//! The asynchronous webhook processing pipeline.
//!
//! Ingestion only queues; this module is where queued webhooks actually become orders. A small
//! pool of workers polls the job queue on an interval, re-parses each claimed payload through its
//! platform adapter, and feeds the canonical event to [`OrderFlowApi::process_webhook_event`].
//! Outcomes are reported back to the queue, which owns the retry/backoff/dead-letter policy.
//!
//! A separate sweeper task requeues jobs whose worker died mid-flight, so a crash never loses a
//! webhook.

use std::{sync::Arc, time::Duration};

use delivery_hub_engine::{
    db_types::WebhookJob,
    traits::{IntegrationError, JobOutcome, JobQueue},
    OrderFlowApi,
    SqliteDatabase,
    WebhookOutcome,
};
use log::*;
use marketplace_tools::{AdapterRegistry, RegistryError};
use tokio::task::JoinHandle;

use crate::config::ServerConfig;

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub workers: usize,
    pub poll_interval: Duration,
    /// Jobs claimed per worker per tick.
    pub batch_size: i64,
    pub max_attempts: i64,
    pub retry_base: chrono::Duration,
    /// How long a claimed job may sit in-progress before the sweeper assumes its worker died.
    pub stale_after: chrono::Duration,
}

impl PipelineConfig {
    pub fn from_server_config(config: &ServerConfig) -> Self {
        Self {
            workers: config.pipeline_workers.max(1),
            poll_interval: Duration::from_secs(1),
            batch_size: 10,
            max_attempts: config.job_max_attempts,
            retry_base: chrono::Duration::seconds(config.job_retry_base_secs),
            stale_after: chrono::Duration::minutes(5),
        }
    }
}

/// Spawns the worker pool and the stale-job sweeper. The returned handles run for the life of the
/// server.
pub fn start_pipeline(
    db: SqliteDatabase,
    registry: Arc<AdapterRegistry<SqliteDatabase>>,
    order_flow: Arc<OrderFlowApi<SqliteDatabase>>,
    config: PipelineConfig,
) -> Vec<JoinHandle<()>> {
    info!("🔄️📦️ Starting webhook pipeline with {} worker(s)", config.workers);
    let mut handles = Vec::with_capacity(config.workers + 1);
    for worker_id in 0..config.workers {
        let db = db.clone();
        let registry = Arc::clone(&registry);
        let order_flow = Arc::clone(&order_flow);
        let config = config.clone();
        handles.push(tokio::spawn(async move {
            worker_loop(worker_id, db, registry, order_flow, config).await;
        }));
    }
    let sweeper_db = db.clone();
    let stale_after = config.stale_after;
    handles.push(tokio::spawn(async move {
        sweeper_loop(sweeper_db, stale_after).await;
    }));
    handles
}

async fn worker_loop(
    worker_id: usize,
    db: SqliteDatabase,
    registry: Arc<AdapterRegistry<SqliteDatabase>>,
    order_flow: Arc<OrderFlowApi<SqliteDatabase>>,
    config: PipelineConfig,
) {
    let mut ticker = tokio::time::interval(config.poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let jobs = match db.claim_due_jobs(config.batch_size).await {
            Ok(jobs) => jobs,
            Err(e) => {
                error!("🔄️📦️ Worker {worker_id} could not claim jobs: {e}");
                continue;
            },
        };
        for job in jobs {
            let job_row_id = job.id;
            let correlation_id = job.correlation_id.clone();
            let outcome = process_job(&job, &registry, &order_flow).await;
            if let JobOutcome::Retry(reason) | JobOutcome::Dead(reason) = &outcome {
                warn!(
                    "🔄️📦️ Job {} did not complete: {reason}. correlation_id={correlation_id}",
                    job.job_id
                );
            }
            if let Err(e) = db.complete_job(job_row_id, outcome, config.retry_base, config.max_attempts).await {
                error!("🔄️📦️ Worker {worker_id} could not record the outcome of job {job_row_id}: {e}");
            }
        }
    }
}

/// Runs one claimed job end to end and classifies the result for the queue.
///
/// Permanent conditions (malformed payloads, illegal transitions, corrupt rows) are dead-lettered
/// at once. Transient conditions (storage errors, an order whose new-order event has not landed
/// yet) are retried with backoff. Events that carry nothing actionable complete the job with a
/// warning already logged downstream.
async fn process_job(
    job: &WebhookJob,
    registry: &AdapterRegistry<SqliteDatabase>,
    order_flow: &OrderFlowApi<SqliteDatabase>,
) -> JobOutcome {
    let adapter = match registry.resolve_by_code(job.platform_code).await {
        Ok(adapter) => adapter,
        Err(e @ RegistryError::NoAdapterImplemented(_)) => return JobOutcome::Dead(e.to_string()),
        Err(e) => return JobOutcome::Retry(e.to_string()),
    };
    let event = match adapter.parse_webhook_payload(job.payload.as_bytes()) {
        Ok(event) => event,
        Err(e) => return JobOutcome::Dead(format!("Payload does not parse: {e}")),
    };
    match order_flow.process_webhook_event(&event).await {
        Ok(WebhookOutcome::Created(order)) => {
            debug!("🔄️📦️ Job {} created order #{}", job.job_id, order.id);
            JobOutcome::Done
        },
        Ok(WebhookOutcome::Transitioned(change)) => {
            debug!("🔄️📦️ Job {} moved order #{} to {}", job.job_id, change.order.id, change.order.status);
            JobOutcome::Done
        },
        Ok(WebhookOutcome::Duplicate(_)) | Ok(WebhookOutcome::Ignored(_)) => JobOutcome::Done,
        Err(e @ IntegrationError::InvalidStateTransition { .. }) => JobOutcome::Dead(e.to_string()),
        Err(e @ IntegrationError::CorruptRecord(_)) => JobOutcome::Dead(e.to_string()),
        // A status update can outrun its new-order event; give the order a chance to land.
        Err(e @ IntegrationError::OrderNotFound { .. }) => JobOutcome::Retry(e.to_string()),
        Err(e) => JobOutcome::Retry(e.to_string()),
    }
}

async fn sweeper_loop(db: SqliteDatabase, stale_after: chrono::Duration) {
    let sweep_every = Duration::from_secs((stale_after.num_seconds().max(2) as u64) / 2);
    let mut ticker = tokio::time::interval(sweep_every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match db.requeue_stale_jobs(stale_after).await {
            Ok(0) => {},
            Ok(n) => warn!("🔄️📦️ Requeued {n} stale job(s) abandoned by dead workers"),
            Err(e) => error!("🔄️📦️ Stale job sweep failed: {e}"),
        }
    }
}
