//! Webhook ingestion.
//!
//! By the time a request reaches this module the signature gate has already authenticated it, so
//! the job here is to classify the payload through the platform adapter, derive the deterministic
//! job id, and get the event durably queued as fast as possible. All heavy lifting (order
//! materialization, state transitions, outbound calls) is deferred to the pipeline workers.

use chrono::Utc;
use delivery_hub_engine::{
    db_types::{NewWebhookJob, PlatformCode},
    IntegrationDatabase,
};
use log::*;
use marketplace_tools::AdapterRegistry;
use rand::Rng;

use crate::{data_objects::WebhookAck, errors::ServerError};

/// Request metadata captured for the audit trail on each job row.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Classifies a verified webhook and enqueues it for asynchronous processing. Returns quickly so
/// the marketplace gets its 200 within the delivery timeout; any error here surfaces as a non-2xx
/// response, which makes the platform redeliver.
pub async fn enqueue_webhook<B: IntegrationDatabase>(
    code: PlatformCode,
    body: &[u8],
    meta: RequestMeta,
    registry: &AdapterRegistry<B>,
    db: &B,
) -> Result<WebhookAck, ServerError> {
    let adapter = registry.resolve_by_code(code).await?;
    let event = adapter.parse_webhook_payload(body).map_err(|e| {
        warn!("🪝️ Could not classify {code} webhook: {e}");
        ServerError::BackendError(format!("Could not classify webhook. {e}"))
    })?;
    let payload = String::from_utf8_lossy(body).into_owned();
    let correlation_id = new_correlation_id();
    let job = NewWebhookJob {
        job_id: NewWebhookJob::job_id_for(code, &event.external_order_id),
        platform_code: code,
        event_type: event.event_type.to_string(),
        external_order_id: event.external_order_id.clone(),
        payload,
        received_at: Utc::now(),
        client_ip: meta.client_ip,
        user_agent: meta.user_agent,
        correlation_id: correlation_id.clone(),
    };
    let queued = db.enqueue_job(job).await.map_err(ServerError::from)?;
    if queued {
        info!(
            "🪝️ Queued {} event for order {} on {code}. correlation_id={correlation_id}",
            event.event_type, event.external_order_id
        );
    } else {
        info!("🪝️ Redelivery of order {} on {code} absorbed by the queue", event.external_order_id);
    }
    Ok(WebhookAck { success: true, correlation_id, queued })
}

/// 16 hex characters, enough to make log greps unambiguous.
pub fn new_correlation_id() -> String {
    let mut rng = rand::thread_rng();
    (0..16).map(|_| format!("{:x}", rng.gen_range(0..16))).collect()
}
