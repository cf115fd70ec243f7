use chrono::{DateTime, Utc};
use delivery_hub_engine::db_types::{InternalStatus, Order, OrderStatus};
use serde::{Deserialize, Serialize};

/// Acknowledgement returned to the marketplace once a webhook has been durably queued. The
/// correlation id is what to quote when chasing a delivery through the logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub success: bool,
    pub correlation_id: String,
    /// False when the queue already held a job for this order event.
    pub queued: bool,
}

/// Staff request to move an order to a new state, in the internal vocabulary. Confirming carries the
/// preparation-time commitment to pass on to the marketplace; declining or voiding can carry a reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeRequest {
    pub status: InternalStatus,
    #[serde(default)]
    pub prep_minutes: Option<i64>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeResponse {
    pub order: OrderSummary,
    pub previous_status: OrderStatus,
    /// Whether the marketplace accepted the mirrored status, when the platform supports it.
    pub platform_notified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: i64,
    pub external_id: String,
    pub platform_id: i64,
    pub display_number: String,
    pub status: OrderStatus,
    pub internal_status: InternalStatus,
    pub customer_name: String,
    pub total: i64,
    pub placed_at: DateTime<Utc>,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            external_id: order.external_id.as_str().to_string(),
            platform_id: order.platform_id,
            display_number: order.display_number.clone(),
            status: order.status,
            internal_status: InternalStatus::from_canonical(order.status),
            customer_name: order.customer_name.clone(),
            total: order.total.value(),
            placed_at: order.placed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub queue_depth: i64,
    /// Platform codes the build ships an adapter for.
    pub adapters: Vec<String>,
}
