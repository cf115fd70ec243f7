use dh_common::Money;
use serde::{Deserialize, Serialize};

/// Outcome of pushing one status change to a platform. Unmappable statuses come back as a failed result
/// rather than an error, so callers can report and move on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateResult {
    pub success: bool,
    /// The platform-vocabulary status that was (or would have been) sent.
    pub platform_status: Option<String>,
    pub error: Option<String>,
}

impl StatusUpdateResult {
    pub fn sent(platform_status: impl Into<String>) -> Self {
        Self { success: true, platform_status: Some(platform_status.into()), error: None }
    }

    pub fn failed(platform_status: Option<String>, error: impl Into<String>) -> Self {
        Self { success: false, platform_status, error: Some(error.into()) }
    }
}

/// Extra context riding along with a status push. Accepting an order carries the store's preparation-time
/// commitment; rejections and cancellations carry the reason shown to the customer. Statuses that take
/// neither just use the default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusUpdateDetail {
    pub prep_minutes: Option<i64>,
    pub reason: Option<String>,
}

impl StatusUpdateDetail {
    pub fn with_prep_minutes(minutes: i64) -> Self {
        Self { prep_minutes: Some(minutes), reason: None }
    }

    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self { prep_minutes: None, reason: Some(reason.into()) }
    }
}

/// One product entry in an outbound menu push, already priced for the channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuEntry {
    pub external_sku: String,
    pub name: String,
    pub category: String,
    pub price: Money,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuSyncFailure {
    pub external_sku: String,
    pub reason: String,
}

/// Result of a full menu push. Per-item failures are collected, never aborting the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuSyncResult {
    pub synced_products: usize,
    pub failed: Vec<MenuSyncFailure>,
}

/// An availability flip for one SKU on one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityUpdate {
    pub external_sku: String,
    pub available: bool,
}
