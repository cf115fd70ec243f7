use async_trait::async_trait;
use delivery_hub_engine::{
    canonical::CanonicalWebhookEvent,
    db_types::{Order, OrderStatus, PlatformCode},
};

use crate::{
    data_objects::{AvailabilityUpdate, MenuEntry, MenuSyncResult, StatusUpdateDetail, StatusUpdateResult},
    AdapterError,
};

/// Everything the hub needs from one marketplace, inbound and outbound.
///
/// The trait is object-safe; the registry hands out `Arc<dyn MarketplaceAdapter>` so the gate, the pipeline
/// and the sync services all work against the same instance per platform.
#[async_trait]
pub trait MarketplaceAdapter: Send + Sync {
    fn platform_code(&self) -> PlatformCode;

    /// The request header this platform carries its webhook signature in.
    fn signature_header(&self) -> &'static str;

    /// Verifies the signature over the exact raw body bytes, in constant time. Returns false rather than
    /// erroring: any failure here is a 401, regardless of cause.
    fn validate_webhook_signature(&self, signature: &str, raw_body: &[u8]) -> bool;

    /// Classifies and normalizes a verified webhook payload into a canonical event.
    fn parse_webhook_payload(&self, raw_body: &[u8]) -> Result<CanonicalWebhookEvent, AdapterError>;

    /// Pushes a canonical status change to the platform. `detail` carries the preparation-time commitment on
    /// an accept and the reason on a reject or cancel. An unmapped status produces a failed
    /// [`StatusUpdateResult`], not an `Err`; transport errors are `Err` so the caller can retry.
    async fn update_order_status(
        &self,
        order: &Order,
        status: OrderStatus,
        detail: &StatusUpdateDetail,
    ) -> Result<StatusUpdateResult, AdapterError>;

    /// Replaces the platform's menu with the given entries.
    async fn push_menu(&self, entries: &[MenuEntry]) -> Result<MenuSyncResult, AdapterError>;

    /// Flips availability for one SKU on the platform.
    async fn update_product_availability(&self, update: &AvailabilityUpdate) -> Result<(), AdapterError>;
}
