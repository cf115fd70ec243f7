use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use dh_common::{Money, Secret};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------    PlatformCode     ---------------------------------------------------------
/// The closed set of marketplaces this hub integrates with. Inbound requests carry a platform code as a path
/// segment; parsing it through this enum is what keeps user input from becoming an arbitrary lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PlatformCode {
    Rappi,
    PedidosYa,
}

impl PlatformCode {
    pub const ALL: [PlatformCode; 2] = [PlatformCode::Rappi, PlatformCode::PedidosYa];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformCode::Rappi => "rappi",
            PlatformCode::PedidosYa => "pedidosya",
        }
    }
}

impl Display for PlatformCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformCode {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rappi" => Ok(Self::Rappi),
            "pedidosya" | "pedidos_ya" => Ok(Self::PedidosYa),
            other => Err(ConversionError(format!("Unknown platform code: {other}"))),
        }
    }
}

//--------------------------------------     OrderStatus     ---------------------------------------------------------
/// The canonical order status. Every marketplace vocabulary maps into this enum on the way in, and out of it on
/// the way back. The legal transitions between these statuses live in [`crate::lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// The order has arrived from the marketplace and has not been acknowledged yet.
    New,
    /// The store has accepted the order and committed to a preparation time.
    Accepted,
    /// The kitchen is working on the order.
    InPreparation,
    /// The order is ready for collection by the customer or a courier.
    Ready,
    /// A courier or the customer has collected the order.
    PickedUp,
    /// The courier is on the way to the customer.
    OnRoute,
    /// The order reached the customer. Terminal.
    Delivered,
    /// The order was cancelled. Terminal.
    Cancelled,
    /// The store declined the order.
    Rejected,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::New => "NEW",
            OrderStatus::Accepted => "ACCEPTED",
            OrderStatus::InPreparation => "IN_PREPARATION",
            OrderStatus::Ready => "READY",
            OrderStatus::PickedUp => "PICKED_UP",
            OrderStatus::OnRoute => "ON_ROUTE",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Rejected => "REJECTED",
        };
        f.write_str(s)
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "ACCEPTED" => Ok(Self::Accepted),
            "IN_PREPARATION" => Ok(Self::InPreparation),
            "READY" => Ok(Self::Ready),
            "PICKED_UP" => Ok(Self::PickedUp),
            "ON_ROUTE" => Ok(Self::OnRoute),
            "DELIVERED" => Ok(Self::Delivered),
            "CANCELLED" => Ok(Self::Cancelled),
            "REJECTED" => Ok(Self::Rejected),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            log::error!("Invalid order status in database: {value}. Defaulting to New");
            OrderStatus::New
        })
    }
}

//--------------------------------------   InternalStatus    ---------------------------------------------------------
/// The staff-facing status vocabulary used by the internal order store. It is deliberately mapped to and from
/// [`OrderStatus`] through its own table, independent of any platform mapping, because the two vocabularies
/// diverge (e.g. staff see "in kitchen", platforms see "IN_PREPARATION").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum InternalStatus {
    Pending,
    Confirmed,
    InKitchen,
    ReadyForPickup,
    OutForDelivery,
    Completed,
    Voided,
    Declined,
}

impl InternalStatus {
    /// Internal-to-canonical translation table. Total: every internal status has a canonical counterpart.
    pub fn to_canonical(self) -> OrderStatus {
        match self {
            InternalStatus::Pending => OrderStatus::New,
            InternalStatus::Confirmed => OrderStatus::Accepted,
            InternalStatus::InKitchen => OrderStatus::InPreparation,
            InternalStatus::ReadyForPickup => OrderStatus::Ready,
            InternalStatus::OutForDelivery => OrderStatus::OnRoute,
            InternalStatus::Completed => OrderStatus::Delivered,
            InternalStatus::Voided => OrderStatus::Cancelled,
            InternalStatus::Declined => OrderStatus::Rejected,
        }
    }

    /// Canonical-to-internal translation. `PickedUp` has no dedicated internal state; staff UIs show it as
    /// out-for-delivery.
    pub fn from_canonical(status: OrderStatus) -> Self {
        match status {
            OrderStatus::New => InternalStatus::Pending,
            OrderStatus::Accepted => InternalStatus::Confirmed,
            OrderStatus::InPreparation => InternalStatus::InKitchen,
            OrderStatus::Ready => InternalStatus::ReadyForPickup,
            OrderStatus::PickedUp | OrderStatus::OnRoute => InternalStatus::OutForDelivery,
            OrderStatus::Delivered => InternalStatus::Completed,
            OrderStatus::Cancelled => InternalStatus::Voided,
            OrderStatus::Rejected => InternalStatus::Declined,
        }
    }
}

impl Display for InternalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InternalStatus::Pending => "pending",
            InternalStatus::Confirmed => "confirmed",
            InternalStatus::InKitchen => "in_kitchen",
            InternalStatus::ReadyForPickup => "ready_for_pickup",
            InternalStatus::OutForDelivery => "out_for_delivery",
            InternalStatus::Completed => "completed",
            InternalStatus::Voided => "voided",
            InternalStatus::Declined => "declined",
        };
        f.write_str(s)
    }
}

impl FromStr for InternalStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "in_kitchen" => Ok(Self::InKitchen),
            "ready_for_pickup" => Ok(Self::ReadyForPickup),
            "out_for_delivery" => Ok(Self::OutForDelivery),
            "completed" => Ok(Self::Completed),
            "voided" => Ok(Self::Voided),
            "declined" => Ok(Self::Declined),
            s => Err(ConversionError(format!("Invalid internal status: {s}"))),
        }
    }
}

//--------------------------------------   FulfilmentType    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum FulfilmentType {
    /// The customer collects the order at the store.
    Pickup,
    /// The store delivers with its own couriers.
    SelfDelivery,
    /// The marketplace delivers with its fleet.
    PlatformDelivery,
}

impl Display for FulfilmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FulfilmentType::Pickup => "pickup",
            FulfilmentType::SelfDelivery => "self_delivery",
            FulfilmentType::PlatformDelivery => "platform_delivery",
        };
        f.write_str(s)
    }
}

impl FromStr for FulfilmentType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pickup" => Ok(Self::Pickup),
            "self_delivery" => Ok(Self::SelfDelivery),
            "platform_delivery" => Ok(Self::PlatformDelivery),
            s => Err(ConversionError(format!("Invalid fulfilment type: {s}"))),
        }
    }
}

//--------------------------------------       OrderId       ---------------------------------------------------------
/// The order id as assigned by the marketplace. Only unique per platform; the internal key is `(platform_id, OrderId)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------      Platform       ---------------------------------------------------------
/// One row per external marketplace. Administration creates and edits these; every adapter operation reads them.
/// A disabled platform is never dispatched to for outbound calls, but its code remains valid for inbound
/// webhooks so that tampered identifiers are rejected explicitly rather than silently ignored.
#[derive(Debug, Clone)]
pub struct Platform {
    pub id: i64,
    pub code: PlatformCode,
    pub name: String,
    pub enabled: bool,
    pub api_key: Secret<String>,
    pub webhook_secret: Secret<String>,
    pub store_id: String,
    pub menu_sync_enabled: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------        Order        ---------------------------------------------------------
/// The internal order record for a marketplace-sourced order.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Order {
    pub id: i64,
    pub external_id: OrderId,
    pub platform_id: i64,
    /// The short human-readable number shown on tickets and staff screens.
    pub display_number: String,
    pub status: OrderStatus,
    pub fulfilment: FulfilmentType,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    /// Delivery address as JSON, absent for pickup orders.
    pub delivery_address: Option<String>,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub discount: Money,
    pub tip: Money,
    pub total: Money,
    /// The platform payload as received, kept verbatim for audit.
    pub raw_payload: String,
    pub placed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     OrderItem       ---------------------------------------------------------
/// A materialized order line, linked to an internal product when the external SKU resolved.
#[derive(Debug, Clone, FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: Option<i64>,
    pub external_sku: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// Flattened modifier selections as JSON.
    pub modifiers: Option<String>,
    pub note: Option<String>,
}

//--------------------------------------      Product        ---------------------------------------------------------
/// A minimal view of the internally owned product catalogue: just enough to resolve SKUs and price menus.
#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub base_price: Money,
    pub active: bool,
    pub available: bool,
}

//--------------------------------------    ChannelPrice     ---------------------------------------------------------
/// Links an internal product to an external SKU on one platform, with the channel-specific price and availability.
/// The outbound menu and stock sync services iterate over these rows.
#[derive(Debug, Clone, FromRow)]
pub struct ChannelPrice {
    pub id: i64,
    pub product_id: i64,
    pub platform_id: i64,
    pub external_sku: String,
    pub price: Money,
    pub available: bool,
}

//--------------------------------------      JobState       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    InProgress,
    Done,
    /// Retries exhausted. Kept for operator inspection, never picked up again.
    Dead,
}

impl Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Queued => "queued",
            JobState::InProgress => "in_progress",
            JobState::Done => "done",
            JobState::Dead => "dead",
        };
        f.write_str(s)
    }
}

impl FromStr for JobState {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            "dead" => Ok(Self::Dead),
            s => Err(ConversionError(format!("Invalid job state: {s}"))),
        }
    }
}

//--------------------------------------     WebhookJob      ---------------------------------------------------------
/// A queued unit of webhook processing. `job_id` is derived from `(platform, external order id)` so that
/// marketplace redeliveries deduplicate at the queue layer.
#[derive(Debug, Clone, FromRow)]
pub struct WebhookJob {
    pub id: i64,
    pub job_id: String,
    pub platform_code: PlatformCode,
    pub event_type: String,
    pub external_order_id: OrderId,
    pub payload: String,
    pub received_at: DateTime<Utc>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub correlation_id: String,
    pub state: JobState,
    pub attempts: i64,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------   NewWebhookJob     ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewWebhookJob {
    pub job_id: String,
    pub platform_code: PlatformCode,
    pub event_type: String,
    pub external_order_id: OrderId,
    pub payload: String,
    pub received_at: DateTime<Utc>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub correlation_id: String,
}

impl NewWebhookJob {
    /// The deterministic queue key for a webhook concerning one order on one platform.
    pub fn job_id_for(code: PlatformCode, external_id: &OrderId) -> String {
        format!("{code}:{}", external_id.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn platform_codes_round_trip() {
        for code in PlatformCode::ALL {
            assert_eq!(code.as_str().parse::<PlatformCode>().unwrap(), code);
        }
        assert!("ifood".parse::<PlatformCode>().is_err());
        assert!("".parse::<PlatformCode>().is_err());
    }

    #[test]
    fn order_status_round_trip() {
        let statuses = [
            OrderStatus::New,
            OrderStatus::Accepted,
            OrderStatus::InPreparation,
            OrderStatus::Ready,
            OrderStatus::PickedUp,
            OrderStatus::OnRoute,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Rejected,
        ];
        for status in statuses {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("PREPARING".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn internal_mapping_is_independent_of_platform_tables() {
        // Round trip through canonical loses only the PickedUp distinction.
        for internal in [
            InternalStatus::Pending,
            InternalStatus::Confirmed,
            InternalStatus::InKitchen,
            InternalStatus::ReadyForPickup,
            InternalStatus::OutForDelivery,
            InternalStatus::Completed,
            InternalStatus::Voided,
            InternalStatus::Declined,
        ] {
            assert_eq!(InternalStatus::from_canonical(internal.to_canonical()), internal);
        }
        assert_eq!(InternalStatus::from_canonical(OrderStatus::PickedUp), InternalStatus::OutForDelivery);
    }

    #[test]
    fn job_ids_are_deterministic() {
        let id = OrderId::from("R-1001".to_string());
        assert_eq!(NewWebhookJob::job_id_for(PlatformCode::Rappi, &id), "rappi:R-1001");
        assert_eq!(
            NewWebhookJob::job_id_for(PlatformCode::Rappi, &id),
            NewWebhookJob::job_id_for(PlatformCode::Rappi, &OrderId::from("R-1001".to_string()))
        );
    }
}
