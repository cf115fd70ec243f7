//! The canonical webhook vocabulary.
//!
//! Every marketplace payload is translated into these shapes exactly once, by its adapter. Nothing downstream of
//! the adapters (pipeline, state machine, storage, staff notifications) ever sees a platform-specific field name.
use chrono::{DateTime, Utc};
use dh_common::Money;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db_types::{FulfilmentType, OrderId, OrderStatus, PlatformCode};

//--------------------------------------  WebhookEventType   ---------------------------------------------------------
/// What an inbound webhook is telling us. Adapters classify from explicit event markers where the platform
/// provides one, otherwise they infer from the order state in the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    NewOrder,
    CancelOrder,
    StatusUpdate,
}

impl std::fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WebhookEventType::NewOrder => "new_order",
            WebhookEventType::CancelOrder => "cancel_order",
            WebhookEventType::StatusUpdate => "status_update",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for WebhookEventType {
    type Err = crate::db_types::ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new_order" => Ok(Self::NewOrder),
            "cancel_order" => Ok(Self::CancelOrder),
            "status_update" => Ok(Self::StatusUpdate),
            s => Err(crate::db_types::ConversionError(format!("Invalid webhook event type: {s}"))),
        }
    }
}

//-------------------------------------- CanonicalWebhookEvent -------------------------------------------------------
/// A verified, classified, normalized inbound webhook. Created once per request by the adapter and consumed
/// exactly once by the pipeline; redeliveries carry the same `(platform, external_order_id)` pair and are
/// deduplicated there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalWebhookEvent {
    pub event_type: WebhookEventType,
    pub platform: PlatformCode,
    pub external_order_id: OrderId,
    /// Present for new-order events; cancellations and bare status updates carry only the target status.
    pub order: Option<CanonicalOrder>,
    /// The normalized target status. `None` when the platform sent a status we have no mapping for; the
    /// pipeline logs those instead of guessing.
    pub status: Option<OrderStatus>,
    pub received_at: DateTime<Utc>,
    /// The payload as received, for audit.
    pub raw: Value,
}

//--------------------------------------   CanonicalOrder    ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalOrder {
    pub external_id: OrderId,
    pub platform: PlatformCode,
    pub display_number: String,
    pub status: OrderStatus,
    pub fulfilment: FulfilmentType,
    pub customer: Customer,
    pub delivery_address: Option<DeliveryAddress>,
    pub items: Vec<LineItem>,
    pub charges: Charges,
    pub placed_at: DateTime<Utc>,
    pub raw: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub street: String,
    pub city: Option<String>,
    pub notes: Option<String>,
}

/// One order line. Modifiers arrive as arbitrarily nested option groups on some platforms; adapters flatten
/// them into this single level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub external_sku: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub modifiers: Vec<Modifier>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Modifier {
    pub name: String,
    pub price: Money,
}

/// The monetary breakdown of an order. `total` is what the platform charged the customer; the hub stores the
/// platform's numbers verbatim rather than re-deriving them.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Charges {
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub discount: Money,
    pub tip: Money,
    pub total: Money,
}

impl CanonicalOrder {
    /// Consistency check used by tests and the pipeline's warning path: the breakdown should add up.
    pub fn charges_are_consistent(&self) -> bool {
        let c = self.charges;
        c.subtotal + c.delivery_fee + c.tip - c.discount == c.total
    }
}
