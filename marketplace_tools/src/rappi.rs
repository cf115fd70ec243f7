//! The Rappi adapter.
//!
//! Inbound: webhooks signed with base64 HMAC-SHA256 in `X-Rappi-Signature`, classified from the `event`
//! marker. Outbound: OAuth client-credentials bearer token, cached and refreshed with a safety margin.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use delivery_hub_engine::{
    canonical::{
        CanonicalOrder,
        CanonicalWebhookEvent,
        Charges,
        Customer,
        DeliveryAddress,
        LineItem,
        Modifier,
        WebhookEventType,
    },
    db_types::{FulfilmentType, Order, OrderId, OrderStatus, PlatformCode},
};
use dh_common::Money;
use log::*;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    config::AdapterConfig,
    data_objects::{AvailabilityUpdate, MenuEntry, MenuSyncFailure, MenuSyncResult, StatusUpdateDetail, StatusUpdateResult},
    signing::verify_base64_signature,
    token::TokenCache,
    AdapterError,
    MarketplaceAdapter,
};

pub struct RappiAdapter {
    config: AdapterConfig,
    client: Client,
    tokens: TokenCache,
}

impl RappiAdapter {
    pub fn new(config: AdapterConfig) -> Result<Self, AdapterError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AdapterError::Initialization(e.to_string()))?;
        Ok(Self { config, client, tokens: TokenCache::new() })
    }

    async fn bearer_token(&self) -> Result<String, AdapterError> {
        if !self.config.has_credentials() {
            return Err(AdapterError::MissingCredentials(self.config.code.to_string()));
        }
        let client = self.client.clone();
        let url = format!("{}/auth/token", self.config.base_url);
        let body = serde_json::json!({
            "grant_type": "client_credentials",
            "client_id": self.config.store_id,
            "client_secret": self.config.api_key.reveal(),
        });
        self.tokens
            .bearer_token(|| async move {
                #[derive(Deserialize)]
                struct TokenResponse {
                    access_token: String,
                    expires_in: i64,
                }
                trace!("🛵️ Requesting a fresh Rappi access token");
                let response =
                    client.post(url).json(&body).send().await.map_err(|e| AdapterError::TokenError(e.to_string()))?;
                if !response.status().is_success() {
                    return Err(AdapterError::TokenError(format!("auth endpoint returned {}", response.status())));
                }
                let token: TokenResponse =
                    response.json().await.map_err(|e| AdapterError::TokenError(e.to_string()))?;
                Ok((token.access_token, token.expires_in))
            })
            .await
    }

    async fn rest_query<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, AdapterError> {
        let token = self.bearer_token().await?;
        let url = format!("{}{path}", self.config.base_url);
        trace!("🛵️ Sending REST query: {url}");
        let mut req = self.client.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| AdapterError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("🛵️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| AdapterError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            if status == 401 {
                self.tokens.invalidate().await;
            }
            let message = response.text().await.map_err(|e| AdapterError::RestResponseError(e.to_string()))?;
            Err(AdapterError::QueryError { status, message })
        }
    }
}

/// Maps a Rappi order state onto the canonical vocabulary. Unknown states map to `None` and are logged
/// upstream rather than being guessed at.
fn status_from_rappi(state: &str) -> Option<OrderStatus> {
    let status = match state.to_ascii_uppercase().as_str() {
        "PENDING" => OrderStatus::New,
        "TAKEN" | "ACCEPTED" => OrderStatus::Accepted,
        "COOKING" | "IN_PREPARATION" => OrderStatus::InPreparation,
        "READY" | "READY_FOR_PICKUP" => OrderStatus::Ready,
        "PICKED_UP" | "COLLECTED" => OrderStatus::PickedUp,
        "ON_ROUTE" | "IN_DELIVERY" => OrderStatus::OnRoute,
        "DELIVERED" | "FINISHED" => OrderStatus::Delivered,
        "CANCELLED" | "CANCELED" => OrderStatus::Cancelled,
        "REJECTED" => OrderStatus::Rejected,
        _ => return None,
    };
    Some(status)
}

/// The outbound action Rappi expects for a canonical status. Rappi models these as verbs on the order, not a
/// generic status field.
fn action_for_status(status: OrderStatus) -> Option<&'static str> {
    match status {
        OrderStatus::Accepted => Some("take"),
        OrderStatus::Rejected => Some("reject"),
        OrderStatus::Ready => Some("ready"),
        OrderStatus::Cancelled => Some("cancel"),
        _ => None,
    }
}

/// Request body for an outbound action. Taking an order carries the preparation-time commitment; rejecting
/// or cancelling carries the reason. The other actions send no body.
fn action_body(action: &str, detail: &StatusUpdateDetail) -> Option<Value> {
    match action {
        "take" => detail.prep_minutes.map(|minutes| serde_json::json!({ "preparationTime": minutes })),
        "reject" | "cancel" => detail.reason.as_ref().map(|reason| serde_json::json!({ "reason": reason })),
        _ => None,
    }
}

fn field_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn money_field(order: &Value, field: &str) -> Result<Money, AdapterError> {
    let amount = order["totals"][field].as_f64().unwrap_or(0.0);
    Money::from_major_units(amount).map_err(|e| AdapterError::MalformedPayload(format!("totals.{field}: {e}")))
}

fn parse_items(order: &Value) -> Result<Vec<LineItem>, AdapterError> {
    let Some(raw_items) = order["items"].as_array() else {
        return Ok(Vec::new());
    };
    let mut items = Vec::with_capacity(raw_items.len());
    for item in raw_items {
        let sku = field_as_string(&item["sku"])
            .ok_or_else(|| AdapterError::MalformedPayload("item without a sku".to_string()))?;
        let unit_price = Money::from_major_units(item["unitPrice"].as_f64().unwrap_or(0.0))
            .map_err(|e| AdapterError::MalformedPayload(format!("item {sku} unitPrice: {e}")))?;
        let modifiers = item["subitems"]
            .as_array()
            .map(|subs| {
                subs.iter()
                    .map(|s| {
                        let price = Money::from_major_units(s["price"].as_f64().unwrap_or(0.0))
                            .map_err(|e| AdapterError::MalformedPayload(format!("subitem price: {e}")))?;
                        Ok(Modifier { name: s["name"].as_str().unwrap_or_default().to_string(), price })
                    })
                    .collect::<Result<Vec<_>, AdapterError>>()
            })
            .transpose()?
            .unwrap_or_default();
        items.push(LineItem {
            external_sku: sku,
            name: item["name"].as_str().unwrap_or_default().to_string(),
            quantity: item["quantity"].as_i64().unwrap_or(1),
            unit_price,
            modifiers,
            note: item["comment"].as_str().map(String::from),
        });
    }
    Ok(items)
}

fn parse_order(payload: &Value, external_id: OrderId, status: OrderStatus) -> Result<CanonicalOrder, AdapterError> {
    let order = &payload["order"];
    let customer = Customer {
        name: order["customer"]["name"].as_str().unwrap_or("Unknown").to_string(),
        phone: order["customer"]["phone"].as_str().map(String::from),
    };
    let fulfilment = match order["deliveryMethod"].as_str().unwrap_or("delivery") {
        "pickup" => FulfilmentType::Pickup,
        "marketplace" => FulfilmentType::SelfDelivery,
        _ => FulfilmentType::PlatformDelivery,
    };
    let delivery_address = order["deliveryAddress"]["address"].as_str().map(|street| DeliveryAddress {
        street: street.to_string(),
        city: order["deliveryAddress"]["city"].as_str().map(String::from),
        notes: order["deliveryAddress"]["notes"].as_str().map(String::from),
    });
    let placed_at = order["createdAt"]
        .as_str()
        .and_then(|s| s.parse::<DateTime<Utc>>().ok())
        .unwrap_or_else(Utc::now);
    let charges = Charges {
        subtotal: money_field(order, "totalProducts")?,
        delivery_fee: money_field(order, "deliveryFee")?,
        discount: money_field(order, "totalDiscount")?,
        tip: money_field(order, "tip")?,
        total: money_field(order, "totalOrder")?,
    };
    Ok(CanonicalOrder {
        display_number: field_as_string(&order["code"]).unwrap_or_else(|| external_id.as_str().to_string()),
        external_id,
        platform: PlatformCode::Rappi,
        status,
        fulfilment,
        customer,
        delivery_address,
        items: parse_items(order)?,
        charges,
        placed_at,
        raw: payload.clone(),
    })
}

#[async_trait]
impl MarketplaceAdapter for RappiAdapter {
    fn platform_code(&self) -> PlatformCode {
        PlatformCode::Rappi
    }

    fn signature_header(&self) -> &'static str {
        "X-Rappi-Signature"
    }

    fn validate_webhook_signature(&self, signature: &str, raw_body: &[u8]) -> bool {
        if self.config.webhook_secret.is_empty() {
            return false;
        }
        verify_base64_signature(self.config.webhook_secret.reveal(), raw_body, signature)
    }

    fn parse_webhook_payload(&self, raw_body: &[u8]) -> Result<CanonicalWebhookEvent, AdapterError> {
        let payload: Value =
            serde_json::from_slice(raw_body).map_err(|e| AdapterError::MalformedPayload(e.to_string()))?;
        let external_id = field_as_string(&payload["order"]["id"])
            .map(OrderId)
            .ok_or_else(|| AdapterError::MalformedPayload("payload carries no order id".to_string()))?;
        let event_marker = payload["event"].as_str().unwrap_or_default().to_ascii_uppercase();
        let state = payload["order"]["state"].as_str().unwrap_or_default().to_string();
        let status = status_from_rappi(&state);
        if status.is_none() && !state.is_empty() {
            warn!("🛵️ Rappi sent order {external_id} with unknown state {state:?}");
        }

        // A dispatch of a pending order is a brand-new order; anything else rides the status path.
        let event_type = match event_marker.as_str() {
            "ORDER_DISPATCH" | "NEW_ORDER" if matches!(status, Some(OrderStatus::New) | None) => {
                WebhookEventType::NewOrder
            },
            "ORDER_CANCELLATION" | "CANCEL_ORDER" => WebhookEventType::CancelOrder,
            _ => WebhookEventType::StatusUpdate,
        };
        let order = match event_type {
            WebhookEventType::NewOrder => {
                Some(parse_order(&payload, external_id.clone(), status.unwrap_or(OrderStatus::New))?)
            },
            _ => None,
        };
        Ok(CanonicalWebhookEvent {
            event_type,
            platform: PlatformCode::Rappi,
            external_order_id: external_id,
            order,
            status,
            received_at: Utc::now(),
            raw: payload,
        })
    }

    async fn update_order_status(
        &self,
        order: &Order,
        status: OrderStatus,
        detail: &StatusUpdateDetail,
    ) -> Result<StatusUpdateResult, AdapterError> {
        let Some(action) = action_for_status(status) else {
            debug!("🛵️ Rappi has no outbound action for {status}; reporting a failed update");
            return Ok(StatusUpdateResult::failed(None, format!("Rappi does not accept a {status} update")));
        };
        let path = format!("/orders/{}/{action}", order.external_id.as_str());
        let _: Value = self.rest_query(Method::POST, &path, action_body(action, detail)).await?;
        info!("🛵️ Order {} marked as {action} on Rappi", order.external_id);
        Ok(StatusUpdateResult::sent(action))
    }

    async fn push_menu(&self, entries: &[MenuEntry]) -> Result<MenuSyncResult, AdapterError> {
        let mut failed = Vec::new();
        let mut categories: Vec<Value> = Vec::new();
        for entry in entries {
            if entry.external_sku.is_empty() {
                failed.push(MenuSyncFailure {
                    external_sku: String::new(),
                    reason: format!("product {:?} has no SKU on this channel", entry.name),
                });
                continue;
            }
            let product = serde_json::json!({
                "sku": entry.external_sku,
                "name": entry.name,
                "price": entry.price.to_major_units(),
                "available": entry.available,
            });
            if let Some(category) = categories.iter_mut().find(|c| c["name"] == entry.category.as_str()) {
                if let Some(products) = category["products"].as_array_mut() {
                    products.push(product);
                }
            } else {
                categories.push(serde_json::json!({"name": entry.category, "products": [product]}));
            }
        }
        let synced = entries.len() - failed.len();
        let body = serde_json::json!({ "storeId": self.config.store_id, "categories": categories });
        let _: Value = self.rest_query(Method::PUT, "/menu", Some(body)).await?;
        info!("🛵️ Pushed {synced} products in {} categories to Rappi", categories.len());
        Ok(MenuSyncResult { synced_products: synced, failed })
    }

    async fn update_product_availability(&self, update: &AvailabilityUpdate) -> Result<(), AdapterError> {
        let path = format!("/stores/{}/items/{}/availability", self.config.store_id, update.external_sku);
        let body = serde_json::json!({ "available": update.available });
        let _: Value = self.rest_query(Method::PUT, &path, Some(body)).await?;
        debug!("🛵️ SKU {} set to available={} on Rappi", update.external_sku, update.available);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::signing::hmac_base64;
    use delivery_hub_engine::db_types::Platform;
    use dh_common::Secret;

    fn test_adapter() -> RappiAdapter {
        let platform = Platform {
            id: 1,
            code: PlatformCode::Rappi,
            name: "Rappi".to_string(),
            enabled: true,
            api_key: Secret::new("client-secret".to_string()),
            webhook_secret: Secret::new("rappi-webhook-secret".to_string()),
            store_id: "store-9".to_string(),
            menu_sync_enabled: true,
            last_sync_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        RappiAdapter::new(AdapterConfig::for_platform(&platform)).unwrap()
    }

    fn dispatch_payload() -> String {
        serde_json::json!({
            "event": "ORDER_DISPATCH",
            "order": {
                "id": 443211,
                "code": "RP-88",
                "state": "PENDING",
                "createdAt": "2026-08-30T12:00:00Z",
                "deliveryMethod": "delivery",
                "customer": { "name": "Carla Diaz", "phone": "+5491160000000" },
                "deliveryAddress": { "address": "Av. Corrientes 1234", "city": "Buenos Aires" },
                "items": [
                    {
                        "sku": "EMP-01",
                        "name": "Empanada de carne",
                        "quantity": 3,
                        "unitPrice": 15.0,
                        "subitems": [ { "name": "Extra salsa", "price": 2.5 } ],
                        "comment": "bien cocida"
                    }
                ],
                "totals": {
                    "totalProducts": 45.0,
                    "deliveryFee": 5.0,
                    "totalDiscount": 0.0,
                    "tip": 3.0,
                    "totalOrder": 53.0
                }
            }
        })
        .to_string()
    }

    #[test]
    fn dispatch_of_a_pending_order_is_a_new_order() {
        let adapter = test_adapter();
        let event = adapter.parse_webhook_payload(dispatch_payload().as_bytes()).unwrap();
        assert_eq!(event.event_type, WebhookEventType::NewOrder);
        assert_eq!(event.external_order_id.as_str(), "443211");
        let order = event.order.expect("New-order events carry the full order");
        assert_eq!(order.display_number, "RP-88");
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 3);
        assert_eq!(order.items[0].unit_price, Money::from_cents(1500));
        assert_eq!(order.items[0].modifiers[0].price, Money::from_cents(250));
        assert_eq!(order.charges.total, Money::from_cents(5300));
        assert!(order.charges_are_consistent());
    }

    #[test]
    fn status_webhooks_map_the_platform_vocabulary() {
        let adapter = test_adapter();
        let body = serde_json::json!({
            "event": "ORDER_STATUS",
            "order": { "id": "443211", "state": "COOKING" }
        })
        .to_string();
        let event = adapter.parse_webhook_payload(body.as_bytes()).unwrap();
        assert_eq!(event.event_type, WebhookEventType::StatusUpdate);
        assert_eq!(event.status, Some(OrderStatus::InPreparation));
        assert!(event.order.is_none());
    }

    #[test]
    fn unknown_states_are_not_guessed() {
        let adapter = test_adapter();
        let body = serde_json::json!({
            "event": "ORDER_STATUS",
            "order": { "id": "443211", "state": "TELEPORTED" }
        })
        .to_string();
        let event = adapter.parse_webhook_payload(body.as_bytes()).unwrap();
        assert_eq!(event.event_type, WebhookEventType::StatusUpdate);
        assert_eq!(event.status, None);
    }

    #[test]
    fn cancellations_classify_from_the_event_marker() {
        let adapter = test_adapter();
        let body = serde_json::json!({
            "event": "ORDER_CANCELLATION",
            "order": { "id": "443211", "state": "CANCELLED" }
        })
        .to_string();
        let event = adapter.parse_webhook_payload(body.as_bytes()).unwrap();
        assert_eq!(event.event_type, WebhookEventType::CancelOrder);
        assert_eq!(event.status, Some(OrderStatus::Cancelled));
    }

    #[test]
    fn payload_without_an_order_id_is_rejected() {
        let adapter = test_adapter();
        let err = adapter.parse_webhook_payload(br#"{"event":"ORDER_DISPATCH","order":{}}"#).unwrap_err();
        assert!(matches!(err, AdapterError::MalformedPayload(_)));
    }

    #[test]
    fn signatures_verify_against_the_raw_body() {
        let adapter = test_adapter();
        let body = dispatch_payload();
        let sig = hmac_base64("rappi-webhook-secret", body.as_bytes());
        assert!(adapter.validate_webhook_signature(&sig, body.as_bytes()));
        assert!(!adapter.validate_webhook_signature(&sig, br#"{"tampered":true}"#));
        let bad = hmac_base64("wrong-secret", body.as_bytes());
        assert!(!adapter.validate_webhook_signature(&bad, body.as_bytes()));
    }

    #[test]
    fn outbound_actions_cover_the_accept_reject_ready_flow() {
        assert_eq!(action_for_status(OrderStatus::Accepted), Some("take"));
        assert_eq!(action_for_status(OrderStatus::Rejected), Some("reject"));
        assert_eq!(action_for_status(OrderStatus::Ready), Some("ready"));
        assert_eq!(action_for_status(OrderStatus::Cancelled), Some("cancel"));
        assert_eq!(action_for_status(OrderStatus::OnRoute), None);
    }

    #[test]
    fn accepting_an_order_sends_the_prep_time_commitment() {
        let body = action_body("take", &StatusUpdateDetail::with_prep_minutes(25)).unwrap();
        assert_eq!(body["preparationTime"], 25);
        let body = action_body("reject", &StatusUpdateDetail::with_reason("out of stock")).unwrap();
        assert_eq!(body["reason"], "out of stock");
        assert!(action_body("take", &StatusUpdateDetail::default()).is_none());
        assert!(action_body("ready", &StatusUpdateDetail::with_prep_minutes(25)).is_none());
    }
}
