//! The PedidosYa adapter.
//!
//! Inbound: webhooks signed with hex HMAC-SHA256 in `Peya-Signature`. PedidosYa sends no explicit event
//! marker, so classification is inferred from the order state. Option groups nest arbitrarily and are
//! flattened into canonical modifiers. Outbound: static API key auth.
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
use serde_json::Value;

use crate::{
    config::AdapterConfig,
    data_objects::{AvailabilityUpdate, MenuEntry, MenuSyncFailure, MenuSyncResult, StatusUpdateDetail, StatusUpdateResult},
    signing::verify_hex_signature,
    AdapterError,
    MarketplaceAdapter,
};

pub struct PedidosYaAdapter {
    config: AdapterConfig,
    client: Client,
}

impl PedidosYaAdapter {
    pub fn new(config: AdapterConfig) -> Result<Self, AdapterError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AdapterError::Initialization(e.to_string()))?;
        Ok(Self { config, client })
    }

    async fn rest_query<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, AdapterError> {
        if !self.config.has_credentials() {
            return Err(AdapterError::MissingCredentials(self.config.code.to_string()));
        }
        let url = format!("{}{path}", self.config.base_url);
        trace!("🛍️ Sending REST query: {url}");
        let mut req = self.client.request(method, url).header("Api-Key", self.config.api_key.reveal());
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| AdapterError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("🛍️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| AdapterError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| AdapterError::RestResponseError(e.to_string()))?;
            Err(AdapterError::QueryError { status, message })
        }
    }
}

fn status_from_peya(state: &str) -> Option<OrderStatus> {
    let status = match state.to_ascii_uppercase().as_str() {
        "PENDING" => OrderStatus::New,
        "CONFIRMED" => OrderStatus::Accepted,
        "IN_PREPARATION" | "PREPARING" => OrderStatus::InPreparation,
        "READY_FOR_PICKUP" => OrderStatus::Ready,
        "PICKED_UP" => OrderStatus::PickedUp,
        "IN_DELIVERY" => OrderStatus::OnRoute,
        "DELIVERED" => OrderStatus::Delivered,
        "CANCELLED" => OrderStatus::Cancelled,
        "REJECTED" => OrderStatus::Rejected,
        _ => return None,
    };
    Some(status)
}

fn peya_state_for(status: OrderStatus) -> Option<&'static str> {
    let state = match status {
        OrderStatus::Accepted => "CONFIRMED",
        OrderStatus::InPreparation => "IN_PREPARATION",
        OrderStatus::Ready => "READY_FOR_PICKUP",
        OrderStatus::PickedUp => "PICKED_UP",
        OrderStatus::OnRoute => "IN_DELIVERY",
        OrderStatus::Delivered => "DELIVERED",
        OrderStatus::Cancelled => "CANCELLED",
        OrderStatus::Rejected => "REJECTED",
        OrderStatus::New => return None,
    };
    Some(state)
}

/// Request body for an outbound state change. Confirming carries the preparation-time commitment; a rejection
/// or cancellation carries the customer-facing reason.
fn state_body(state: &str, detail: &StatusUpdateDetail) -> Value {
    let mut body = serde_json::json!({ "state": state });
    if state == "CONFIRMED" {
        if let Some(minutes) = detail.prep_minutes {
            body["preparationTimeMinutes"] = minutes.into();
        }
    }
    if matches!(state, "REJECTED" | "CANCELLED") {
        if let Some(reason) = &detail.reason {
            body["rejectMessage"] = reason.as_str().into();
        }
    }
    body
}

/// Option groups nest to arbitrary depth; every leaf option becomes one flat canonical modifier.
fn flatten_option_groups(groups: &Value, out: &mut Vec<Modifier>) -> Result<(), AdapterError> {
    let Some(groups) = groups.as_array() else {
        return Ok(());
    };
    for group in groups {
        let Some(options) = group["options"].as_array() else {
            continue;
        };
        for option in options {
            let price = Money::from_major_units(option["amount"].as_f64().unwrap_or(0.0))
                .map_err(|e| AdapterError::MalformedPayload(format!("option amount: {e}")))?;
            out.push(Modifier { name: option["name"].as_str().unwrap_or_default().to_string(), price });
            flatten_option_groups(&option["optionGroups"], out)?;
        }
    }
    Ok(())
}

fn money_field(order: &Value, field: &str) -> Result<Money, AdapterError> {
    Money::from_major_units(order[field].as_f64().unwrap_or(0.0))
        .map_err(|e| AdapterError::MalformedPayload(format!("{field}: {e}")))
}

fn parse_details(order: &Value) -> Result<Vec<LineItem>, AdapterError> {
    let Some(details) = order["details"].as_array() else {
        return Ok(Vec::new());
    };
    let mut items = Vec::with_capacity(details.len());
    for detail in details {
        let sku = detail["product"]["integrationCode"]
            .as_str()
            .ok_or_else(|| AdapterError::MalformedPayload("detail without an integration code".to_string()))?
            .to_string();
        let unit_price = Money::from_major_units(detail["unitPrice"].as_f64().unwrap_or(0.0))
            .map_err(|e| AdapterError::MalformedPayload(format!("detail {sku} unitPrice: {e}")))?;
        let mut modifiers = Vec::new();
        flatten_option_groups(&detail["optionGroups"], &mut modifiers)?;
        items.push(LineItem {
            external_sku: sku,
            name: detail["product"]["name"].as_str().unwrap_or_default().to_string(),
            quantity: detail["quantity"].as_i64().unwrap_or(1),
            unit_price,
            modifiers,
            note: detail["notes"].as_str().map(String::from),
        });
    }
    Ok(items)
}

fn parse_order(payload: &Value, external_id: OrderId, status: OrderStatus) -> Result<CanonicalOrder, AdapterError> {
    let order = &payload["order"];
    let first = order["user"]["name"].as_str().unwrap_or("Unknown");
    let last = order["user"]["lastName"].as_str().unwrap_or_default();
    let name = if last.is_empty() { first.to_string() } else { format!("{first} {last}") };
    let customer = Customer { name, phone: order["user"]["phone"].as_str().map(String::from) };
    let fulfilment = if order["pickup"].as_bool().unwrap_or(false) {
        FulfilmentType::Pickup
    } else if order["logistics"].as_bool().unwrap_or(false) {
        FulfilmentType::PlatformDelivery
    } else {
        FulfilmentType::SelfDelivery
    };
    let delivery_address = order["address"]["description"].as_str().map(|street| DeliveryAddress {
        street: street.to_string(),
        city: order["address"]["city"].as_str().map(String::from),
        notes: order["address"]["notes"].as_str().map(String::from),
    });
    let placed_at = order["registeredDate"]
        .as_str()
        .and_then(|s| s.parse::<DateTime<Utc>>().ok())
        .unwrap_or_else(Utc::now);
    let charges = Charges {
        subtotal: money_field(order, "amountNoDiscount")?,
        delivery_fee: money_field(order, "shippingAmount")?,
        discount: money_field(order, "discount")?,
        tip: money_field(order, "tip")?,
        total: money_field(order, "totalAmount")?,
    };
    Ok(CanonicalOrder {
        display_number: order["code"].as_str().unwrap_or(external_id.as_str()).to_string(),
        external_id,
        platform: PlatformCode::PedidosYa,
        status,
        fulfilment,
        customer,
        delivery_address,
        items: parse_details(order)?,
        charges,
        placed_at,
        raw: payload.clone(),
    })
}

#[async_trait]
impl MarketplaceAdapter for PedidosYaAdapter {
    fn platform_code(&self) -> PlatformCode {
        PlatformCode::PedidosYa
    }

    fn signature_header(&self) -> &'static str {
        "Peya-Signature"
    }

    fn validate_webhook_signature(&self, signature: &str, raw_body: &[u8]) -> bool {
        if self.config.webhook_secret.is_empty() {
            return false;
        }
        verify_hex_signature(self.config.webhook_secret.reveal(), raw_body, signature)
    }

    fn parse_webhook_payload(&self, raw_body: &[u8]) -> Result<CanonicalWebhookEvent, AdapterError> {
        let payload: Value =
            serde_json::from_slice(raw_body).map_err(|e| AdapterError::MalformedPayload(e.to_string()))?;
        let order = &payload["order"];
        let external_id = match &order["id"] {
            Value::String(s) => OrderId(s.clone()),
            Value::Number(n) => OrderId(n.to_string()),
            _ => return Err(AdapterError::MalformedPayload("payload carries no order id".to_string())),
        };
        let state = order["state"].as_str().unwrap_or_default().to_string();
        let status = status_from_peya(&state);
        if status.is_none() && !state.is_empty() {
            warn!("🛍️ PedidosYa sent order {external_id} with unknown state {state:?}");
        }

        // No event marker on this platform: a pending order with line details is a new order, a cancelled or
        // rejected state is a cancellation, everything else is a status update.
        let event_type = match status {
            Some(OrderStatus::New) if order["details"].is_array() => WebhookEventType::NewOrder,
            Some(OrderStatus::Cancelled) => WebhookEventType::CancelOrder,
            _ => WebhookEventType::StatusUpdate,
        };
        let parsed_order = match event_type {
            WebhookEventType::NewOrder => Some(parse_order(&payload, external_id.clone(), OrderStatus::New)?),
            _ => None,
        };
        Ok(CanonicalWebhookEvent {
            event_type,
            platform: PlatformCode::PedidosYa,
            external_order_id: external_id,
            order: parsed_order,
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
        let Some(state) = peya_state_for(status) else {
            debug!("🛍️ PedidosYa has no outbound state for {status}; reporting a failed update");
            return Ok(StatusUpdateResult::failed(None, format!("PedidosYa does not accept a {status} update")));
        };
        let path = format!("/orders/{}", order.external_id.as_str());
        let _: Value = self.rest_query(Method::PUT, &path, Some(state_body(state, detail))).await?;
        info!("🛍️ Order {} moved to {state} on PedidosYa", order.external_id);
        Ok(StatusUpdateResult::sent(state))
    }

    async fn push_menu(&self, entries: &[MenuEntry]) -> Result<MenuSyncResult, AdapterError> {
        let mut failed = Vec::new();
        let mut sections: Vec<Value> = Vec::new();
        for entry in entries {
            if entry.external_sku.is_empty() {
                failed.push(MenuSyncFailure {
                    external_sku: String::new(),
                    reason: format!("product {:?} has no SKU on this channel", entry.name),
                });
                continue;
            }
            let product = serde_json::json!({
                "integrationCode": entry.external_sku,
                "name": entry.name,
                "price": entry.price.to_major_units(),
                "enabled": entry.available,
            });
            if let Some(section) = sections.iter_mut().find(|s| s["name"] == entry.category.as_str()) {
                if let Some(products) = section["products"].as_array_mut() {
                    products.push(product);
                }
            } else {
                sections.push(serde_json::json!({"name": entry.category, "products": [product]}));
            }
        }
        let synced = entries.len() - failed.len();
        let path = format!("/restaurants/{}/menu", self.config.store_id);
        let body = serde_json::json!({ "sections": sections });
        let _: Value = self.rest_query(Method::PUT, &path, Some(body)).await?;
        info!("🛍️ Pushed {synced} products in {} sections to PedidosYa", sections.len());
        Ok(MenuSyncResult { synced_products: synced, failed })
    }

    async fn update_product_availability(&self, update: &AvailabilityUpdate) -> Result<(), AdapterError> {
        let path = format!("/restaurants/{}/products/{}/availability", self.config.store_id, update.external_sku);
        let body = serde_json::json!({ "enabled": update.available });
        let _: Value = self.rest_query(Method::PUT, &path, Some(body)).await?;
        debug!("🛍️ SKU {} set to enabled={} on PedidosYa", update.external_sku, update.available);
        Ok(())
    }
}
