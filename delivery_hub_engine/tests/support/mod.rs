#![allow(dead_code)]
pub mod prepare_env;

use delivery_hub_engine::{
    canonical::{CanonicalOrder, CanonicalWebhookEvent, Charges, Customer, LineItem, WebhookEventType},
    db_types::{FulfilmentType, OrderId, OrderStatus, Platform, PlatformCode},
    sqlite::db::{catalog, platforms},
    SqliteDatabase,
};
use dh_common::Money;

pub async fn seed_platform(db: &SqliteDatabase, code: PlatformCode) -> Platform {
    let mut conn = db.pool().acquire().await.unwrap();
    platforms::insert_platform(code, "Test store", "api-key", "webhook-secret", "store-1", &mut conn)
        .await
        .expect("Error inserting platform")
}

/// Seeds a product with one channel listing on the platform and returns the external SKU.
pub async fn seed_listed_product(db: &SqliteDatabase, platform_id: i64, sku: &str, price: i64) -> i64 {
    let mut conn = db.pool().acquire().await.unwrap();
    let product = catalog::insert_product("Empanada", "Snacks", price, &mut conn).await.expect("Error inserting product");
    catalog::insert_channel_price(product.id, platform_id, sku, price, true, &mut conn)
        .await
        .expect("Error inserting channel price");
    product.id
}

pub fn sample_order(code: PlatformCode, ext_id: &str) -> CanonicalOrder {
    CanonicalOrder {
        external_id: OrderId(ext_id.to_string()),
        platform: code,
        display_number: format!("T-{ext_id}"),
        status: OrderStatus::New,
        fulfilment: FulfilmentType::PlatformDelivery,
        customer: Customer { name: "Alice".to_string(), phone: Some("+5491155550000".to_string()) },
        delivery_address: None,
        items: vec![LineItem {
            external_sku: "SKU-001".to_string(),
            name: "Empanada".to_string(),
            quantity: 2,
            unit_price: Money::from_cents(1500),
            modifiers: vec![],
            note: None,
        }],
        charges: Charges {
            subtotal: Money::from_cents(3000),
            delivery_fee: Money::from_cents(500),
            discount: Money::from_cents(0),
            tip: Money::from_cents(0),
            total: Money::from_cents(3500),
        },
        placed_at: chrono::Utc::now(),
        raw: serde_json::json!({"order": ext_id}),
    }
}

pub fn new_order_event(code: PlatformCode, ext_id: &str) -> CanonicalWebhookEvent {
    let order = sample_order(code, ext_id);
    CanonicalWebhookEvent {
        event_type: WebhookEventType::NewOrder,
        platform: code,
        external_order_id: order.external_id.clone(),
        status: Some(order.status),
        raw: order.raw.clone(),
        received_at: chrono::Utc::now(),
        order: Some(order),
    }
}

pub fn status_event(code: PlatformCode, ext_id: &str, status: Option<OrderStatus>) -> CanonicalWebhookEvent {
    CanonicalWebhookEvent {
        event_type: WebhookEventType::StatusUpdate,
        platform: code,
        external_order_id: OrderId(ext_id.to_string()),
        order: None,
        status,
        received_at: chrono::Utc::now(),
        raw: serde_json::json!({"order": ext_id}),
    }
}

pub fn cancel_event(code: PlatformCode, ext_id: &str) -> CanonicalWebhookEvent {
    CanonicalWebhookEvent {
        event_type: WebhookEventType::CancelOrder,
        platform: code,
        external_order_id: OrderId(ext_id.to_string()),
        order: None,
        status: Some(OrderStatus::Cancelled),
        received_at: chrono::Utc::now(),
        raw: serde_json::json!({"order": ext_id}),
    }
}
