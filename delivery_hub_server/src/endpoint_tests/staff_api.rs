//! Staff/admin API behavior: status changes, menu sync and availability fan-out, with storage
//! mocked and outbound HTTP pointed at a dead port so platform pushes fail fast.

use std::sync::Arc;

use actix_web::{http::StatusCode, web, web::ServiceConfig};
use delivery_hub_engine::{
    db_types::{ChannelPrice, OrderStatus, PlatformCode},
    events::EventProducers,
    traits::StatusChange,
    CatalogApi,
    IntegrationError,
    OrderFlowApi,
};
use dh_common::Money;
use marketplace_tools::AdapterRegistry;

use super::{
    helpers::{platform, post_request, stored_order},
    mocks::MockBackend,
};
use crate::routes::{OrderStatusRoute, ProductAvailabilityRoute, SyncMenuRoute};

/// Outbound pushes are not under test here; a dead local port turns them into fast failures.
fn disable_outbound_http() {
    std::env::set_var("DH_RAPPI_BASE_URL", "http://127.0.0.1:9");
    std::env::set_var("DH_PEDIDOSYA_BASE_URL", "http://127.0.0.1:9");
}

fn registry() -> web::Data<AdapterRegistry<MockBackend>> {
    let mut db = MockBackend::new();
    db.expect_fetch_platform().returning(|id| {
        Ok(match id {
            1 => Some(platform(PlatformCode::Rappi)),
            2 => Some(platform(PlatformCode::PedidosYa)),
            _ => None,
        })
    });
    db.expect_fetch_platform_by_code().returning(|code| Ok(Some(platform(code))));
    web::Data::from(Arc::new(AdapterRegistry::new(db)))
}

// --------------------------------------- status changes ---------------------------------------

fn configure_transition(cfg: &mut ServiceConfig) {
    disable_outbound_http();
    let mut db = MockBackend::new();
    db.expect_transition_order()
        .withf(|id, status| *id == 7 && *status == OrderStatus::Accepted)
        .returning(|id, status| Ok(StatusChange { order: stored_order(id, status), previous: OrderStatus::New }));
    let order_flow = OrderFlowApi::new(db, EventProducers::default());
    cfg.app_data(registry())
        .app_data(web::Data::new(order_flow))
        .service(OrderStatusRoute::<MockBackend>::new());
}

fn configure_illegal_transition(cfg: &mut ServiceConfig) {
    disable_outbound_http();
    let mut db = MockBackend::new();
    db.expect_transition_order().returning(|_, to| {
        Err(IntegrationError::InvalidStateTransition { from: OrderStatus::Delivered, to })
    });
    let order_flow = OrderFlowApi::new(db, EventProducers::default());
    cfg.app_data(registry())
        .app_data(web::Data::new(order_flow))
        .service(OrderStatusRoute::<MockBackend>::new());
}

#[actix_web::test]
async fn a_staff_status_change_commits_even_when_the_platform_push_fails() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request("/orders/7/status", r#"{"status":"confirmed"}"#, &[], configure_transition).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""status":"ACCEPTED""#), "{body}");
    assert!(body.contains(r#""previous_status":"NEW""#), "{body}");
    // The push went to a dead port; the local transition still stands.
    assert!(body.contains(r#""platform_notified":false"#), "{body}");
}

#[actix_web::test]
async fn a_confirmation_may_carry_a_prep_time_commitment() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(
        "/orders/7/status",
        r#"{"status":"confirmed","prep_minutes":25}"#,
        &[],
        configure_transition,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""status":"ACCEPTED""#), "{body}");
}

#[actix_web::test]
async fn an_illegal_transition_is_a_conflict() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request("/orders/7/status", r#"{"status":"confirmed"}"#, &[], configure_illegal_transition).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("Illegal order state transition"), "{body}");
}

#[actix_web::test]
async fn an_unknown_internal_status_is_a_bad_request() {
    let _ = env_logger::try_init().ok();
    let (status, _) =
        post_request("/orders/7/status", r#"{"status":"teleported"}"#, &[], configure_transition).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ----------------------------------------- menu sync ------------------------------------------

fn configure_menu_sync_disabled(cfg: &mut ServiceConfig) {
    disable_outbound_http();
    let mut db = MockBackend::new();
    db.expect_fetch_platform_by_code().returning(|code| {
        let mut p = platform(code);
        p.menu_sync_enabled = false;
        Ok(Some(p))
    });
    let catalog = CatalogApi::new(db);
    cfg.app_data(registry())
        .app_data(web::Data::new(catalog))
        .service(SyncMenuRoute::<MockBackend>::new());
}

#[actix_web::test]
async fn menu_sync_refuses_platforms_with_sync_disabled() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/sync/menu/rappi", "", &[], configure_menu_sync_disabled).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Menu sync is disabled"), "{body}");
}

#[actix_web::test]
async fn menu_sync_rejects_unknown_platform_codes() {
    let _ = env_logger::try_init().ok();
    let (status, _) = post_request("/sync/menu/ifood", "", &[], configure_menu_sync_disabled).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------- availability ----------------------------------------

fn listing(id: i64, platform_id: i64, sku: &str, available: bool) -> ChannelPrice {
    ChannelPrice { id, product_id: 11, platform_id, external_sku: sku.to_string(), price: Money::from_cents(1500), available }
}

fn configure_availability(cfg: &mut ServiceConfig) {
    disable_outbound_http();
    let mut db = MockBackend::new();
    db.expect_set_product_availability()
        .withf(|product_id, available| *product_id == 11 && !available)
        .returning(|_, available| {
            Ok(vec![listing(1, 1, "EMP-01", available), listing(2, 2, "P-EMP-01", available)])
        });
    let catalog = CatalogApi::new(db);
    cfg.app_data(registry())
        .app_data(web::Data::new(catalog))
        .service(ProductAvailabilityRoute::<MockBackend>::new());
}

fn configure_availability_unknown_product(cfg: &mut ServiceConfig) {
    disable_outbound_http();
    let mut db = MockBackend::new();
    db.expect_set_product_availability().returning(|_, _| Ok(Vec::new()));
    let catalog = CatalogApi::new(db);
    cfg.app_data(registry())
        .app_data(web::Data::new(catalog))
        .service(ProductAvailabilityRoute::<MockBackend>::new());
}

#[actix_web::test]
async fn availability_fans_out_to_every_channel_and_isolates_failures() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request("/products/11/availability", r#"{"available":false}"#, &[], configure_availability).await;
    assert_eq!(status, StatusCode::OK);
    // Both channels are reported even though both pushes failed against the dead port.
    assert!(body.contains("EMP-01"), "{body}");
    assert!(body.contains("P-EMP-01"), "{body}");
    assert!(body.contains(r#""success":false"#), "{body}");
}

#[actix_web::test]
async fn availability_for_an_unlisted_product_is_not_found() {
    let _ = env_logger::try_init().ok();
    let (status, _) = post_request(
        "/products/11/availability",
        r#"{"available":false}"#,
        &[],
        configure_availability_unknown_product,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
