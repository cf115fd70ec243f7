//! Ingestion endpoint behavior, with the queue mocked out.

use std::sync::Arc;

use actix_web::{http::StatusCode, web, web::ServiceConfig};
use delivery_hub_engine::{db_types::PlatformCode, IntegrationError};
use marketplace_tools::AdapterRegistry;

use super::{
    helpers::{platform, post_request},
    mocks::MockBackend,
};
use crate::{config::ServerConfig, routes::IncomingWebhookRoute};

const DISPATCH: &str = r#"{
    "event": "ORDER_DISPATCH",
    "order": {
        "id": 443211,
        "code": "RP-88",
        "state": "PENDING",
        "customer": { "name": "Carla Diaz" },
        "items": [ { "sku": "EMP-01", "name": "Empanada", "quantity": 2, "unitPrice": 15.0 } ],
        "totals": { "totalProducts": 30.0, "deliveryFee": 5.0, "totalDiscount": 0.0, "tip": 0.0, "totalOrder": 35.0 }
    }
}"#;

fn registry() -> web::Data<AdapterRegistry<MockBackend>> {
    let mut db = MockBackend::new();
    db.expect_fetch_platform_by_code().returning(|code| Ok(Some(platform(code))));
    web::Data::from(Arc::new(AdapterRegistry::new(db)))
}

fn app_data(cfg: &mut ServiceConfig, db: MockBackend) {
    cfg.app_data(registry())
        .app_data(web::Data::new(db))
        .app_data(web::Data::new(ServerConfig::default()))
        .service(IncomingWebhookRoute::<MockBackend>::new());
}

fn configure_queued(cfg: &mut ServiceConfig) {
    let mut db = MockBackend::new();
    db.expect_enqueue_job()
        .withf(|job| {
            job.job_id == "rappi:443211" &&
                job.platform_code == PlatformCode::Rappi &&
                job.event_type == "new_order" &&
                job.correlation_id.len() == 16
        })
        .returning(|_| Ok(true));
    app_data(cfg, db);
}

fn configure_redelivery(cfg: &mut ServiceConfig) {
    let mut db = MockBackend::new();
    db.expect_enqueue_job().returning(|_| Ok(false));
    app_data(cfg, db);
}

fn configure_queue_down(cfg: &mut ServiceConfig) {
    let mut db = MockBackend::new();
    db.expect_enqueue_job().returning(|_| Err(IntegrationError::DatabaseError("disk I/O error".to_string())));
    app_data(cfg, db);
}

#[actix_web::test]
async fn a_classified_webhook_is_queued_and_acknowledged() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/rappi", DISPATCH, &[], configure_queued).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""success":true"#), "{body}");
    assert!(body.contains(r#""queued":true"#), "{body}");
}

#[actix_web::test]
async fn a_redelivery_is_acknowledged_without_queuing_again() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/rappi", DISPATCH, &[], configure_redelivery).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""queued":false"#), "{body}");
}

#[actix_web::test]
async fn a_queue_failure_is_not_acknowledged() {
    // A 500 here is what makes the marketplace redeliver instead of dropping the order.
    let _ = env_logger::try_init().ok();
    let (status, _) = post_request("/rappi", DISPATCH, &[], configure_queue_down).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn an_unclassifiable_payload_is_a_server_error() {
    let _ = env_logger::try_init().ok();
    let (status, _) = post_request("/rappi", r#"{"event":"ORDER_DISPATCH","order":{}}"#, &[], configure_queued).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
