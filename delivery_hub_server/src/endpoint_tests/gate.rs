//! Signature gate behavior, tested around a trivial echo handler so the checks are observed in
//! isolation from ingestion.

use std::sync::Arc;

use actix_web::{http::StatusCode, web, web::ServiceConfig, HttpResponse};
use marketplace_tools::{hmac_base64, AdapterRegistry};

use super::{
    helpers::{platform, post_request, RAPPI_SECRET},
    mocks::MockBackend,
};
use crate::middleware::SignatureGateFactory;

async fn echo(body: web::Bytes) -> HttpResponse {
    HttpResponse::Ok().body(body)
}

fn gated_scope(cfg: &mut ServiceConfig, skip_signature_checks: bool) {
    let mut db = MockBackend::new();
    db.expect_fetch_platform_by_code().returning(|code| Ok(Some(platform(code))));
    let registry = Arc::new(AdapterRegistry::new(db));
    cfg.service(
        web::scope("/webhook")
            .wrap(SignatureGateFactory::new(registry, 10, skip_signature_checks))
            .route("/{platform}", web::post().to(echo)),
    );
}

fn configure(cfg: &mut ServiceConfig) {
    gated_scope(cfg, false);
}

fn configure_with_bypass(cfg: &mut ServiceConfig) {
    gated_scope(cfg, true);
}

const BODY: &str = r#"{"event":"ORDER_DISPATCH","order":{"id":"443211","state":"PENDING"}}"#;

#[actix_web::test]
async fn valid_signature_passes_and_the_body_is_preserved() {
    let _ = env_logger::try_init().ok();
    let sig = hmac_base64(RAPPI_SECRET, BODY.as_bytes());
    let (status, body) =
        post_request("/webhook/rappi", BODY, &[("X-Rappi-Signature", sig.as_str())], configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, BODY);
}

#[actix_web::test]
async fn missing_signature_is_unauthorized() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/webhook/rappi", BODY, &[], configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Missing webhook signature"), "{body}");
}

#[actix_web::test]
async fn wrong_secret_is_unauthorized() {
    let _ = env_logger::try_init().ok();
    let sig = hmac_base64("not-the-secret", BODY.as_bytes());
    let (status, body) =
        post_request("/webhook/rappi", BODY, &[("X-Rappi-Signature", sig.as_str())], configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Invalid webhook signature"), "{body}");
}

#[actix_web::test]
async fn tampered_body_is_unauthorized() {
    let _ = env_logger::try_init().ok();
    let sig = hmac_base64(RAPPI_SECRET, BODY.as_bytes());
    let tampered = BODY.replace("443211", "999999");
    let (status, _) =
        post_request("/webhook/rappi", &tampered, &[("X-Rappi-Signature", sig.as_str())], configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn unknown_platform_is_a_bad_request() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/webhook/doordash", BODY, &[], configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Unknown platform"), "{body}");
}

fn configure_unprovisioned(cfg: &mut ServiceConfig) {
    let mut db = MockBackend::new();
    db.expect_fetch_platform_by_code().returning(|_| Ok(None));
    let registry = Arc::new(AdapterRegistry::new(db));
    cfg.service(
        web::scope("/webhook")
            .wrap(SignatureGateFactory::new(registry, 10, false))
            .route("/{platform}", web::post().to(echo)),
    );
}

/// A recognised code with no provisioned platform row is unroutable, so the request is the sender's
/// problem: a 400, not a 404.
#[actix_web::test]
async fn a_valid_code_without_a_platform_row_is_a_bad_request() {
    let _ = env_logger::try_init().ok();
    let sig = hmac_base64(RAPPI_SECRET, BODY.as_bytes());
    let (status, body) =
        post_request("/webhook/rappi", BODY, &[("X-Rappi-Signature", sig.as_str())], configure_unprovisioned).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("not provisioned"), "{body}");
}

#[actix_web::test]
async fn overly_nested_json_is_rejected_before_parsing() {
    let _ = env_logger::try_init().ok();
    let deep = format!("{}1{}", "[".repeat(11), "]".repeat(11));
    let payload = format!(r#"{{"event":"X","order":{deep}}}"#);
    let (status, body) = post_request("/webhook/rappi", &payload, &[], configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("nesting too deep"), "{body}");
}

#[actix_web::test]
async fn depth_bound_ignores_brackets_inside_strings() {
    let _ = env_logger::try_init().ok();
    let payload = r#"{"note":"[[[[[[[[[[[[[[[[[[[[","order":{"id":"1"}}"#;
    let sig = hmac_base64(RAPPI_SECRET, payload.as_bytes());
    let (status, _) =
        post_request("/webhook/rappi", payload, &[("X-Rappi-Signature", sig.as_str())], configure).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn bypass_skips_the_signature_but_not_the_depth_bound() {
    let _ = env_logger::try_init().ok();
    let (status, _) = post_request("/webhook/rappi", BODY, &[], configure_with_bypass).await;
    assert_eq!(status, StatusCode::OK);

    let deep = format!("{}1{}", "[".repeat(11), "]".repeat(11));
    let payload = format!(r#"{{"order":{deep}}}"#);
    let (status, _) = post_request("/webhook/rappi", &payload, &[], configure_with_bypass).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn pedidosya_uses_its_own_header_and_hex_encoding() {
    let _ = env_logger::try_init().ok();
    let body = r#"{"state":"PENDING","id":"90210","details":[]}"#;
    let sig = marketplace_tools::hmac_hex(super::helpers::PEYA_SECRET, body.as_bytes());
    let (status, _) =
        post_request("/webhook/pedidosya", body, &[("Peya-Signature", sig.as_str())], configure).await;
    assert_eq!(status, StatusCode::OK);

    // The Rappi header on a PedidosYa call counts as missing.
    let (status, _) =
        post_request("/webhook/pedidosya", body, &[("X-Rappi-Signature", sig.as_str())], configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
