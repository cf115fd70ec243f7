use actix_web::{http::StatusCode, web, web::ServiceConfig};
use delivery_hub_engine::IntegrationError;

use super::{helpers::get_request, mocks::MockBackend};
use crate::routes::HealthRoute;

fn configure_healthy(cfg: &mut ServiceConfig) {
    let mut db = MockBackend::new();
    db.expect_ping().returning(|| Ok(()));
    db.expect_queue_depth().returning(|| Ok(3));
    cfg.app_data(web::Data::new(db)).service(HealthRoute::<MockBackend>::new());
}

fn configure_db_down(cfg: &mut ServiceConfig) {
    let mut db = MockBackend::new();
    db.expect_ping().returning(|| Err(IntegrationError::DatabaseError("unable to open database".to_string())));
    cfg.app_data(web::Data::new(db)).service(HealthRoute::<MockBackend>::new());
}

#[actix_web::test]
async fn health_reports_queue_depth_and_implemented_adapters() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/health", configure_healthy).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""status":"ok""#), "{body}");
    assert!(body.contains(r#""queue_depth":3"#), "{body}");
    assert!(body.contains("rappi"), "{body}");
    assert!(body.contains("pedidosya"), "{body}");
}

#[actix_web::test]
async fn health_fails_when_the_database_does_not_answer() {
    let _ = env_logger::try_init().ok();
    let (status, _) = get_request("/health", configure_db_down).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
