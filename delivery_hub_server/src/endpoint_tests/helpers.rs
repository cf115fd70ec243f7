use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use chrono::Utc;
use delivery_hub_engine::db_types::{
    FulfilmentType,
    Order,
    OrderId,
    OrderStatus,
    Platform,
    PlatformCode,
};
use dh_common::{Money, Secret};

pub const RAPPI_SECRET: &str = "rappi-webhook-secret";
pub const PEYA_SECRET: &str = "peya-webhook-secret";

pub fn platform(code: PlatformCode) -> Platform {
    let secret = match code {
        PlatformCode::Rappi => RAPPI_SECRET,
        PlatformCode::PedidosYa => PEYA_SECRET,
    };
    Platform {
        id: match code {
            PlatformCode::Rappi => 1,
            PlatformCode::PedidosYa => 2,
        },
        code,
        name: code.to_string(),
        enabled: true,
        api_key: Secret::new("api-key".to_string()),
        webhook_secret: Secret::new(secret.to_string()),
        store_id: "store-1".to_string(),
        menu_sync_enabled: true,
        last_sync_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn stored_order(id: i64, status: OrderStatus) -> Order {
    Order {
        id,
        external_id: OrderId("443211".to_string()),
        platform_id: 1,
        display_number: "RP-88".to_string(),
        status,
        fulfilment: FulfilmentType::PlatformDelivery,
        customer_name: "Carla Diaz".to_string(),
        customer_phone: None,
        delivery_address: None,
        subtotal: Money::from_cents(4500),
        delivery_fee: Money::from_cents(500),
        discount: Money::from_cents(0),
        tip: Money::from_cents(300),
        total: Money::from_cents(5300),
        raw_payload: "{}".to_string(),
        placed_at: Utc::now(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Fires a POST at an app built from `configure` and hands back the status and body, whether the
/// request produced a response or an error.
pub async fn post_request(
    path: &str,
    body: &str,
    headers: &[(&str, &str)],
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    let mut req = TestRequest::post().uri(path).set_payload(body.to_string());
    req = req.insert_header(("Content-Type", "application/json"));
    for (name, value) in headers {
        req = req.insert_header((name.to_string(), value.to_string()));
    }
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    match test::try_call_service(&service, req.to_request()).await {
        Ok(resp) => {
            let (_, res) = resp.into_parts();
            let status = res.status();
            let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
            (status, body)
        },
        Err(e) => (e.as_response_error().status_code(), e.to_string()),
    }
}

pub async fn get_request(path: &str, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let req = TestRequest::get().uri(path).to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    match test::try_call_service(&service, req).await {
        Ok(resp) => {
            let (_, res) = resp.into_parts();
            let status = res.status();
            let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
            (status, body)
        },
        Err(e) => (e.as_response_error().status_code(), e.to_string()),
    }
}
