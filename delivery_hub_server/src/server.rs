use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use delivery_hub_engine::{
    events::{EventHandlers, EventHooks},
    CatalogApi,
    OrderFlowApi,
    SqliteDatabase,
};
use log::*;
use marketplace_tools::AdapterRegistry;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    middleware::{SignatureGateFactory, MAX_WEBHOOK_BODY_BYTES},
    pipeline::{start_pipeline, PipelineConfig},
    routes::{HealthRoute, IncomingWebhookRoute, OrderStatusRoute, ProductAvailabilityRoute, SyncMenuRoute},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let mut hooks = EventHooks::default();
    hooks.on_order_created(|ev| {
        Box::pin(async move {
            info!("📬️ New order #{} ({}) received", ev.order.id, ev.order.display_number);
        })
    });
    hooks.on_order_status_changed(|ev| {
        Box::pin(async move {
            info!("📬️ Order #{} moved from {} to {}", ev.order.id, ev.previous, ev.order.status);
        })
    });
    let handlers = EventHandlers::new(25, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let registry = Arc::new(AdapterRegistry::new(db.clone()));
    let order_flow = Arc::new(OrderFlowApi::new(db.clone(), producers));
    let pipeline_config = PipelineConfig::from_server_config(&config);
    // The workers live as long as the server process; their handles are deliberately detached.
    let _pipeline = start_pipeline(db.clone(), Arc::clone(&registry), Arc::clone(&order_flow), pipeline_config);

    let srv = create_server_instance(config, db, registry, order_flow)?;
    srv.await.map_err(|e| ServerError::IOError(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    registry: Arc<AdapterRegistry<SqliteDatabase>>,
    order_flow: Arc<OrderFlowApi<SqliteDatabase>>,
) -> Result<Server, ServerError> {
    let app_config = config.clone();
    let srv = HttpServer::new(move || {
        let catalog_api = CatalogApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("dh::access_log"))
            .app_data(web::PayloadConfig::new(MAX_WEBHOOK_BODY_BYTES))
            .app_data(web::Data::new(app_config.clone()))
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::from(Arc::clone(&order_flow)))
            .app_data(web::Data::from(Arc::clone(&registry)));
        let webhook_scope = web::scope("/webhook")
            .wrap(SignatureGateFactory::new(
                Arc::clone(&registry),
                app_config.max_json_depth,
                app_config.skip_signature_checks,
            ))
            .service(IncomingWebhookRoute::<SqliteDatabase>::new());
        let api_scope = web::scope("/api")
            .service(OrderStatusRoute::<SqliteDatabase>::new())
            .service(SyncMenuRoute::<SqliteDatabase>::new())
            .service(ProductAvailabilityRoute::<SqliteDatabase>::new());
        app.service(HealthRoute::<SqliteDatabase>::new()).service(webhook_scope).service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
