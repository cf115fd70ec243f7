//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Handlers are generic over the storage backend so that endpoint tests can run against mocks.
//! Actix cannot register generic handlers directly, so each one gets a small `HttpServiceFactory`
//! wrapper via the `route!` macro.

use std::str::FromStr;

use actix_web::{web, HttpRequest, HttpResponse};
use delivery_hub_engine::{
    db_types::PlatformCode,
    CatalogApi,
    IntegrationDatabase,
    OrderFlowApi,
};
use log::*;
use marketplace_tools::{implemented_codes, AdapterRegistry, StatusUpdateDetail};

use crate::{
    config::ServerConfig,
    data_objects::{AvailabilityRequest, HealthReport, StatusChangeRequest, StatusChangeResponse},
    errors::ServerError,
    helpers::get_remote_ip,
    ingest::{self, RequestMeta},
    sync,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name);
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
route!(health => Get "/health" impl IntegrationDatabase);
pub async fn health<B: IntegrationDatabase>(db: web::Data<B>) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received health check request");
    db.ping().await.map_err(|e| ServerError::BackendError(format!("Database ping failed. {e}")))?;
    let queue_depth = db.queue_depth().await.map_err(ServerError::from)?;
    let report = HealthReport {
        status: "ok".to_string(),
        queue_depth,
        adapters: implemented_codes().iter().map(|c| c.to_string()).collect(),
    };
    Ok(HttpResponse::Ok().json(report))
}

// ----------------------------------------------  Webhooks  ----------------------------------------------------
route!(incoming_webhook => Post "/{platform}" impl IntegrationDatabase);
/// POST /webhook/{platform}
///
/// The signature gate has already authenticated the request and bounded the payload by the time
/// this runs. Classify, enqueue, acknowledge.
pub async fn incoming_webhook<B: IntegrationDatabase>(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Bytes,
    registry: web::Data<AdapterRegistry<B>>,
    db: web::Data<B>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    let code = PlatformCode::from_str(&path)
        .map_err(|_| ServerError::ValidationError(format!("Unknown platform: {path}")))?;
    trace!("🪝️ Received {code} webhook");
    let meta = RequestMeta {
        client_ip: get_remote_ip(&req, &config),
        user_agent: req.headers().get("User-Agent").and_then(|v| v.to_str().ok()).map(String::from),
    };
    let ack = ingest::enqueue_webhook(code, &body, meta, registry.as_ref(), db.as_ref()).await?;
    Ok(HttpResponse::Ok().json(ack))
}

// ----------------------------------------------  Staff API ----------------------------------------------------
route!(order_status => Post "/orders/{order_id}/status" impl IntegrationDatabase);
/// POST /api/orders/{order_id}/status
///
/// Moves an order through the lifecycle table on behalf of staff and mirrors the result out to
/// the marketplace. The local transition is the source of truth: if the platform push fails the
/// response still reports the committed change, with `platform_notified: false`.
pub async fn order_status<B: IntegrationDatabase>(
    path: web::Path<i64>,
    body: web::Json<StatusChangeRequest>,
    order_flow: web::Data<OrderFlowApi<B>>,
    registry: web::Data<AdapterRegistry<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let target = body.status.to_canonical();
    debug!("🛵️ Staff request to move order #{order_id} to {} ({target})", body.status);
    let change = order_flow.transition_order(order_id, target).await?;
    let detail = StatusUpdateDetail { prep_minutes: body.prep_minutes, reason: body.reason.clone() };
    let platform_notified = match sync::status::push_status_update(registry.as_ref(), &change.order, target, &detail).await
    {
        Ok(result) => result.success,
        Err(e) => {
            warn!("🛵️ Status push for order #{order_id} failed: {e}");
            false
        },
    };
    let response = StatusChangeResponse {
        order: (&change.order).into(),
        previous_status: change.previous,
        platform_notified,
    };
    Ok(HttpResponse::Ok().json(response))
}

route!(sync_menu => Post "/sync/menu/{platform}" impl IntegrationDatabase);
/// POST /api/sync/menu/{platform}
pub async fn sync_menu<B: IntegrationDatabase>(
    path: web::Path<String>,
    catalog: web::Data<CatalogApi<B>>,
    registry: web::Data<AdapterRegistry<B>>,
) -> Result<HttpResponse, ServerError> {
    let code = PlatformCode::from_str(&path)
        .map_err(|_| ServerError::ValidationError(format!("Unknown platform: {path}")))?;
    let result = sync::menu::sync_menu_for_platform(catalog.as_ref(), registry.as_ref(), code).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(product_availability => Post "/products/{product_id}/availability" impl IntegrationDatabase);
/// POST /api/products/{product_id}/availability
pub async fn product_availability<B: IntegrationDatabase>(
    path: web::Path<i64>,
    body: web::Json<AvailabilityRequest>,
    catalog: web::Data<CatalogApi<B>>,
    registry: web::Data<AdapterRegistry<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    let reports =
        sync::stock::set_availability(catalog.as_ref(), registry.as_ref(), product_id, body.available).await?;
    Ok(HttpResponse::Ok().json(reports))
}
