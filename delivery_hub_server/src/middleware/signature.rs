//! Webhook signature gate for Actix Web.
//!
//! Every request entering the `/webhook` scope passes through this middleware before any handler
//! runs. It resolves the platform adapter named in the path, checks the platform's signature
//! header over the raw body with constant-time comparison, and bounds the JSON nesting depth of
//! the payload. Requests that fail any check are rejected before the body is ever parsed.
//!
//! The raw body is consumed for verification and re-injected into the request so that downstream
//! extractors see an untouched payload.

use std::{
    future::{ready, Ready},
    rc::Rc,
    str::FromStr,
    sync::Arc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use delivery_hub_engine::{db_types::PlatformCode, traits::PlatformManagement};
use log::*;
use marketplace_tools::AdapterRegistry;

use crate::errors::ServerError;

/// Hard cap on webhook body size. Marketplace payloads are a few kilobytes; anything near this
/// limit is not a legitimate order.
pub const MAX_WEBHOOK_BODY_BYTES: usize = 1024 * 1024;

pub struct SignatureGateFactory<B: PlatformManagement + Send + Sync> {
    registry: Arc<AdapterRegistry<B>>,
    max_json_depth: usize,
    // If true, signature checks are skipped. Depth and size bounds still apply.
    skip_signature_checks: bool,
}

impl<B: PlatformManagement + Send + Sync> SignatureGateFactory<B> {
    pub fn new(registry: Arc<AdapterRegistry<B>>, max_json_depth: usize, skip_signature_checks: bool) -> Self {
        Self { registry, max_json_depth, skip_signature_checks }
    }
}

impl<S, R, B> Transform<S, ServiceRequest> for SignatureGateFactory<B>
where
    S: Service<ServiceRequest, Response = ServiceResponse<R>, Error = Error> + 'static,
    S::Future: 'static,
    R: 'static,
    B: PlatformManagement + Send + Sync + 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<R>;
    type Transform = SignatureGateService<S, B>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SignatureGateService {
            registry: Arc::clone(&self.registry),
            max_json_depth: self.max_json_depth,
            skip_signature_checks: self.skip_signature_checks,
            service: Rc::new(service),
        }))
    }
}

pub struct SignatureGateService<S, B: PlatformManagement + Send + Sync> {
    registry: Arc<AdapterRegistry<B>>,
    max_json_depth: usize,
    skip_signature_checks: bool,
    service: Rc<S>,
}

impl<S, R, B> Service<ServiceRequest> for SignatureGateService<S, B>
where
    S: Service<ServiceRequest, Response = ServiceResponse<R>, Error = Error> + 'static,
    S::Future: 'static,
    R: 'static,
    B: PlatformManagement + Send + Sync + 'static,
{
    type Error = Error;
    type Future = futures::future::LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<R>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let registry = Arc::clone(&self.registry);
        let max_json_depth = self.max_json_depth;
        let skip_signature_checks = self.skip_signature_checks;
        Box::pin(async move {
            trace!("🔐️ Checking webhook signature for {}", req.path());
            let code = platform_code_from_path(req.path())?;
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract webhook body: {e:?}");
                ServerError::ValidationError("Failed to read request body.".into())
            })?;
            if data.len() > MAX_WEBHOOK_BODY_BYTES {
                warn!("🔐️ Rejecting {} webhook: body of {} bytes exceeds the cap", code, data.len());
                return Err(ServerError::ValidationError("Payload too large.".into()).into());
            }
            let depth = crate::helpers::json_nesting_depth(&data);
            if depth > max_json_depth {
                warn!("🔐️ Rejecting {code} webhook: JSON nesting depth {depth} exceeds {max_json_depth}");
                return Err(ServerError::ValidationError("Payload nesting too deep.".into()).into());
            }
            let adapter = registry.resolve_by_code(code).await.map_err(ServerError::from)?;
            if skip_signature_checks {
                trace!("🔐️ Signature checks are disabled. Allowing {code} request.");
            } else {
                let header = adapter.signature_header();
                let signature = req
                    .headers()
                    .get(header)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        warn!("🔐️ No {header} signature on {code} webhook. Denying access.");
                        ServerError::AuthenticationError("Missing webhook signature.".into())
                    })?;
                if !adapter.validate_webhook_signature(signature, data.as_ref()) {
                    warn!("🔐️ Invalid {header} signature on {code} webhook. Denying access.");
                    return Err(ServerError::AuthenticationError("Invalid webhook signature.".into()).into());
                }
                trace!("🔐️ Signature check for {code} webhook ✅️");
            }
            req.set_payload(bytes_to_payload(data));
            service.call(req).await
        })
    }
}

/// The gate runs before resource matching, so the platform segment is read straight off the path.
fn platform_code_from_path(path: &str) -> Result<PlatformCode, ServerError> {
    let segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    PlatformCode::from_str(segment)
        .map_err(|_| ServerError::ValidationError(format!("Unknown platform: {segment}")))
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}

#[cfg(test)]
mod test {
    use delivery_hub_engine::db_types::PlatformCode;

    use super::platform_code_from_path;

    #[test]
    fn extracts_platform_from_webhook_paths() {
        assert_eq!(platform_code_from_path("/webhook/rappi").unwrap(), PlatformCode::Rappi);
        assert_eq!(platform_code_from_path("/webhook/pedidosya/").unwrap(), PlatformCode::PedidosYa);
        assert!(platform_code_from_path("/webhook/doordash").is_err());
        assert!(platform_code_from_path("/webhook/").is_err());
    }
}
