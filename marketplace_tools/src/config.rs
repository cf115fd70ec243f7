use std::time::Duration;

use delivery_hub_engine::db_types::{Platform, PlatformCode};
use dh_common::Secret;
use log::*;

/// Everything an adapter needs to talk to one marketplace: credentials from the platform row, plus the base
/// URL and timeout, which default per platform and can be overridden from the environment.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub platform_id: i64,
    pub code: PlatformCode,
    pub store_id: String,
    pub api_key: Secret<String>,
    pub webhook_secret: Secret<String>,
    pub base_url: String,
    pub timeout: Duration,
}

const DEFAULT_TIMEOUT_SECS: u64 = 15;

impl AdapterConfig {
    /// Builds the config for a platform row. Missing secrets are logged but not fatal: an adapter without an
    /// API key can still verify and parse inbound webhooks, and its outbound calls fail with
    /// [`crate::AdapterError::MissingCredentials`].
    pub fn for_platform(platform: &Platform) -> Self {
        let code = platform.code;
        if platform.api_key.is_empty() {
            warn!("🔐️ No API key configured for {code}; outbound calls to it will fail");
        }
        if platform.webhook_secret.is_empty() {
            warn!("🔐️ No webhook secret configured for {code}; its webhooks cannot be verified");
        }
        let base_url = base_url_from_env(code);
        let timeout = timeout_from_env();
        Self {
            platform_id: platform.id,
            code,
            store_id: platform.store_id.clone(),
            api_key: platform.api_key.clone(),
            webhook_secret: platform.webhook_secret.clone(),
            base_url,
            timeout,
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty()
    }
}

fn base_url_from_env(code: PlatformCode) -> String {
    let (var, default) = match code {
        PlatformCode::Rappi => ("DH_RAPPI_BASE_URL", "https://services.rappi.com/api/restaurants-integrations-public-api"),
        PlatformCode::PedidosYa => ("DH_PEDIDOSYA_BASE_URL", "https://api.pedidosya.com/v2"),
    };
    std::env::var(var).unwrap_or_else(|_| {
        debug!("{var} not set, using {default}");
        default.to_string()
    })
}

fn timeout_from_env() -> Duration {
    let secs = std::env::var("DH_ADAPTER_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    Duration::from_secs(secs)
}
