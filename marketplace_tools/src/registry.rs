//! The adapter registry.
//!
//! One adapter instance per platform row, shared by the signature gate, the pipeline workers and the sync
//! services. Instances are cached under an async `RwLock`; resolution is a concurrent read, invalidation is
//! an explicit serialized write (after credential changes, so the next resolve rebuilds with fresh secrets).
use std::{collections::HashMap, sync::Arc};

use delivery_hub_engine::{
    db_types::{Platform, PlatformCode},
    traits::{IntegrationError, PlatformManagement},
};
use log::*;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::{AdapterConfig, AdapterError, MarketplaceAdapter, PedidosYaAdapter, RappiAdapter};

#[derive(Debug, Error)]
pub enum RegistryError {
    /// The platform row does not exist. Distinct from [`RegistryError::NoAdapterImplemented`]: this one means
    /// the code is not provisioned at all.
    #[error("Platform {0} is not registered")]
    PlatformNotFound(String),
    /// The platform row exists but no adapter has been written for its code.
    #[error("No adapter is implemented for {0}")]
    NoAdapterImplemented(PlatformCode),
    #[error("Could not construct the {0} adapter: {1}")]
    AdapterInit(PlatformCode, String),
    #[error("Storage error: {0}")]
    Backend(#[from] IntegrationError),
}

/// A platform that `list_active_adapters` could not resolve, with the reason it was skipped.
#[derive(Debug, Clone)]
pub struct SkippedPlatform {
    pub platform_id: i64,
    pub code: PlatformCode,
    pub reason: String,
}

type AdapterFactory = fn(AdapterConfig) -> Result<Arc<dyn MarketplaceAdapter>, AdapterError>;

/// The static code to constructor table. Adding a platform means adding one row here.
const FACTORIES: &[(PlatformCode, AdapterFactory)] = &[
    (PlatformCode::Rappi, |config| Ok(Arc::new(RappiAdapter::new(config)?))),
    (PlatformCode::PedidosYa, |config| Ok(Arc::new(PedidosYaAdapter::new(config)?))),
];

fn factory_for(code: PlatformCode) -> Option<AdapterFactory> {
    FACTORIES.iter().find(|(c, _)| *c == code).map(|(_, f)| *f)
}

/// All platform codes an adapter exists for. Reported by the health endpoint.
pub fn implemented_codes() -> Vec<PlatformCode> {
    FACTORIES.iter().map(|(c, _)| *c).collect()
}

pub struct AdapterRegistry<B> {
    db: B,
    cache: RwLock<HashMap<i64, Arc<dyn MarketplaceAdapter>>>,
}

impl<B> AdapterRegistry<B>
where B: PlatformManagement + Send + Sync
{
    pub fn new(db: B) -> Self {
        Self { db, cache: RwLock::new(HashMap::new()) }
    }

    /// True if an adapter implementation exists for the code, regardless of provisioning.
    pub fn has_adapter(&self, code: PlatformCode) -> bool {
        factory_for(code).is_some()
    }

    /// Resolves the shared adapter instance for a platform row, building and caching it on first use.
    pub async fn resolve(&self, platform_id: i64) -> Result<Arc<dyn MarketplaceAdapter>, RegistryError> {
        if let Some(adapter) = self.cache.read().await.get(&platform_id) {
            return Ok(Arc::clone(adapter));
        }
        let platform = self
            .db
            .fetch_platform(platform_id)
            .await?
            .ok_or_else(|| RegistryError::PlatformNotFound(platform_id.to_string()))?;
        self.build_and_cache(&platform).await
    }

    pub async fn resolve_by_code(&self, code: PlatformCode) -> Result<Arc<dyn MarketplaceAdapter>, RegistryError> {
        let platform =
            self.db.fetch_platform_by_code(code).await?.ok_or_else(|| RegistryError::PlatformNotFound(code.to_string()))?;
        if let Some(adapter) = self.cache.read().await.get(&platform.id) {
            return Ok(Arc::clone(adapter));
        }
        self.build_and_cache(&platform).await
    }

    /// Resolves adapters for every enabled platform. Platforms that cannot be resolved are reported in the
    /// skipped list with a reason instead of failing the whole sweep.
    pub async fn list_active_adapters(
        &self,
    ) -> Result<(Vec<(Platform, Arc<dyn MarketplaceAdapter>)>, Vec<SkippedPlatform>), RegistryError> {
        let platforms = self.db.fetch_enabled_platforms().await?;
        let mut active = Vec::with_capacity(platforms.len());
        let mut skipped = Vec::new();
        for platform in platforms {
            match self.resolve(platform.id).await {
                Ok(adapter) => active.push((platform, adapter)),
                Err(e) => {
                    warn!("🔌️ Skipping platform {} ({}): {e}", platform.code, platform.id);
                    skipped.push(SkippedPlatform { platform_id: platform.id, code: platform.code, reason: e.to_string() });
                },
            }
        }
        Ok((active, skipped))
    }

    /// Drops the cached instance for one platform, so the next resolve rebuilds it from the current row.
    pub async fn invalidate(&self, platform_id: i64) {
        self.cache.write().await.remove(&platform_id);
        debug!("🔌️ Adapter cache entry for platform {platform_id} invalidated");
    }

    pub async fn clear(&self) {
        self.cache.write().await.clear();
        debug!("🔌️ Adapter cache cleared");
    }

    async fn build_and_cache(&self, platform: &Platform) -> Result<Arc<dyn MarketplaceAdapter>, RegistryError> {
        let factory = factory_for(platform.code).ok_or(RegistryError::NoAdapterImplemented(platform.code))?;
        let config = AdapterConfig::for_platform(platform);
        let adapter =
            factory(config).map_err(|e| RegistryError::AdapterInit(platform.code, e.to_string()))?;
        let mut cache = self.cache.write().await;
        let adapter = cache.entry(platform.id).or_insert(adapter);
        info!("🔌️ Adapter for {} (platform {}) ready", platform.code, platform.id);
        Ok(Arc::clone(adapter))
    }
}
