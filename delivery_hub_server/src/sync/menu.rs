use chrono::Utc;
use delivery_hub_engine::{db_types::PlatformCode, CatalogApi, IntegrationDatabase};
use log::*;
use marketplace_tools::{AdapterRegistry, MenuEntry, MenuSyncResult};

use crate::errors::ServerError;

/// Publishes the full channel menu for one platform: every active, available product with a
/// listing on that channel, priced per the channel price row. The platform's last-sync time is
/// stamped only when the push ran to completion.
pub async fn sync_menu_for_platform<B: IntegrationDatabase>(
    catalog: &CatalogApi<B>,
    registry: &AdapterRegistry<B>,
    code: PlatformCode,
) -> Result<MenuSyncResult, ServerError> {
    let platform = catalog
        .platform_by_code(code)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("Platform {code} is not configured")))?;
    if !platform.menu_sync_enabled {
        return Err(ServerError::ValidationError(format!("Menu sync is disabled for {code}")));
    }
    let adapter = registry.resolve(platform.id).await?;
    let entries = catalog
        .channel_menu(platform.id)
        .await?
        .into_iter()
        .map(|entry| MenuEntry {
            external_sku: entry.listing.external_sku,
            name: entry.product.name,
            category: entry.product.category,
            price: entry.listing.price,
            available: entry.listing.available,
        })
        .collect::<Vec<_>>();
    info!("🗂️ Pushing {} menu entries to {code}", entries.len());
    let result = adapter.push_menu(&entries).await?;
    if !result.failed.is_empty() {
        warn!("🗂️ Menu sync to {code}: {} entries failed", result.failed.len());
    }
    catalog.stamp_platform_sync(platform.id, Utc::now()).await?;
    info!("🗂️ Menu sync to {code} complete. {} products synced", result.synced_products);
    Ok(result)
}
