use delivery_hub_engine::{CatalogApi, IntegrationDatabase};
use log::*;
use marketplace_tools::{AdapterRegistry, AvailabilityUpdate};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

/// What happened on one channel during an availability fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelAvailabilityReport {
    pub platform_id: i64,
    pub external_sku: String,
    pub success: bool,
    pub error: Option<String>,
}

/// Flips availability for a product locally, then fans the change out to every channel the product
/// is listed on. Each channel push stands alone: one platform being down leaves the marks on the
/// others in place, and the failure shows up in that channel's report entry.
pub async fn set_availability<B: IntegrationDatabase>(
    catalog: &CatalogApi<B>,
    registry: &AdapterRegistry<B>,
    product_id: i64,
    available: bool,
) -> Result<Vec<ChannelAvailabilityReport>, ServerError> {
    let listings = catalog.set_product_availability(product_id, available).await?;
    if listings.is_empty() {
        return Err(ServerError::NotFound(format!("Product {product_id} has no channel listings")));
    }
    let mut reports = Vec::with_capacity(listings.len());
    for listing in listings {
        let update = AvailabilityUpdate { external_sku: listing.external_sku.clone(), available };
        let outcome = match registry.resolve(listing.platform_id).await {
            Ok(adapter) => adapter.update_product_availability(&update).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match outcome {
            Ok(()) => {
                debug!("📦️ SKU {} on platform {} marked available={available}", listing.external_sku, listing.platform_id);
                reports.push(ChannelAvailabilityReport {
                    platform_id: listing.platform_id,
                    external_sku: listing.external_sku,
                    success: true,
                    error: None,
                });
            },
            Err(e) => {
                warn!(
                    "📦️ Could not push availability for SKU {} to platform {}: {e}",
                    listing.external_sku, listing.platform_id
                );
                reports.push(ChannelAvailabilityReport {
                    platform_id: listing.platform_id,
                    external_sku: listing.external_sku,
                    success: false,
                    error: Some(e),
                });
            },
        }
    }
    Ok(reports)
}
