use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    db_types::{ChannelPrice, Platform, PlatformCode, Product},
    traits::{IntegrationDatabase, IntegrationError},
};

/// One sellable entry on a platform channel: the internal product joined with its channel price row.
#[derive(Debug, Clone)]
pub struct ChannelMenuEntry {
    pub product: Product,
    pub listing: ChannelPrice,
}

/// `CatalogApi` serves the outbound sync side of the hub: which platforms are live, what each channel menu
/// looks like, and availability fan-out.
pub struct CatalogApi<B> {
    db: B,
}

impl<B> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi")
    }
}

impl<B> CatalogApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> CatalogApi<B>
where B: IntegrationDatabase
{
    pub async fn platform(&self, platform_id: i64) -> Result<Option<Platform>, IntegrationError> {
        self.db.fetch_platform(platform_id).await
    }

    pub async fn platform_by_code(&self, code: PlatformCode) -> Result<Option<Platform>, IntegrationError> {
        self.db.fetch_platform_by_code(code).await
    }

    pub async fn enabled_platforms(&self) -> Result<Vec<Platform>, IntegrationError> {
        self.db.fetch_enabled_platforms().await
    }

    /// Builds the publishable menu for a platform: every channel price row joined with its product, keeping
    /// only products that are active and currently available. Availability is checked on the listing too, so a
    /// SKU disabled on one channel stays off that channel's menu even while the product sells elsewhere.
    /// Listings whose product row has gone missing are logged and skipped rather than failing the whole sync.
    pub async fn channel_menu(&self, platform_id: i64) -> Result<Vec<ChannelMenuEntry>, IntegrationError> {
        let listings = self.db.fetch_channel_prices_for_platform(platform_id).await?;
        let ids = listings.iter().map(|l| l.product_id).collect::<Vec<_>>();
        let products = self.db.fetch_products(&ids).await?;
        let mut entries = Vec::with_capacity(listings.len());
        for listing in listings {
            match products.get(&listing.product_id) {
                Some(product) if product.active && product.available && listing.available => {
                    entries.push(ChannelMenuEntry { product: product.clone(), listing });
                },
                Some(_) => {
                    trace!("🗂️ Product #{} is off the menu for channel price #{}", listing.product_id, listing.id);
                },
                None => {
                    warn!(
                        "🗂️ Channel price #{} references product #{} which does not exist; skipping",
                        listing.id, listing.product_id
                    );
                },
            }
        }
        Ok(entries)
    }

    /// Flips availability for a product and returns the channel rows that now need pushing to their platforms.
    pub async fn set_product_availability(
        &self,
        product_id: i64,
        available: bool,
    ) -> Result<Vec<ChannelPrice>, IntegrationError> {
        let rows = self.db.set_product_availability(product_id, available).await?;
        info!("🗂️ Product #{product_id} marked available={available} on {} channel(s)", rows.len());
        Ok(rows)
    }

    /// Records the completion time of a menu sync. Only called after every entry was pushed.
    pub async fn stamp_platform_sync(&self, platform_id: i64, at: DateTime<Utc>) -> Result<(), IntegrationError> {
        self.db.stamp_platform_sync(platform_id, at).await
    }
}
