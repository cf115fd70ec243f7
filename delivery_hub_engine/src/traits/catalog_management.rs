use crate::{
    db_types::ChannelPrice,
    traits::{IntegrationError, ProductMap, SkuMap},
};

/// Access to the product catalogue from the integration side: channel-price rows (the product ↔ external SKU
/// join surface) and batched SKU resolution for incoming orders.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    /// Resolves a set of external SKUs for one platform in a single round trip, returning a SKU → product map.
    /// SKUs with no mapping are simply absent from the map; the caller decides how loudly to complain.
    async fn resolve_skus(&self, platform_id: i64, skus: &[String]) -> Result<SkuMap, IntegrationError>;

    /// All channel-price rows for a platform, joined with their product's active/availability flags applied
    /// by the caller.
    async fn fetch_channel_prices_for_platform(&self, platform_id: i64) -> Result<Vec<ChannelPrice>, IntegrationError>;

    /// All channel-price rows for one product across every platform.
    async fn fetch_channel_prices_for_product(&self, product_id: i64) -> Result<Vec<ChannelPrice>, IntegrationError>;

    /// Flips the availability flag on every channel-price row for the product, returning the affected rows.
    async fn set_product_availability(
        &self,
        product_id: i64,
        available: bool,
    ) -> Result<Vec<ChannelPrice>, IntegrationError>;

    /// Products for a set of ids, keyed by id. Used to join menu rows to product names and flags.
    async fn fetch_products(&self, product_ids: &[i64]) -> Result<ProductMap, IntegrationError>;
}
