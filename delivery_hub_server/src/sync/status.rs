use delivery_hub_engine::{
    db_types::{Order, OrderStatus},
    traits::PlatformManagement,
};
use log::*;
use marketplace_tools::{AdapterRegistry, StatusUpdateDetail, StatusUpdateResult};

use crate::errors::ServerError;

/// Mirrors a committed status change out to the order's marketplace. The local transition has
/// already been stored by the time this runs, so a platform-side failure is reported but does not
/// roll anything back.
pub async fn push_status_update<B: PlatformManagement + Send + Sync>(
    registry: &AdapterRegistry<B>,
    order: &Order,
    status: OrderStatus,
    detail: &StatusUpdateDetail,
) -> Result<StatusUpdateResult, ServerError> {
    let adapter = registry.resolve(order.platform_id).await?;
    let code = adapter.platform_code();
    let result = adapter.update_order_status(order, status, detail).await?;
    match (&result.success, &result.platform_status) {
        (true, Some(platform_status)) => {
            info!("🛵️ Order {} on {code} moved to {platform_status}", order.external_id);
        },
        _ => {
            let reason = result.error.as_deref().unwrap_or("unknown");
            warn!("🛵️ Could not mirror {status} for order {} on {code}: {reason}", order.external_id);
        },
    }
    Ok(result)
}
