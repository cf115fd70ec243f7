//! Storage contracts for the Delivery Hub.
//!
//! The engine does not own a database; it defines the interface contracts that a storage backend must expose.
//! The contracts are split by capability so callers can be generic over exactly what they use:
//!
//! * [`PlatformManagement`] — marketplace rows and their credentials.
//! * [`OrderManagement`] — idempotent order materialization and lifecycle-checked status writes.
//! * [`CatalogManagement`] — products, channel prices and batched SKU resolution.
//! * [`JobQueue`] — the durable, deduplicating webhook job queue.
//!
//! [`IntegrationDatabase`] is the umbrella bound for components that need the whole backend (the pipeline,
//! mainly). The SQLite implementation lives in [`crate::sqlite`].
mod catalog_management;
mod data_objects;
mod errors;
mod job_queue;
mod order_management;
mod platform_management;

pub use catalog_management::CatalogManagement;
pub use data_objects::{JobOutcome, OrderUpsert, ProductMap, SkuMap, StatusChange};
pub use errors::IntegrationError;
pub use job_queue::JobQueue;
pub use order_management::OrderManagement;
pub use platform_management::PlatformManagement;

/// The full backend contract. `Clone` is required because every worker and request handler owns its own handle,
/// which in practice is a cheap pool clone.
pub trait IntegrationDatabase:
    Clone + PlatformManagement + OrderManagement + CatalogManagement + JobQueue + Send + Sync
{
    /// The URL of the underlying database, for diagnostics.
    fn url(&self) -> &str;

    /// A cheap liveness check used by the health endpoint.
    #[allow(async_fn_in_trait)]
    async fn ping(&self) -> Result<(), IntegrationError>;
}
