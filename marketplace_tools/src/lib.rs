//! Marketplace adapters for the Delivery Hub.
//!
//! Each supported marketplace gets one [`MarketplaceAdapter`] implementation that owns everything
//! platform-specific: webhook signature validation, payload parsing into the canonical model, and the
//! outbound API client for status, menu and availability pushes. Nothing outside this crate knows a
//! platform field name.
mod adapter;
mod config;
mod data_objects;
mod error;
mod pedidosya;
mod rappi;
mod registry;
mod signing;
mod token;

pub use adapter::MarketplaceAdapter;
pub use config::AdapterConfig;
pub use data_objects::{
    AvailabilityUpdate,
    MenuEntry,
    MenuSyncFailure,
    MenuSyncResult,
    StatusUpdateDetail,
    StatusUpdateResult,
};
pub use error::AdapterError;
pub use pedidosya::PedidosYaAdapter;
pub use rappi::RappiAdapter;
pub use registry::{implemented_codes, AdapterRegistry, RegistryError, SkippedPlatform};
pub use signing::{hmac_base64, hmac_hex, verify_base64_signature, verify_hex_signature};
