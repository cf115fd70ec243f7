//! Delivery Hub Engine
//!
//! The engine holds everything about marketplace orders that is *not* platform-specific or HTTP-specific:
//!
//! 1. The canonical vocabulary ([`mod@db_types`] and [`mod@canonical`]): one normalized order shape and status enum
//!    that every marketplace format is translated into and out of.
//! 2. The order lifecycle rules ([`mod@lifecycle`]): a fixed directed transition table over the canonical statuses.
//!    All status writes go through it; there is no way to resurrect a cancelled or delivered order.
//! 3. The storage contract ([`mod@traits`]) and its SQLite implementation. Backends expose split traits
//!    (platforms, orders, catalog, job queue) so that callers can be generic over exactly the capabilities they use.
//! 4. The event hooks ([`mod@events`]): a small pub-sub channel that the server uses to notify staff UIs when
//!    orders are created or change status.
//!
//! The public entry points are [`OrderFlowApi`] (webhook-driven order materialization and status transitions) and
//! [`CatalogApi`] (platform and channel-price reads for the outbound sync services).
pub mod canonical;
pub mod db_types;
pub mod events;
pub mod lifecycle;
pub mod traits;

mod hub_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use hub_api::{
    catalog_api::{CatalogApi, ChannelMenuEntry},
    order_flow_api::{OrderFlowApi, WebhookOutcome},
};
pub use traits::{IntegrationDatabase, IntegrationError};
