//! Outbound sync services.
//!
//! Everything in this module pushes state *to* the marketplaces: mirrored order statuses, full
//! menu publishes and availability flips. These are library functions exercised by the admin
//! routes; failures against one platform or product are isolated and reported, never allowed to
//! abort the rest of a batch.

pub mod menu;
pub mod status;
pub mod stock;
