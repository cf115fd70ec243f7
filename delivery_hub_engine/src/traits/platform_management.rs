use chrono::{DateTime, Utc};

use crate::{
    db_types::{Platform, PlatformCode},
    traits::IntegrationError,
};

/// Read and bookkeeping access to the marketplace rows. The adapter registry resolves platforms through this
/// trait; the outbound sync services stamp last-sync times through it.
#[allow(async_fn_in_trait)]
pub trait PlatformManagement {
    /// Fetches the platform with the given row id, or `None` if it does not exist.
    async fn fetch_platform(&self, platform_id: i64) -> Result<Option<Platform>, IntegrationError>;

    /// Fetches the platform with the given code, or `None` if no row carries it.
    async fn fetch_platform_by_code(&self, code: PlatformCode) -> Result<Option<Platform>, IntegrationError>;

    /// All platforms with the enabled flag set. Disabled platforms are never dispatched to.
    async fn fetch_enabled_platforms(&self) -> Result<Vec<Platform>, IntegrationError>;

    /// Records the completion time of a menu sync. Only called after the sync ran to completion.
    async fn stamp_platform_sync(&self, platform_id: i64, at: DateTime<Utc>) -> Result<(), IntegrationError>;
}
