//! `SqliteDatabase` is a concrete implementation of the Delivery Hub storage backend.
//!
//! Unsurprisingly, it uses SQLite, and implements all the traits defined in the [`crate::traits`] module.
use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::debug;
use sqlx::SqlitePool;

use super::db::{catalog, db_url, jobs, new_pool, orders, platforms};
use crate::{
    canonical::CanonicalOrder,
    db_types::{ChannelPrice, NewWebhookJob, Order, OrderId, OrderItem, OrderStatus, Platform, PlatformCode, WebhookJob},
    traits::{
        CatalogManagement,
        IntegrationDatabase,
        IntegrationError,
        JobOutcome,
        JobQueue,
        OrderManagement,
        OrderUpsert,
        PlatformManagement,
        ProductMap,
        SkuMap,
        StatusChange,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database handle using `DH_DATABASE_URL` for the connection string.
    pub async fn new(max_connections: u32) -> Result<Self, IntegrationError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, IntegrationError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&mut self) -> Result<(), IntegrationError> {
        self.pool.close().await;
        Ok(())
    }
}

impl IntegrationDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn ping(&self) -> Result<(), IntegrationError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("SELECT 1").execute(&mut *conn).await?;
        Ok(())
    }
}

impl PlatformManagement for SqliteDatabase {
    async fn fetch_platform(&self, platform_id: i64) -> Result<Option<Platform>, IntegrationError> {
        let mut conn = self.pool.acquire().await?;
        platforms::fetch_platform(platform_id, &mut conn).await
    }

    async fn fetch_platform_by_code(&self, code: PlatformCode) -> Result<Option<Platform>, IntegrationError> {
        let mut conn = self.pool.acquire().await?;
        platforms::fetch_platform_by_code(code, &mut conn).await
    }

    async fn fetch_enabled_platforms(&self) -> Result<Vec<Platform>, IntegrationError> {
        let mut conn = self.pool.acquire().await?;
        platforms::fetch_enabled_platforms(&mut conn).await
    }

    async fn stamp_platform_sync(&self, platform_id: i64, at: DateTime<Utc>) -> Result<(), IntegrationError> {
        let mut conn = self.pool.acquire().await?;
        platforms::stamp_platform_sync(platform_id, at, &mut conn).await
    }
}

impl OrderManagement for SqliteDatabase {
    /// Stores the order and its items in a single transaction. The UNIQUE `(platform_id, external_id)`
    /// constraint plus the read inside the transaction make this idempotent under redelivery.
    async fn insert_order(&self, order: &CanonicalOrder, skus: &SkuMap) -> Result<OrderUpsert, IntegrationError> {
        let platform = self
            .fetch_platform_by_code(order.platform)
            .await?
            .ok_or_else(|| IntegrationError::PlatformNotFound(order.platform.to_string()))?;
        let mut tx = self.pool.begin().await?;
        let upsert = orders::idempotent_insert(order, platform.id, skus, &mut *tx).await?;
        tx.commit().await?;
        if upsert.inserted {
            debug!("🗃️ Order {} on {} saved with id {}", order.external_id, order.platform, upsert.order.id);
        }
        Ok(upsert)
    }

    async fn fetch_order(&self, platform_id: i64, external_id: &OrderId) -> Result<Option<Order>, IntegrationError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(platform_id, external_id, &mut conn).await
    }

    async fn fetch_order_by_id(&self, order_id: i64) -> Result<Option<Order>, IntegrationError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_id(order_id, &mut conn).await
    }

    /// Runs on an autocommit connection: the guarded UPDATE inside [`orders::transition_status`] is atomic on
    /// its own, and wrapping the retry loop in a transaction would pin the snapshot and keep the re-read from
    /// ever seeing a competitor's commit.
    async fn transition_order(&self, order_id: i64, new_status: OrderStatus) -> Result<StatusChange, IntegrationError> {
        let mut conn = self.pool.acquire().await?;
        let change = orders::transition_status(order_id, new_status, &mut conn).await?;
        debug!("🗃️ Order id {order_id} moved {} → {new_status}", change.previous);
        Ok(change)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, IntegrationError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_items(order_id, &mut conn).await
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn resolve_skus(&self, platform_id: i64, skus: &[String]) -> Result<SkuMap, IntegrationError> {
        let mut conn = self.pool.acquire().await?;
        catalog::resolve_skus(platform_id, skus, &mut conn).await
    }

    async fn fetch_channel_prices_for_platform(
        &self,
        platform_id: i64,
    ) -> Result<Vec<ChannelPrice>, IntegrationError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_channel_prices_for_platform(platform_id, &mut conn).await
    }

    async fn fetch_channel_prices_for_product(&self, product_id: i64) -> Result<Vec<ChannelPrice>, IntegrationError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_channel_prices_for_product(product_id, &mut conn).await
    }

    async fn set_product_availability(
        &self,
        product_id: i64,
        available: bool,
    ) -> Result<Vec<ChannelPrice>, IntegrationError> {
        let mut tx = self.pool.begin().await?;
        let rows = catalog::set_product_availability(product_id, available, &mut *tx).await?;
        tx.commit().await?;
        Ok(rows)
    }

    async fn fetch_products(&self, product_ids: &[i64]) -> Result<ProductMap, IntegrationError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_products(product_ids, &mut conn).await
    }
}

impl JobQueue for SqliteDatabase {
    async fn enqueue_job(&self, job: NewWebhookJob) -> Result<bool, IntegrationError> {
        let mut conn = self.pool.acquire().await?;
        jobs::enqueue(job, &mut conn).await
    }

    async fn claim_due_jobs(&self, limit: i64) -> Result<Vec<WebhookJob>, IntegrationError> {
        let mut conn = self.pool.acquire().await?;
        jobs::claim_due(limit, &mut conn).await
    }

    async fn complete_job(
        &self,
        job_id: i64,
        outcome: JobOutcome,
        base_backoff: Duration,
        max_attempts: i64,
    ) -> Result<(), IntegrationError> {
        let mut tx = self.pool.begin().await?;
        jobs::complete(job_id, outcome, base_backoff, max_attempts, &mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn queue_depth(&self) -> Result<i64, IntegrationError> {
        let mut conn = self.pool.acquire().await?;
        jobs::queue_depth(&mut conn).await
    }

    async fn requeue_stale_jobs(&self, stale_after: Duration) -> Result<u64, IntegrationError> {
        let mut conn = self.pool.acquire().await?;
        jobs::requeue_stale(stale_after, &mut conn).await
    }
}
