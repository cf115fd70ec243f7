use chrono::{DateTime, Duration, Utc};
use delivery_hub_engine::{
    canonical::CanonicalOrder,
    db_types::{
        ChannelPrice,
        NewWebhookJob,
        Order,
        OrderId,
        OrderItem,
        OrderStatus,
        Platform,
        PlatformCode,
        WebhookJob,
    },
    traits::{
        CatalogManagement,
        JobOutcome,
        JobQueue,
        OrderManagement,
        OrderUpsert,
        PlatformManagement,
        ProductMap,
        SkuMap,
        StatusChange,
    },
    IntegrationDatabase,
    IntegrationError,
};
use mockall::mock;

mock! {
    pub Backend {}

    impl Clone for Backend {
        fn clone(&self) -> Self;
    }

    impl PlatformManagement for Backend {
        async fn fetch_platform(&self, platform_id: i64) -> Result<Option<Platform>, IntegrationError>;
        async fn fetch_platform_by_code(&self, code: PlatformCode) -> Result<Option<Platform>, IntegrationError>;
        async fn fetch_enabled_platforms(&self) -> Result<Vec<Platform>, IntegrationError>;
        async fn stamp_platform_sync(&self, platform_id: i64, at: DateTime<Utc>) -> Result<(), IntegrationError>;
    }

    impl OrderManagement for Backend {
        async fn insert_order(&self, order: &CanonicalOrder, skus: &SkuMap) -> Result<OrderUpsert, IntegrationError>;
        async fn fetch_order(&self, platform_id: i64, external_id: &OrderId) -> Result<Option<Order>, IntegrationError>;
        async fn fetch_order_by_id(&self, order_id: i64) -> Result<Option<Order>, IntegrationError>;
        async fn transition_order(&self, order_id: i64, new_status: OrderStatus) -> Result<StatusChange, IntegrationError>;
        async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, IntegrationError>;
    }

    impl CatalogManagement for Backend {
        async fn resolve_skus(&self, platform_id: i64, skus: &[String]) -> Result<SkuMap, IntegrationError>;
        async fn fetch_channel_prices_for_platform(&self, platform_id: i64) -> Result<Vec<ChannelPrice>, IntegrationError>;
        async fn fetch_channel_prices_for_product(&self, product_id: i64) -> Result<Vec<ChannelPrice>, IntegrationError>;
        async fn set_product_availability(&self, product_id: i64, available: bool) -> Result<Vec<ChannelPrice>, IntegrationError>;
        async fn fetch_products(&self, product_ids: &[i64]) -> Result<ProductMap, IntegrationError>;
    }

    impl JobQueue for Backend {
        async fn enqueue_job(&self, job: NewWebhookJob) -> Result<bool, IntegrationError>;
        async fn claim_due_jobs(&self, limit: i64) -> Result<Vec<WebhookJob>, IntegrationError>;
        async fn complete_job(
            &self,
            job_id: i64,
            outcome: JobOutcome,
            base_backoff: Duration,
            max_attempts: i64,
        ) -> Result<(), IntegrationError>;
        async fn queue_depth(&self) -> Result<i64, IntegrationError>;
        async fn requeue_stale_jobs(&self, stale_after: Duration) -> Result<u64, IntegrationError>;
    }

    impl IntegrationDatabase for Backend {
        fn url(&self) -> &str;
        async fn ping(&self) -> Result<(), IntegrationError>;
    }
}
