use std::collections::HashMap;

use crate::db_types::{Order, OrderStatus, Product};

/// Result of an idempotent order insert. `inserted` is false when the order already existed, i.e. the webhook
/// was a redelivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderUpsert {
    pub order: Order,
    pub inserted: bool,
}

/// A committed status change, carrying the state the order was in before the write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub order: Order,
    pub previous: OrderStatus,
}

/// External SKU to internal product map, built from one batched lookup per order.
pub type SkuMap = HashMap<String, Product>;

/// Products keyed by internal id.
pub type ProductMap = HashMap<i64, Product>;

/// What a pipeline worker reports back to the queue after running a job.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    /// The job finished; mark it done.
    Done,
    /// Transient failure; schedule a retry with backoff, or dead-letter when attempts are exhausted.
    Retry(String),
    /// Permanent failure; dead-letter immediately.
    Dead(String),
}
