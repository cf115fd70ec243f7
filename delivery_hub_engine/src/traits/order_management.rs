use crate::{
    canonical::CanonicalOrder,
    db_types::{Order, OrderId, OrderItem, OrderStatus},
    traits::{IntegrationError, OrderUpsert, SkuMap, StatusChange},
};

/// Order materialization and lifecycle-checked status writes.
///
/// The two invariants this trait is responsible for:
/// * **Idempotency** — inserting the same `(platform, external id)` twice must not create two orders.
/// * **Serialized transitions** — a status write is a single atomic read-modify-write; two concurrent writers
///   against the same order never interleave, and the loser is judged against the winner's committed state by
///   the transition table.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Takes a canonical order and, in a single atomic transaction, stores the order and its line items.
    /// Items are linked to internal products through the given SKU map. This call is idempotent: redelivery
    /// of an order that already exists returns the stored order with `inserted == false` and changes nothing.
    async fn insert_order(&self, order: &CanonicalOrder, skus: &SkuMap) -> Result<OrderUpsert, IntegrationError>;

    /// Fetches the order for the given platform row and external id.
    async fn fetch_order(&self, platform_id: i64, external_id: &OrderId) -> Result<Option<Order>, IntegrationError>;

    /// Fetches an order by its internal row id.
    async fn fetch_order_by_id(&self, order_id: i64) -> Result<Option<Order>, IntegrationError>;

    /// Moves the order to `new_status` under an exclusive read-modify-write. Fails with
    /// [`IntegrationError::InvalidStateTransition`] when the transition table forbids the move from the
    /// *currently committed* status, which is re-read inside the write lock.
    async fn transition_order(&self, order_id: i64, new_status: OrderStatus) -> Result<StatusChange, IntegrationError>;

    /// The stored line items for an order.
    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, IntegrationError>;
}
