use crate::db_types::{Order, OrderStatus};

/// Fired once per order, on the first successful materialization of a webhook. Redeliveries of the same
/// external order do not fire it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Fired after a status transition has been committed. `order` carries the new status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderStatusChangedEvent {
    pub order: Order,
    pub previous: OrderStatus,
}

impl OrderStatusChangedEvent {
    pub fn new(order: Order, previous: OrderStatus) -> Self {
        Self { order, previous }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderCreated(OrderCreatedEvent),
    OrderStatusChanged(OrderStatusChangedEvent),
}
