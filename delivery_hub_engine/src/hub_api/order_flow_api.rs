use std::fmt::Debug;

use log::*;

use crate::{
    canonical::{CanonicalWebhookEvent, WebhookEventType},
    db_types::{Order, OrderItem, OrderStatus},
    events::{EventProducers, OrderCreatedEvent, OrderStatusChangedEvent},
    traits::{IntegrationDatabase, IntegrationError, StatusChange},
};

/// The result of feeding one canonical webhook event through the order flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A brand-new order was materialized.
    Created(Order),
    /// The order already existed and nothing changed. Redeliveries land here.
    Duplicate(Order),
    /// An existing order moved to a new status.
    Transitioned(StatusChange),
    /// The event carried nothing actionable. The reason is logged, never guessed around.
    Ignored(String),
}

/// `OrderFlowApi` is the primary entry point for order materialization and status transitions, driven by
/// marketplace webhook events and by staff actions.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: IntegrationDatabase
{
    /// Processes one canonical webhook event.
    ///
    /// New-order events are materialized idempotently: the first delivery inserts the order and its items,
    /// every redelivery finds the existing row and returns [`WebhookOutcome::Duplicate`] without side effects.
    /// Cancellations and status updates are routed through the lifecycle table; an event that re-asserts the
    /// status the order already carries is absorbed as a duplicate.
    pub async fn process_webhook_event(
        &self,
        event: &CanonicalWebhookEvent,
    ) -> Result<WebhookOutcome, IntegrationError> {
        match event.event_type {
            WebhookEventType::NewOrder => self.process_new_order(event).await,
            WebhookEventType::CancelOrder => self.apply_status(event, Some(OrderStatus::Cancelled)).await,
            WebhookEventType::StatusUpdate => self.apply_status(event, event.status).await,
        }
    }

    async fn process_new_order(&self, event: &CanonicalWebhookEvent) -> Result<WebhookOutcome, IntegrationError> {
        let order = event.order.as_ref().ok_or_else(|| {
            IntegrationError::CorruptRecord(format!(
                "New-order event for {} on {} carries no order body",
                event.external_order_id, event.platform
            ))
        })?;
        let platform = self
            .db
            .fetch_platform_by_code(event.platform)
            .await?
            .ok_or_else(|| IntegrationError::PlatformNotFound(event.platform.to_string()))?;
        // One batched lookup for every SKU on the order, then a single insert transaction.
        let wanted = order.items.iter().map(|i| i.external_sku.clone()).collect::<Vec<_>>();
        let skus = self.db.resolve_skus(platform.id, &wanted).await?;
        let unmatched = wanted.iter().filter(|s| !skus.contains_key(s.as_str())).count();
        if unmatched > 0 {
            warn!(
                "🔄️📦️ {unmatched} of {} SKUs on order [{}] from {} have no internal product mapping",
                wanted.len(),
                order.external_id,
                event.platform
            );
        }
        let upsert = self.db.insert_order(order, &skus).await?;
        if upsert.inserted {
            self.call_order_created_hook(&upsert.order).await;
            info!("🔄️📦️ Order [{}] from {} materialized as #{}", order.external_id, event.platform, upsert.order.id);
            Ok(WebhookOutcome::Created(upsert.order))
        } else {
            debug!("🔄️📦️ Order [{}] from {} was redelivered; nothing to do", order.external_id, event.platform);
            Ok(WebhookOutcome::Duplicate(upsert.order))
        }
    }

    async fn apply_status(
        &self,
        event: &CanonicalWebhookEvent,
        target: Option<OrderStatus>,
    ) -> Result<WebhookOutcome, IntegrationError> {
        let Some(target) = target else {
            warn!(
                "🔄️📦️ Status update for [{}] on {} carried an unmapped platform status; ignoring",
                event.external_order_id, event.platform
            );
            return Ok(WebhookOutcome::Ignored("unmapped platform status".to_string()));
        };
        let platform = self
            .db
            .fetch_platform_by_code(event.platform)
            .await?
            .ok_or_else(|| IntegrationError::PlatformNotFound(event.platform.to_string()))?;
        let order = self.db.fetch_order(platform.id, &event.external_order_id).await?.ok_or_else(|| {
            IntegrationError::OrderNotFound {
                platform: event.platform,
                external_id: event.external_order_id.clone(),
            }
        })?;
        if order.status == target {
            debug!("🔄️📦️ Order #{} is already {target}; redelivery absorbed", order.id);
            return Ok(WebhookOutcome::Duplicate(order));
        }
        let change = self.transition_order(order.id, target).await?;
        Ok(WebhookOutcome::Transitioned(change))
    }

    /// Moves an order to a new status through the lifecycle table and notifies subscribers. Used by both the
    /// webhook pipeline and the staff status endpoint.
    pub async fn transition_order(&self, order_id: i64, new_status: OrderStatus) -> Result<StatusChange, IntegrationError> {
        let change = self.db.transition_order(order_id, new_status).await?;
        self.call_status_changed_hook(&change).await;
        info!("🔄️📦️ Order #{order_id} moved from {} to {}", change.previous, change.order.status);
        Ok(change)
    }

    pub async fn fetch_order_by_id(&self, order_id: i64) -> Result<Option<Order>, IntegrationError> {
        self.db.fetch_order_by_id(order_id).await
    }

    pub async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, IntegrationError> {
        self.db.fetch_order_items(order_id).await
    }

    async fn call_order_created_hook(&self, order: &Order) {
        for emitter in &self.producers.order_created_producer {
            debug!("🔄️📦️ Notifying order created subscribers");
            let event = OrderCreatedEvent::new(order.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_status_changed_hook(&self, change: &StatusChange) {
        for emitter in &self.producers.order_status_changed_producer {
            debug!("🔄️📦️ Notifying status changed subscribers");
            let event = OrderStatusChangedEvent::new(change.order.clone(), change.previous);
            emitter.publish_event(event).await;
        }
    }
}
