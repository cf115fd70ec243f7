//! Order event fan-out.
//!
//! The order flow publishes two kinds of event: an order was created, and an order changed status.
//! Staff-facing integrations (ticket printers, websocket pushes) register one async handler per kind and
//! receive events through a bounded channel. Handler invocations run as independent tasks so a slow printer
//! never stalls order materialization, and in-flight invocations are drained before shutdown completes.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Upper bound on concurrently running handler invocations per event kind. Past this, dispatch waits for the
/// oldest invocation before accepting the next event.
const MAX_IN_FLIGHT: usize = 64;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, listener) = mpsc::channel(buffer_size);
        Self { listener, sender, handler }
    }

    /// Hands out a producer half. The dispatch loop ends once every producer has been dropped.
    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer { sender: self.sender.clone() }
    }

    /// Runs the dispatch loop until the last producer is dropped, then drains in-flight invocations.
    pub async fn start_handler(mut self) {
        debug!("📬️ Order event dispatch started");
        // The loop must end when the last external producer goes away, so the internal sender cannot be
        // allowed to keep the channel open.
        drop(self.sender);
        let mut in_flight: JoinSet<()> = JoinSet::new();
        while let Some(event) = self.listener.recv().await {
            let handler = Arc::clone(&self.handler);
            in_flight.spawn(async move { (handler)(event).await });
            while in_flight.len() >= MAX_IN_FLIGHT {
                reap(in_flight.join_next().await);
            }
        }
        while let Some(result) = in_flight.join_next().await {
            reap(Some(result));
        }
        debug!("📬️ Order event dispatch drained and shut down");
    }
}

fn reap(result: Option<Result<(), tokio::task::JoinError>>) {
    if let Some(Err(e)) = result {
        warn!("📬️ An order event handler panicked: {e}");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Dropped an order event: no dispatcher is listening. {e}");
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    fn counting_handler(count: Arc<AtomicU64>) -> Handler<u64> {
        Arc::new(move |v| {
            let count = count.clone();
            Box::pin(async move {
                count.fetch_add(v, Ordering::SeqCst);
                tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        })
    }

    #[tokio::test]
    async fn events_from_multiple_producers_all_arrive_before_shutdown() {
        let _ = env_logger::try_init();
        let count = Arc::new(AtomicU64::new(0));
        let event_handler = EventHandler::new(1, counting_handler(count.clone()));
        let producer_1 = event_handler.subscribe();
        let producer_2 = event_handler.subscribe();
        tokio::spawn(async move {
            for i in 0..5 {
                producer_1.publish_event(i * 2 + 1).await;
            }
        });
        tokio::spawn(async move {
            for i in 0..5 {
                producer_2.publish_event(i * 2).await;
            }
        });

        // start_handler only returns after both producers are dropped and every invocation has run.
        event_handler.start_handler().await;
        assert_eq!(count.load(Ordering::SeqCst), 45);
    }

    #[tokio::test]
    async fn a_panicking_handler_does_not_poison_dispatch() {
        let _ = env_logger::try_init();
        let count = Arc::new(AtomicU64::new(0));
        let c2 = count.clone();
        let handler: Handler<u64> = Arc::new(move |v| {
            let count = c2.clone();
            Box::pin(async move {
                if v == 0 {
                    panic!("boom");
                }
                count.fetch_add(v, Ordering::SeqCst);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let event_handler = EventHandler::new(4, handler);
        let producer = event_handler.subscribe();
        tokio::spawn(async move {
            for v in [0, 1, 2, 3] {
                producer.publish_event(v).await;
            }
        });

        event_handler.start_handler().await;
        assert_eq!(count.load(Ordering::SeqCst), 6, "The surviving handlers must all have run");
    }
}
