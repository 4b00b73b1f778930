//! Fire-and-forget delivery of order events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use domain::OrderEvent;
use thiserror::Error;
use tokio::sync::mpsc;

/// Error reported by a notifier. Never reaches the caller that emitted the event.
#[derive(Debug, Error)]
#[error("Notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Something that tells the outside world about order events.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &OrderEvent) -> Result<(), NotifyError>;
}

/// Writes each event to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &OrderEvent) -> Result<(), NotifyError> {
        let summary = event.summary();
        tracing::info!(
            event_type = event.event_type(),
            order_id = %summary.order_id,
            customer_email = %summary.customer_email,
            total_amount = %summary.total_amount,
            "Order notification"
        );
        Ok(())
    }
}

/// Collects events in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<OrderEvent>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the events received so far.
    pub fn events(&self) -> Vec<OrderEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Waits until at least `count` events arrived or `timeout` elapsed.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<OrderEvent> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let events = self.events();
            if events.len() >= count || tokio::time::Instant::now() >= deadline {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &OrderEvent) -> Result<(), NotifyError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

/// Handle used to emit events without waiting for delivery.
///
/// Events go into an unbounded channel drained by a background task, so
/// [`dispatch`](Self::dispatch) never blocks and never fails the caller.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::UnboundedSender<OrderEvent>,
    dispatched: Arc<AtomicU64>,
}

impl NotificationDispatcher {
    /// Starts a background task that feeds events to `notifier`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<N>(notifier: N) -> Self
    where
        N: Notifier + 'static,
    {
        let (sender, mut receiver) = mpsc::unbounded_channel::<OrderEvent>();

        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                if let Err(e) = notifier.notify(&event).await {
                    metrics::counter!("notification_failures_total").increment(1);
                    tracing::error!(
                        event_type = event.event_type(),
                        order_id = %event.order_id(),
                        error = %e,
                        "Failed to deliver order notification"
                    );
                }
            }
            tracing::debug!("Notification dispatcher stopped");
        });

        Self {
            sender,
            dispatched: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Queues an event for delivery.
    pub fn dispatch(&self, event: OrderEvent) {
        let event_type = event.event_type();
        let order_id = event.order_id().clone();

        match self.sender.send(event) {
            Ok(()) => {
                self.dispatched.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                tracing::warn!(
                    event_type,
                    order_id = %order_id,
                    "Notification channel closed, event dropped"
                );
            }
        }
    }

    /// Number of events accepted for delivery since start-up.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }
}
