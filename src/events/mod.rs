//! In-process event channel.
//!
//! Services publish events after their transactional work commits; the
//! processor task spawned from `main` consumes them and drives the
//! best-effort side channels (currently the new-order notification webhook).
//! A full channel or a crashed processor never fails the originating request.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::services::notifications::{NewOrderSummary, NotificationService};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: Uuid,
        summary: NewOrderSummary,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    PaymentCaptured {
        order_id: Uuid,
        payment_reference: String,
    },
    OrderDeleted(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event. Failure means the processor is gone; callers treat
    /// this as a logged warning, never as a request failure.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Consumes events until the channel closes.
pub async fn process_events(
    mut receiver: mpsc::Receiver<Event>,
    notifier: Option<Arc<NotificationService>>,
    webhook_url: Option<String>,
) {
    info!(
        notifications_enabled = notifier.is_some() && webhook_url.is_some(),
        "Event processor started"
    );

    while let Some(event) = receiver.recv().await {
        match event {
            Event::OrderCreated { order_id, summary } => {
                debug!(order_id = %order_id, tracking_code = %summary.tracking_code, "Order created event");
                if let (Some(notifier), Some(url)) = (&notifier, &webhook_url) {
                    notifier.notify_order_created(url, summary);
                }
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                debug!(order_id = %order_id, %old_status, %new_status, "Order status changed event");
            }
            Event::PaymentCaptured {
                order_id,
                payment_reference,
            } => {
                debug!(order_id = %order_id, %payment_reference, "Payment captured event");
            }
            Event::OrderDeleted(order_id) => {
                debug!(order_id = %order_id, "Order deleted event");
            }
        }
    }

    warn!("Event channel closed; processor exiting");
}
