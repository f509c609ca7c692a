//! In-process lifecycle events.
//!
//! Handlers and services publish fire-and-forget events onto an mpsc
//! channel; a background task drains the channel, logs each event and
//! triggers side effects such as the signup welcome mail.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::notifications::Mailer;

/// Events emitted by the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    UserRegistered {
        user_id: Uuid,
        name: String,
        email: String,
    },
    UserLoggedIn(Uuid),
    UserLoggedOut(Uuid),
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),
    CategoryCreated(Uuid),
    CategoryDeleted(Uuid),
    CartItemAdded {
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },
    CartCleared(Uuid),
    OrderPlaced {
        order_id: Uuid,
        user_id: Uuid,
    },
    OrderCancelled(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing the caller when the
    /// channel is closed or full.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping event: {}", e);
        }
    }
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>, mailer: Option<Arc<dyn Mailer>>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::UserRegistered {
                user_id,
                name,
                email,
            } => {
                info!(%user_id, "user registered");
                if let Some(mailer) = &mailer {
                    if let Err(e) = mailer.send_welcome(email, name).await {
                        warn!(%user_id, "failed to deliver welcome mail: {}", e);
                    }
                }
            }
            Event::OrderPlaced { order_id, user_id } => {
                info!(%order_id, %user_id, "order placed");
            }
            other => {
                info!(event = ?other, "event processed");
            }
        }
    }

    info!("Event channel closed; processor shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        // Must not panic or error out
        sender.send_or_log(Event::ProductDeleted(Uuid::new_v4())).await;
    }

    #[tokio::test]
    async fn processor_drains_events() {
        let (tx, rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);
        let handle = tokio::spawn(process_events(rx, None));

        sender
            .send(Event::UserRegistered {
                user_id: Uuid::new_v4(),
                name: "Ada".into(),
                email: "ada@example.com".into(),
            })
            .await
            .unwrap();
        drop(sender);

        handle.await.unwrap();
    }
}
