//! In-process change feed for support ticket threads.
//!
//! One broadcast channel per ticket, created lazily on first subscribe.
//! Consumers subscribe before fetching history so no insert can fall into
//! the gap; duplicates are filtered by message id on the consumer side.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::SupportMessage;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Default)]
pub struct TicketFeed {
    channels: Arc<Mutex<HashMap<Uuid, broadcast::Sender<SupportMessage>>>>,
}

impl TicketFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, ticket_id: Uuid) -> broadcast::Receiver<SupportMessage> {
        let mut channels = self.channels.lock().expect("ticket feed lock poisoned");
        channels
            .entry(ticket_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Delivers to current subscribers of the message's ticket. A ticket
    /// with no listeners drops its channel.
    pub fn publish(&self, message: &SupportMessage) {
        let mut channels = self.channels.lock().expect("ticket feed lock poisoned");
        if let Some(tx) = channels.get(&message.ticket_id) {
            if tx.send(message.clone()).is_err() {
                channels.remove(&message.ticket_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(ticket_id: Uuid, body: &str) -> SupportMessage {
        SupportMessage {
            id: Uuid::new_v4(),
            ticket_id,
            sender_id: Uuid::new_v4(),
            message: body.into(),
            is_admin_reply: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_delivery_is_per_ticket() {
        let feed = TicketFeed::new();
        let ticket_a = Uuid::new_v4();
        let ticket_b = Uuid::new_v4();

        let mut rx_a = feed.subscribe(ticket_a);
        let mut rx_b = feed.subscribe(ticket_b);

        feed.publish(&message(ticket_a, "hello"));

        let got = rx_a.recv().await.unwrap();
        assert_eq!(got.message, "hello");
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_insertion_order_preserved() {
        let feed = TicketFeed::new();
        let ticket = Uuid::new_v4();
        let mut rx = feed.subscribe(ticket);

        feed.publish(&message(ticket, "first"));
        feed.publish(&message(ticket, "second"));

        assert_eq!(rx.recv().await.unwrap().message, "first");
        assert_eq!(rx.recv().await.unwrap().message, "second");
    }

    #[test]
    fn test_publish_without_subscribers_is_a_no_op() {
        let feed = TicketFeed::new();
        feed.publish(&message(Uuid::new_v4(), "nobody listening"));
    }
}
