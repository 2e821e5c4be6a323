//! Domain events, published to NATS subjects when a client is configured.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{OrderStatus, ReturnStatus};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderCreated {
        order_id: Uuid,
        merchant_oid: String,
        total: Decimal,
    },
    OrderStatusChanged {
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    },
    TicketMessageCreated {
        ticket_id: Uuid,
        message_id: Uuid,
        is_admin_reply: bool,
    },
    ReturnDecided {
        return_id: Uuid,
        status: ReturnStatus,
    },
}

impl DomainEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            DomainEvent::OrderCreated { .. } => "store.orders.created",
            DomainEvent::OrderStatusChanged { .. } => "store.orders.status",
            DomainEvent::TicketMessageCreated { .. } => "store.tickets.message",
            DomainEvent::ReturnDecided { .. } => "store.returns.decided",
        }
    }
}

/// Fire-and-forget publish. Event delivery never gates the write it follows.
pub async fn publish(nats: Option<&async_nats::Client>, event: DomainEvent) {
    let Some(client) = nats else { return };
    let payload = match serde_json::to_vec(&event) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize domain event");
            return;
        }
    };
    if let Err(e) = client.publish(event.subject(), payload.into()).await {
        tracing::warn!(error = %e, subject = event.subject(), "event publish failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subjects() {
        let e = DomainEvent::OrderCreated {
            order_id: Uuid::new_v4(),
            merchant_oid: "ORD-abc123XYZ0".into(),
            total: Decimal::from(160),
        };
        assert_eq!(e.subject(), "store.orders.created");

        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["type"], "order_created");
        assert_eq!(json["merchant_oid"], "ORD-abc123XYZ0");
    }
}
