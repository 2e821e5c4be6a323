//! Order lifecycle state machine.

use rand::distributions::Alphanumeric;
use rand::Rng;
use thiserror::Error;

use crate::models::OrderStatus;

/// Admin- or gateway-driven lifecycle event. `Ship` carries the shipment
/// fields so the status change and the metadata land atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEvent {
    StartProcessing,
    Ship {
        tracking_number: String,
        carrier: String,
    },
    Deliver,
    Cancel,
}

impl OrderEvent {
    fn name(&self) -> &'static str {
        match self {
            OrderEvent::StartProcessing => "start processing",
            OrderEvent::Ship { .. } => "ship",
            OrderEvent::Deliver => "deliver",
            OrderEvent::Cancel => "cancel",
        }
    }

    /// Maps a requested target status (plus optional shipment fields) to the
    /// event that reaches it. Shipping without both fields is rejected here,
    /// before anything touches storage.
    pub fn for_target(
        target: OrderStatus,
        tracking_number: Option<String>,
        carrier: Option<String>,
    ) -> Result<Self, TransitionError> {
        match target {
            OrderStatus::Processing => Ok(OrderEvent::StartProcessing),
            OrderStatus::Shipping => match (tracking_number, carrier) {
                (Some(tracking_number), Some(carrier))
                    if !tracking_number.is_empty() && !carrier.is_empty() =>
                {
                    Ok(OrderEvent::Ship {
                        tracking_number,
                        carrier,
                    })
                }
                _ => Err(TransitionError::MissingShipmentFields),
            },
            OrderStatus::Delivered => Ok(OrderEvent::Deliver),
            OrderStatus::Cancelled => Ok(OrderEvent::Cancel),
            OrderStatus::PendingPayment => Err(TransitionError::Invalid {
                from: OrderStatus::PendingPayment,
                event: "re-enter pending payment",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shipment {
    pub tracking_number: String,
    pub carrier: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: OrderStatus,
    pub shipment: Option<Shipment>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("shipping requires both tracking_number and carrier")]
    MissingShipmentFields,

    #[error("order is {0} and can no longer change")]
    Terminal(OrderStatus),

    #[error("cannot {event} an order that is {from}")]
    Invalid {
        from: OrderStatus,
        event: &'static str,
    },
}

/// Validates an event against the current status and yields the resulting
/// status plus any shipment metadata to persist with it. Callers run the
/// returned transition inside one storage transaction.
pub fn apply(current: OrderStatus, event: OrderEvent) -> Result<Transition, TransitionError> {
    if current.is_terminal() {
        return Err(TransitionError::Terminal(current));
    }

    let next = match (&current, &event) {
        (OrderStatus::PendingPayment, OrderEvent::StartProcessing) => OrderStatus::Processing,
        (OrderStatus::Processing, OrderEvent::Ship { .. }) => OrderStatus::Shipping,
        (OrderStatus::Shipping, OrderEvent::Deliver) => OrderStatus::Delivered,
        (_, OrderEvent::Cancel) => OrderStatus::Cancelled,
        _ => {
            return Err(TransitionError::Invalid {
                from: current,
                event: event.name(),
            })
        }
    };

    let shipment = match event {
        OrderEvent::Ship {
            tracking_number,
            carrier,
        } => Some(Shipment {
            tracking_number,
            carrier,
        }),
        _ => None,
    };

    Ok(Transition { next, shipment })
}

/// External order reference handed to the payment gateway.
pub fn new_merchant_oid() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    format!("ORD-{token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let t = apply(OrderStatus::PendingPayment, OrderEvent::StartProcessing).unwrap();
        assert_eq!(t.next, OrderStatus::Processing);

        let t = apply(
            OrderStatus::Processing,
            OrderEvent::Ship {
                tracking_number: "TR123".into(),
                carrier: "Yurtici".into(),
            },
        )
        .unwrap();
        assert_eq!(t.next, OrderStatus::Shipping);
        assert_eq!(
            t.shipment,
            Some(Shipment {
                tracking_number: "TR123".into(),
                carrier: "Yurtici".into()
            })
        );

        let t = apply(OrderStatus::Shipping, OrderEvent::Deliver).unwrap();
        assert_eq!(t.next, OrderStatus::Delivered);
        assert_eq!(t.shipment, None);
    }

    #[test]
    fn test_ship_requires_tracking_and_carrier() {
        let err = OrderEvent::for_target(OrderStatus::Shipping, Some("TR1".into()), None)
            .unwrap_err();
        assert_eq!(err, TransitionError::MissingShipmentFields);

        let err =
            OrderEvent::for_target(OrderStatus::Shipping, None, Some("Aras".into())).unwrap_err();
        assert_eq!(err, TransitionError::MissingShipmentFields);

        let err = OrderEvent::for_target(
            OrderStatus::Shipping,
            Some(String::new()),
            Some("Aras".into()),
        )
        .unwrap_err();
        assert_eq!(err, TransitionError::MissingShipmentFields);
    }

    #[test]
    fn test_cancel_from_any_non_terminal() {
        for status in [
            OrderStatus::PendingPayment,
            OrderStatus::Processing,
            OrderStatus::Shipping,
        ] {
            let t = apply(status, OrderEvent::Cancel).unwrap();
            assert_eq!(t.next, OrderStatus::Cancelled);
        }
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for status in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            let err = apply(status, OrderEvent::StartProcessing).unwrap_err();
            assert_eq!(err, TransitionError::Terminal(status));
            let err = apply(status, OrderEvent::Cancel).unwrap_err();
            assert_eq!(err, TransitionError::Terminal(status));
        }
    }

    #[test]
    fn test_no_skipping_states() {
        assert!(apply(OrderStatus::PendingPayment, OrderEvent::Deliver).is_err());
        assert!(apply(
            OrderStatus::PendingPayment,
            OrderEvent::Ship {
                tracking_number: "T".into(),
                carrier: "C".into()
            }
        )
        .is_err());
        assert!(apply(OrderStatus::Shipping, OrderEvent::StartProcessing).is_err());
    }

    #[test]
    fn test_merchant_oid_shape() {
        let oid = new_merchant_oid();
        assert!(oid.starts_with("ORD-"));
        assert_eq!(oid.len(), 14);
        assert!(oid[4..].chars().all(|c| c.is_ascii_alphanumeric()));

        // Two generations must differ: checkout retries create new orders.
        assert_ne!(new_merchant_oid(), new_merchant_oid());
    }
}
