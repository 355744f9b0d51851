use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::order::{Order, OrderStatus};

pub const CANCELLATION_WINDOW_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    AwaitCourier,
    AssignCourier {
        courier_id: Uuid,
        estimated_delivery_time: DateTime<Utc>,
    },
    CompleteDelivery,
    Cancel,
}

impl Transition {
    pub fn target(&self) -> OrderStatus {
        match self {
            Transition::AwaitCourier => OrderStatus::PendingAssignment,
            Transition::AssignCourier { .. } => OrderStatus::OutForDelivery,
            Transition::CompleteDelivery => OrderStatus::Delivered,
            Transition::Cancel => OrderStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot move order from {from:?} to {to:?}")]
    Invalid { from: OrderStatus, to: OrderStatus },

    #[error("cancellation window of 5 minutes has elapsed")]
    CancellationWindowElapsed,
}

pub fn is_allowed(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;

    matches!(
        (from, to),
        (Pending, PendingAssignment)
            | (PendingAssignment, PendingAssignment)
            | (Pending, OutForDelivery)
            | (PendingAssignment, OutForDelivery)
            | (OutForDelivery, Delivered)
            | (Pending, Cancelled)
            | (PendingAssignment, Cancelled)
    )
}

pub fn within_cancellation_window(order: &Order, now: DateTime<Utc>) -> bool {
    now - order.created_at < Duration::minutes(CANCELLATION_WINDOW_MINUTES)
}

/// Advance `order` by one transition, or leave it untouched on error.
pub fn apply(order: &mut Order, transition: Transition, now: DateTime<Utc>) -> Result<(), TransitionError> {
    let to = transition.target();
    if !is_allowed(order.status, to) {
        return Err(TransitionError::Invalid {
            from: order.status,
            to,
        });
    }

    if order.status == to {
        return Ok(());
    }

    match transition {
        Transition::AwaitCourier | Transition::CompleteDelivery => {}
        Transition::AssignCourier {
            courier_id,
            estimated_delivery_time,
        } => {
            order.assigned_driver = Some(courier_id);
            order.estimated_delivery_time = Some(estimated_delivery_time);
        }
        Transition::Cancel => {
            if !within_cancellation_window(order, now) {
                return Err(TransitionError::CancellationWindowElapsed);
            }
        }
    }

    order.status = to;
    order.updated_at = now;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    use super::{apply, Transition, TransitionError};
    use crate::models::order::{Order, OrderStatus};

    fn order(status: OrderStatus) -> Order {
        let created = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap();
        Order {
            id: Uuid::from_u128(1),
            customer_id: Uuid::from_u128(2),
            items: Vec::new(),
            status,
            estimated_delivery_time: None,
            assigned_driver: None,
            discount_code_id: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn happy_path_reaches_delivered() {
        let mut order = order(OrderStatus::Pending);
        let now = order.created_at;
        let eta = now + Duration::minutes(30);

        apply(&mut order, Transition::AwaitCourier, now).unwrap();
        assert_eq!(order.status, OrderStatus::PendingAssignment);

        let later = now + Duration::minutes(5);
        apply(&mut order, Transition::AwaitCourier, later).unwrap();
        assert_eq!(order.updated_at, now);

        apply(
            &mut order,
            Transition::AssignCourier {
                courier_id: Uuid::from_u128(9),
                estimated_delivery_time: eta,
            },
            now,
        )
        .unwrap();
        assert_eq!(order.status, OrderStatus::OutForDelivery);
        assert_eq!(order.assigned_driver, Some(Uuid::from_u128(9)));
        assert_eq!(order.estimated_delivery_time, Some(eta));

        apply(&mut order, Transition::CompleteDelivery, eta).unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
    }

    #[test]
    fn no_backward_transitions() {
        let mut order = order(OrderStatus::OutForDelivery);
        let now = order.created_at;

        let err = apply(&mut order, Transition::AwaitCourier, now).unwrap_err();
        assert_eq!(
            err,
            TransitionError::Invalid {
                from: OrderStatus::OutForDelivery,
                to: OrderStatus::PendingAssignment
            }
        );
        assert_eq!(order.status, OrderStatus::OutForDelivery);
    }

    #[test]
    fn pending_cannot_skip_to_delivered() {
        let mut order = order(OrderStatus::Pending);
        let now = order.created_at;
        assert!(apply(&mut order, Transition::CompleteDelivery, now).is_err());
    }

    #[test]
    fn cancel_inside_window() {
        let mut order = order(OrderStatus::PendingAssignment);
        let now = order.created_at + Duration::minutes(4);

        apply(&mut order, Transition::Cancel, now).unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[test]
    fn cancel_at_window_boundary_is_rejected() {
        let mut order = order(OrderStatus::Pending);
        let now = order.created_at + Duration::minutes(5);

        let err = apply(&mut order, Transition::Cancel, now).unwrap_err();
        assert_eq!(err, TransitionError::CancellationWindowElapsed);
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn cancel_rejected_once_out_for_delivery() {
        let mut order = order(OrderStatus::OutForDelivery);
        let now = order.created_at + Duration::minutes(1);

        assert!(matches!(
            apply(&mut order, Transition::Cancel, now),
            Err(TransitionError::Invalid { .. })
        ));
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for status in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            let mut order = order(status);
            let now = order.created_at;
            assert!(apply(&mut order, Transition::Cancel, now).is_err());
            assert!(apply(&mut order, Transition::CompleteDelivery, now).is_err());
            assert!(apply(&mut order, Transition::AwaitCourier, now).is_err());
        }
    }
}
