use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::lifecycle::Transition;
use crate::engine::selection::rank_candidates;
use crate::models::assignment::{Assignment, AssignmentSource};
use crate::models::courier::Reservation;
use crate::models::order::{Order, OrderStatus};
use crate::store::{Store, StoreError};

pub const TRANSIT_MINUTES: i64 = 30;

pub fn transit_duration() -> Duration {
    Duration::minutes(TRANSIT_MINUTES)
}

#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error("customer {customer_id} of order {order_id} not found")]
    MissingCustomer { order_id: Uuid, customer_id: Uuid },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub enum AssignmentOutcome {
    Assigned {
        assignment: Assignment,
        reservation: Reservation,
        /// The courier's previous, overdue delivery, completed on reuse.
        completed_delivery: Option<Uuid>,
    },
    NoCourier,
    NotAssignable(OrderStatus),
}

/// Safe to call repeatedly: an order no longer awaiting a courier is left alone.
pub fn attempt_assignment(
    store: &Store,
    order_id: Uuid,
    now: DateTime<Utc>,
    source: AssignmentSource,
) -> Result<AssignmentOutcome, AssignmentError> {
    let order = store
        .order(order_id)
        .ok_or_else(|| StoreError::not_found("order", order_id))?;

    if !order.status.awaits_courier() {
        return Ok(AssignmentOutcome::NotAssignable(order.status));
    }

    let postal_code = store
        .customers
        .get(&order.customer_id)
        .map(|customer| customer.postal_code.clone())
        .ok_or(AssignmentError::MissingCustomer {
            order_id,
            customer_id: order.customer_id,
        })?;

    let eta = now + transit_duration();
    let candidates = rank_candidates(store.available_couriers(&postal_code, now), &postal_code, now);

    let reservation = candidates
        .iter()
        .find_map(|courier| store.reserve_courier(courier.id, order_id, now, eta));

    let Some(reservation) = reservation else {
        return await_courier(store, &order, now);
    };

    let completed_delivery = reservation
        .previous_order
        .filter(|previous| finish_overdue(store, reservation.courier_id, *previous, now));

    let transition = Transition::AssignCourier {
        courier_id: reservation.courier_id,
        estimated_delivery_time: eta,
    };
    if let Err(err) = store.transition_order(order_id, transition, now) {
        store.release_courier(&reservation);
        debug!(order_id = %order_id, error = %err, "order changed while reserving courier");
        let status = store
            .order(order_id)
            .map(|order| order.status)
            .unwrap_or(order.status);
        return Ok(AssignmentOutcome::NotAssignable(status));
    }

    let assignment = Assignment {
        id: Uuid::new_v4(),
        order_id,
        courier_id: reservation.courier_id,
        source,
        assigned_at: now,
        estimated_delivery_time: eta,
    };

    info!(
        order_id = %order_id,
        courier_id = %reservation.courier_id,
        source = source.as_str(),
        eta = %eta,
        "order assigned"
    );

    Ok(AssignmentOutcome::Assigned {
        assignment,
        reservation,
        completed_delivery,
    })
}

fn await_courier(
    store: &Store,
    order: &Order,
    now: DateTime<Utc>,
) -> Result<AssignmentOutcome, AssignmentError> {
    match store.transition_order(order.id, Transition::AwaitCourier, now) {
        Ok(_) => {
            debug!(order_id = %order.id, "no courier available; order waits");
            Ok(AssignmentOutcome::NoCourier)
        }
        Err(StoreError::Transition(_)) => {
            let status = store
                .order(order.id)
                .map(|order| order.status)
                .unwrap_or(order.status);
            Ok(AssignmentOutcome::NotAssignable(status))
        }
        Err(err) => Err(err.into()),
    }
}

pub fn complete_delivery(store: &Store, order_id: Uuid, now: DateTime<Utc>) -> Result<Order, StoreError> {
    let order = store.transition_order(order_id, Transition::CompleteDelivery, now)?;
    if let Some(courier_id) = order.assigned_driver {
        store.finish_delivery(courier_id, order_id);
    }
    Ok(order)
}

fn finish_overdue(store: &Store, courier_id: Uuid, order_id: Uuid, now: DateTime<Utc>) -> bool {
    match complete_delivery(store, order_id, now) {
        Ok(_) => {
            info!(order_id = %order_id, courier_id = %courier_id, "overdue delivery completed on reassignment");
            true
        }
        Err(StoreError::Transition(_)) => false,
        Err(err) => {
            warn!(order_id = %order_id, error = %err, "failed to complete overdue delivery");
            false
        }
    }
}
