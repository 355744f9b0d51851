use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::courier::{DeliveryPerson, Reservation};

impl Store {
    pub fn add_courier(&self, courier: DeliveryPerson) -> Result<(), StoreError> {
        match self.couriers.entry(courier.id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate {
                entity: "courier",
                key: courier.id.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(courier);
                Ok(())
            }
        }
    }

    pub fn courier(&self, id: Uuid) -> Option<DeliveryPerson> {
        self.couriers.get(&id).map(|entry| entry.value().clone())
    }

    pub fn available_couriers(&self, postal_code: &str, now: DateTime<Utc>) -> Vec<DeliveryPerson> {
        self.couriers
            .iter()
            .filter(|entry| {
                let courier = entry.value();
                courier.postal_code == postal_code && courier.is_available(now)
            })
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Claim the courier for `order_id` until `until`, if still free at `now`.
    pub fn reserve_courier(
        &self,
        courier_id: Uuid,
        order_id: Uuid,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Option<Reservation> {
        let mut courier = self.couriers.get_mut(&courier_id)?;
        if !courier.is_available(now) {
            return None;
        }

        let reservation = Reservation {
            courier_id,
            order_id,
            previous_available_at: courier.available_at,
            previous_order: courier.active_order,
        };

        courier.available_at = until;
        courier.active_order = Some(order_id);
        courier.updated_at = now;
        Some(reservation)
    }

    /// Give a reservation back if it still belongs to its order.
    pub(crate) fn release_courier(&self, reservation: &Reservation) {
        if let Some(mut courier) = self.couriers.get_mut(&reservation.courier_id) {
            if courier.active_order == Some(reservation.order_id) {
                courier.available_at = reservation.previous_available_at;
                courier.active_order = None;
            }
        }
    }

    pub(crate) fn finish_delivery(&self, courier_id: Uuid, order_id: Uuid) {
        if let Some(mut courier) = self.couriers.get_mut(&courier_id) {
            if courier.active_order == Some(order_id) {
                courier.active_order = None;
            }
        }
    }
}
