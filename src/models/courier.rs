use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryPerson {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub postal_code: String,
    pub available_at: DateTime<Utc>,
    pub active_order: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryPerson {
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.available_at <= now
    }
}

/// State a reservation replaced, kept so the reservation can be undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub courier_id: Uuid,
    pub order_id: Uuid,
    pub previous_available_at: DateTime<Utc>,
    pub previous_order: Option<Uuid>,
}
