use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::models::courier::DeliveryPerson;

pub fn is_eligible(courier: &DeliveryPerson, postal_code: &str, now: DateTime<Utc>) -> bool {
    courier.postal_code == postal_code && courier.is_available(now)
}

/// Earliest `available_at` first; ties go to the lowest id.
pub fn compare(a: &DeliveryPerson, b: &DeliveryPerson) -> Ordering {
    a.available_at
        .cmp(&b.available_at)
        .then_with(|| a.id.cmp(&b.id))
}

pub fn rank_candidates(
    couriers: Vec<DeliveryPerson>,
    postal_code: &str,
    now: DateTime<Utc>,
) -> Vec<DeliveryPerson> {
    let mut candidates: Vec<DeliveryPerson> = couriers
        .into_iter()
        .filter(|courier| is_eligible(courier, postal_code, now))
        .collect();
    candidates.sort_by(compare);
    candidates
}
