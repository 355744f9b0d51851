use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AssignmentSource {
    Checkout,
    Scheduler,
}

impl AssignmentSource {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentSource::Checkout => "checkout",
            AssignmentSource::Scheduler => "scheduler",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub courier_id: Uuid,
    pub source: AssignmentSource,
    pub assigned_at: DateTime<Utc>,
    pub estimated_delivery_time: DateTime<Utc>,
}
