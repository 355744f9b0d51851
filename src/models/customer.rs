use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub birthdate: NaiveDate,
    pub address: String,
    pub postal_code: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}
