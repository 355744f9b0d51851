use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::menu::ItemKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    PendingAssignment,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Statuses whose pizzas count toward loyalty history.
    pub fn is_completed(self) -> bool {
        matches!(self, OrderStatus::Delivered)
    }

    /// Orders the assignment pass is allowed to pick up.
    pub fn awaits_courier(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::PendingAssignment)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineItem {
    pub kind: ItemKind,
    pub item_id: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub items: Vec<LineItem>,
    pub status: OrderStatus,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    pub assigned_driver: Option<Uuid>,
    pub discount_code_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn pizza_count(&self) -> u32 {
        self.items
            .iter()
            .filter(|item| item.kind == ItemKind::Pizza)
            .fold(0u32, |count, item| count.saturating_add(item.quantity))
    }
}
