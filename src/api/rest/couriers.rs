use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::require_text;
use crate::error::AppError;
use crate::models::courier::DeliveryPerson;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/couriers", post(create_courier).get(list_couriers))
}

#[derive(Deserialize)]
pub struct CreateCourierRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub postal_code: String,
    /// Defaults to now: the courier is free immediately.
    #[serde(default)]
    pub available_at: Option<DateTime<Utc>>,
}

async fn create_courier(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCourierRequest>,
) -> Result<Json<DeliveryPerson>, AppError> {
    require_text("first_name", &payload.first_name)?;
    require_text("postal_code", &payload.postal_code)?;

    let now = Utc::now();
    let courier = DeliveryPerson {
        id: Uuid::new_v4(),
        first_name: payload.first_name,
        last_name: payload.last_name,
        phone_number: payload.phone_number,
        postal_code: payload.postal_code.trim().to_string(),
        available_at: payload.available_at.unwrap_or(now),
        active_order: None,
        updated_at: now,
    };

    state.store.add_courier(courier.clone())?;
    Ok(Json(courier))
}

async fn list_couriers(State(state): State<Arc<AppState>>) -> Json<Vec<DeliveryPerson>> {
    let mut couriers: Vec<DeliveryPerson> = state
        .store
        .couriers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    couriers.sort_by(|a, b| a.available_at.cmp(&b.available_at).then(a.id.cmp(&b.id)));
    Json(couriers)
}
