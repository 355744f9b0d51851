use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::orders::{order_view, OrderView};
use super::require_text;
use crate::error::AppError;
use crate::models::customer::Customer;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/customers", post(create_customer).get(list_customers))
        .route("/customers/:id/orders", get(list_customer_orders))
}

#[derive(Deserialize)]
pub struct CreateCustomerRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub birthdate: NaiveDate,
    pub address: String,
    pub postal_code: String,
    #[serde(default)]
    pub is_staff: bool,
}

async fn create_customer(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCustomerRequest>,
) -> Result<Json<Customer>, AppError> {
    require_text("first_name", &payload.first_name)?;
    require_text("postal_code", &payload.postal_code)?;

    let now = Utc::now();
    if payload.birthdate > now.date_naive() {
        return Err(AppError::BadRequest("birthdate cannot be in the future".to_string()));
    }

    let customer = Customer {
        id: Uuid::new_v4(),
        first_name: payload.first_name,
        last_name: payload.last_name,
        phone_number: payload.phone_number,
        birthdate: payload.birthdate,
        address: payload.address,
        postal_code: payload.postal_code.trim().to_string(),
        is_staff: payload.is_staff,
        created_at: now,
    };

    state.store.insert_customer(customer.clone())?;
    Ok(Json(customer))
}

async fn list_customers(State(state): State<Arc<AppState>>) -> Json<Vec<Customer>> {
    let mut customers: Vec<Customer> = state
        .store
        .customers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    customers.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    Json(customers)
}

async fn list_customer_orders(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<OrderView>>, AppError> {
    if state.store.customer(id).is_none() {
        return Err(AppError::NotFound(format!("customer {id} not found")));
    }

    let orders = state
        .store
        .orders_for_customer(id)
        .into_iter()
        .map(|order| order_view(&state.store, order))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(orders))
}
