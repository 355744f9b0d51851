use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::checkout::{cancel, checkout, preview, CheckoutReceipt, CheckoutRequest, Quotation};
use crate::engine::pricing::order_subtotal;
use crate::error::AppError;
use crate::models::money::MoneyValue;
use crate::models::order::Order;
use crate::models::payment::Payment;
use crate::state::AppState;
use crate::store::Store;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders/preview", post(preview_order))
        .route("/orders/checkout", post(checkout_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/payments", get(list_payments))
}

/// An order with its total recomputed from current menu prices.
#[derive(Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub total_amount: MoneyValue,
    pub payment: Option<Payment>,
}

pub fn order_view(store: &Store, order: Order) -> Result<OrderView, AppError> {
    let total_amount = order_subtotal(store, &order)?;
    let payment = store.payment_for_order(order.id);

    Ok(OrderView {
        order,
        total_amount,
        payment,
    })
}

#[derive(Deserialize)]
pub struct CancelOrderRequest {
    pub customer_id: Uuid,
}

async fn preview_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<Quotation>, AppError> {
    Ok(Json(preview(&state.store, &payload, Utc::now())?))
}

async fn checkout_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutReceipt>, AppError> {
    Ok(Json(checkout(&state, &payload, Utc::now())?))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>, AppError> {
    let order = state
        .store
        .order(id)
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", id)))?;

    Ok(Json(order_view(&state.store, order)?))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelOrderRequest>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(cancel(&state.store, id, payload.customer_id, Utc::now())?))
}

async fn list_payments(State(state): State<Arc<AppState>>) -> Json<Vec<Payment>> {
    let mut payments: Vec<Payment> = state
        .store
        .payments
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    payments.sort_by(|a, b| a.paid_at.cmp(&b.paid_at).then(a.id.cmp(&b.id)));
    Json(payments)
}
