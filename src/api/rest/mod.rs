pub mod couriers;
pub mod customers;
pub mod discount_codes;
pub mod menu;
pub mod orders;
pub mod scheduler;
pub mod ws;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::models::order::OrderStatus;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(menu::router())
        .merge(customers::router())
        .merge(couriers::router())
        .merge(discount_codes::router())
        .merge(orders::router())
        .merge(scheduler::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    customers: usize,
    couriers: usize,
    orders: usize,
    awaiting_courier: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let awaiting_courier = state
        .store
        .orders_with_status(&[OrderStatus::Pending, OrderStatus::PendingAssignment])
        .len();

    Json(HealthResponse {
        status: "ok",
        customers: state.store.customers.len(),
        couriers: state.store.couriers.len(),
        orders: state.store.orders.len(),
        awaiting_courier,
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}

fn require_text(field: &str, value: &str) -> Result<(), crate::error::AppError> {
    if value.trim().is_empty() {
        return Err(crate::error::AppError::BadRequest(format!(
            "{field} cannot be empty"
        )));
    }
    Ok(())
}
