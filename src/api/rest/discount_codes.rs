use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::require_text;
use crate::error::AppError;
use crate::models::discount::DiscountCode;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/discount-codes", post(create_code).get(list_codes))
}

#[derive(Deserialize)]
pub struct CreateCodeRequest {
    pub code: String,
    pub percentage: Decimal,
    pub expires_at: DateTime<Utc>,
}

async fn create_code(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCodeRequest>,
) -> Result<Json<DiscountCode>, AppError> {
    require_text("code", &payload.code)?;

    let code = DiscountCode {
        id: Uuid::new_v4(),
        code: payload.code.trim().to_string(),
        percentage: payload.percentage,
        expires_at: payload.expires_at,
        is_used: false,
        redeemed_by: None,
    };

    state.store.add_discount_code(code.clone())?;
    Ok(Json(code))
}

async fn list_codes(State(state): State<Arc<AppState>>) -> Json<Vec<DiscountCode>> {
    Json(state.store.list_codes())
}
