use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use chrono::Utc;

use crate::engine::scheduler::{run_scheduler_tick, TickOutcome};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/scheduler/tick", post(run_tick))
}

async fn run_tick(State(state): State<Arc<AppState>>) -> Json<TickOutcome> {
    Json(run_scheduler_tick(&state, Utc::now()))
}
