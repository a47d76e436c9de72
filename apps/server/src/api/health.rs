use std::sync::Arc;

use crate::main_lib::AppState;
use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use vmf_market_data::CircuitSnapshot;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    checked_at: DateTime<Utc>,
    /// Per-source circuit state of the price waterfall
    circuits: Vec<CircuitSnapshot>,
}

async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        checked_at: Utc::now(),
        circuits: state.price_resolver.circuit_breaker().snapshot(),
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}
