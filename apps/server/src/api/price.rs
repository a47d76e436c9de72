use std::sync::Arc;

use crate::main_lib::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use vmf_market_data::PriceResolution;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PriceResponse {
    price: f64,
    source: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    liquidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    volume24h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

impl From<PriceResolution> for PriceResponse {
    fn from(resolution: PriceResolution) -> Self {
        let quote = resolution.quote;
        Self {
            price: quote.price_usd_per_token,
            source: quote.source,
            success: resolution.success,
            liquidity: quote.liquidity_usd,
            volume24h: quote.volume_24h_usd,
            error: (!resolution.success).then_some("Internal server error"),
        }
    }
}

/// Current USD price of the token. Always answers, falling back to the
/// hard default when every source fails.
async fn get_price(State(state): State<Arc<AppState>>) -> Json<PriceResponse> {
    let resolution = state.price_resolver.resolve().await;
    tracing::info!(
        source = %resolution.quote.source,
        price = resolution.quote.price_usd_per_token,
        "Price resolved: {}",
        resolution.diagnostics.summary()
    );
    Json(resolution.into())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/price", get(get_price))
}
