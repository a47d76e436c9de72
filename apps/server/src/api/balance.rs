use std::sync::Arc;

use crate::{error::ApiResult, main_lib::AppState};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use vmf_wallet::TokenBalance;

/// Token balance of `address`, read from the public RPC endpoint.
async fn get_balance(
    Path(address): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<TokenBalance>> {
    let balance = state
        .balance_resolver
        .get_token_balance(&address, &state.token_address, None)
        .await?;
    Ok(Json(balance))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/balance/{address}", get(get_balance))
}
