use std::sync::Arc;

use crate::config::Config;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use vmf_chain::{CallTransport, JsonRpcClient};
use vmf_market_data::{PriceConfig, PriceResolver};
use vmf_wallet::BalanceResolver;

pub struct AppState {
    pub price_resolver: Arc<PriceResolver>,
    pub balance_resolver: Arc<BalanceResolver>,
    /// Token whose balance `/balance/{address}` reports
    pub token_address: String,
}

impl AppState {
    pub fn new(
        price_resolver: PriceResolver,
        balance_resolver: BalanceResolver,
        token_address: impl Into<String>,
    ) -> Self {
        Self {
            price_resolver: Arc::new(price_resolver),
            balance_resolver: Arc::new(balance_resolver),
            token_address: token_address.into(),
        }
    }
}

/// Installs the global subscriber. `log` records from the library crates
/// are forwarded through the subscriber's log bridge.
pub fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    tracing::info!("RPC endpoint in use: {}", config.rpc_url);
    let rpc: Arc<dyn CallTransport> =
        Arc::new(JsonRpcClient::new(config.rpc_url.clone(), config.request_timeout));

    let price_config = PriceConfig {
        token_address: config.token_address.clone(),
        pool_address: config.pool_address.clone(),
        ..PriceConfig::default()
    };
    let price_resolver = PriceResolver::with_defaults(&price_config, rpc.clone());
    let balance_resolver = BalanceResolver::with_timeout(rpc, config.request_timeout);

    Ok(Arc::new(AppState::new(
        price_resolver,
        balance_resolver,
        config.token_address.clone(),
    )))
}
