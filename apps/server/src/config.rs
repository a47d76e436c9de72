use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use vmf_chain::ChainTarget;
use vmf_market_data::config::{VMF_POOL_ADDRESS, VMF_TOKEN_ADDRESS};

pub struct Config {
    pub listen_addr: SocketAddr,
    /// Public RPC endpoint for on-chain price sources and balance reads
    pub rpc_url: String,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub token_address: String,
    pub pool_address: String,
    /// `text` or `json`
    pub log_format: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let listen_addr: SocketAddr = std::env::var("VMF_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .context("Invalid VMF_LISTEN_ADDR")?;
        let rpc_url = std::env::var("VMF_RPC_URL").unwrap_or_else(|_| {
            ChainTarget::base()
                .primary_rpc_url()
                .unwrap_or("https://mainnet.base.org")
                .to_string()
        });
        let cors_allow = std::env::var("VMF_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = std::env::var("VMF_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".into())
            .parse()
            .unwrap_or(30000);
        let token_address =
            std::env::var("VMF_TOKEN_ADDRESS").unwrap_or_else(|_| VMF_TOKEN_ADDRESS.into());
        let pool_address =
            std::env::var("VMF_POOL_ADDRESS").unwrap_or_else(|_| VMF_POOL_ADDRESS.into());
        let log_format = std::env::var("VMF_LOG_FORMAT").unwrap_or_else(|_| "text".into());
        Ok(Self {
            listen_addr,
            rpc_url,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            token_address,
            pool_address,
            log_format,
        })
    }
}
