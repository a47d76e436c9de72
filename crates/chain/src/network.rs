//! Chain targets and the catalog of networks VMF knows by name.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::ChainError;

/// Base mainnet chain id.
pub const BASE_CHAIN_ID: u64 = 8453;

/// Native currency descriptor used in `wallet_addEthereumChain`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl NativeCurrency {
    pub fn ether() -> Self {
        Self {
            name: "Ether".to_string(),
            symbol: "ETH".to_string(),
            decimals: 18,
        }
    }
}

/// The one chain a connection must end up on.
///
/// Immutable configuration: built once (normally via [`ChainTarget::base`])
/// and shared by the network enforcer, the balance resolver and the RPC
/// client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainTarget {
    pub chain_id: u64,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

impl ChainTarget {
    /// Base mainnet.
    pub fn base() -> Self {
        Self {
            chain_id: BASE_CHAIN_ID,
            chain_name: "Base".to_string(),
            native_currency: NativeCurrency::ether(),
            rpc_urls: vec!["https://mainnet.base.org".to_string()],
            block_explorer_urls: vec!["https://basescan.org".to_string()],
        }
    }

    /// `0x`-prefixed lower-case hex chain id, as wallets expect it.
    pub fn chain_id_hex(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    /// First configured RPC URL.
    pub fn primary_rpc_url(&self) -> Option<&str> {
        self.rpc_urls.first().map(String::as_str)
    }

    /// Params for `wallet_switchEthereumChain`.
    pub fn switch_chain_params(&self) -> Value {
        json!([{ "chainId": self.chain_id_hex() }])
    }

    /// Params for `wallet_addEthereumChain`.
    pub fn add_chain_params(&self) -> Value {
        json!([{
            "chainId": self.chain_id_hex(),
            "chainName": self.chain_name,
            "nativeCurrency": self.native_currency,
            "rpcUrls": self.rpc_urls,
            "blockExplorerUrls": self.block_explorer_urls,
        }])
    }

    /// Text a user can follow to add and select the chain by hand.
    pub fn manual_instructions(&self) -> String {
        format!(
            "Please manually switch to {name} network in your wallet:\n\n\
             Network Name: {name}\n\
             RPC URL: {rpc}\n\
             Chain ID: {id}\n\
             Currency Symbol: {symbol}\n\
             Block Explorer: {explorer}\n\n\
             VMF only works on {name} network.",
            name = self.chain_name,
            rpc = self.rpc_urls.first().map(String::as_str).unwrap_or_default(),
            id = self.chain_id,
            symbol = self.native_currency.symbol,
            explorer = self
                .block_explorer_urls
                .first()
                .map(String::as_str)
                .unwrap_or_default(),
        )
    }
}

impl Default for ChainTarget {
    fn default() -> Self {
        Self::base()
    }
}

/// A network VMF can name and describe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SupportedNetwork {
    pub key: &'static str,
    pub chain_id: u64,
    pub name: &'static str,
    pub testnet: bool,
}

impl SupportedNetwork {
    pub const ETHEREUM: Self = Self {
        key: "ethereum",
        chain_id: 1,
        name: "Ethereum",
        testnet: false,
    };
    pub const SEPOLIA: Self = Self {
        key: "sepolia",
        chain_id: 11_155_111,
        name: "Sepolia",
        testnet: true,
    };
    pub const BASE: Self = Self {
        key: "base",
        chain_id: BASE_CHAIN_ID,
        name: "Base",
        testnet: false,
    };
    pub const BASE_SEPOLIA: Self = Self {
        key: "baseSepolia",
        chain_id: 84_532,
        name: "Base Sepolia",
        testnet: true,
    };

    pub const ALL: [Self; 4] = [Self::ETHEREUM, Self::SEPOLIA, Self::BASE, Self::BASE_SEPOLIA];

    pub fn by_chain_id(chain_id: u64) -> Option<Self> {
        Self::ALL.iter().copied().find(|n| n.chain_id == chain_id)
    }

    pub fn chain_id_hex(&self) -> String {
        format!("{:#x}", self.chain_id)
    }
}

/// Human-friendly network name: `Base`, `Ethereum`, or `Chain <id>`.
pub fn network_name(chain_id: Option<u64>) -> String {
    match chain_id {
        Some(id) => SupportedNetwork::by_chain_id(id)
            .map(|n| n.name.to_string())
            .unwrap_or_else(|| format!("Chain {}", id)),
        None => "Chain Unknown".to_string(),
    }
}

/// Parse a chain id as returned by `eth_chainId` or a `chainChanged` event.
///
/// Wallets send hex strings (`"0x2105"`); some send decimal strings or plain
/// numbers.
pub fn parse_chain_id(value: &Value) -> Result<u64, ChainError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| ChainError::InvalidResponse(format!("invalid chain id: {}", n))),
        Value::String(s) => {
            let s = s.trim();
            let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => s.parse::<u64>(),
            };
            parsed.map_err(|_| ChainError::InvalidResponse(format!("invalid chain id: {}", s)))
        }
        other => Err(ChainError::InvalidResponse(format!(
            "invalid chain id: {}",
            other
        ))),
    }
}
