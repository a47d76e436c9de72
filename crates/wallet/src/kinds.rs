//! Wallet catalogue.

use serde::{Deserialize, Serialize};

/// One connectable wallet family.
///
/// Serialized with the ids the web client has always stored in its session
/// cache (`metamask`, `coinbase`, `coinbaseSmart`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalletKind {
    #[serde(rename = "metamask")]
    MetaMask,
    #[serde(rename = "coinbase")]
    CoinbaseExtension,
    #[serde(rename = "coinbaseSmart")]
    CoinbaseSmart,
    #[serde(rename = "rainbow")]
    Rainbow,
    #[serde(rename = "phantom")]
    Phantom,
}

impl WalletKind {
    pub const ALL: [WalletKind; 5] = [
        WalletKind::MetaMask,
        WalletKind::CoinbaseExtension,
        WalletKind::CoinbaseSmart,
        WalletKind::Rainbow,
        WalletKind::Phantom,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Self::MetaMask => "metamask",
            Self::CoinbaseExtension => "coinbase",
            Self::CoinbaseSmart => "coinbaseSmart",
            Self::Rainbow => "rainbow",
            Self::Phantom => "phantom",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MetaMask => "MetaMask",
            Self::CoinbaseExtension => "Coinbase Extension",
            Self::CoinbaseSmart => "Coinbase Smart Wallet",
            Self::Rainbow => "Rainbow",
            Self::Phantom => "Phantom",
        }
    }

    /// Where a user without the wallet can get it.
    pub fn install_url(&self) -> &'static str {
        match self {
            Self::MetaMask => "https://metamask.io/download/",
            Self::CoinbaseExtension => "https://www.coinbase.com/wallet/downloads",
            Self::CoinbaseSmart => "https://www.coinbase.com/wallet/smart-wallet",
            Self::Rainbow => "https://rainbow.me/download",
            Self::Phantom => "https://phantom.app/download",
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            Self::Phantom => Capabilities {
                evm: true,
                solana: true,
            },
            _ => Capabilities {
                evm: true,
                solana: false,
            },
        }
    }

    /// Wallets that silently reuse a previous site approval and need the
    /// recovery sequence to produce a visible consent.
    pub fn caches_sessions(&self) -> bool {
        matches!(self, Self::CoinbaseExtension)
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id().eq_ignore_ascii_case(id))
    }
}

impl std::fmt::Display for WalletKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Which chain families a wallet can speak.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub evm: bool,
    pub solana: bool,
}

/// Chain family of a live connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChainFamily {
    Evm,
    Solana,
}

/// A wallet family as seen by the registry at query time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    pub id: WalletKind,
    pub display_name: String,
    pub capabilities: Capabilities,
    pub installed: bool,
    pub install_url: String,
}

impl ProviderDescriptor {
    pub fn new(kind: WalletKind, installed: bool) -> Self {
        Self {
            id: kind,
            display_name: kind.display_name().to_string(),
            capabilities: kind.capabilities(),
            installed,
            install_url: kind.install_url().to_string(),
        }
    }
}
