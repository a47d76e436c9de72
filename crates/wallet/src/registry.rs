//! Provider discovery.
//!
//! Hosts frequently inject several wallets at once (`window.ethereum.providers`),
//! and many of them claim `isMetaMask` for compatibility. The registry tells
//! them apart by their vendor markers instead of trusting one global slot.
//!
//! Rules per wallet kind, in priority order:
//! - MetaMask: `isMetaMask` with no other vendor marker
//! - Coinbase Extension: the dedicated `coinbaseWalletExtension` slot, then any
//!   candidate (or the `selectedProvider`) marked `isCoinbaseWallet`
//! - Coinbase Smart Wallet: the SDK-provided provider, when the host exposes one
//! - Rainbow: `isRainbow`
//! - Phantom: the `phantom.solana` / `solana.isPhantom` slot, then `phantom.ethereum`
//!
//! When several candidates match, the one with the fewest vendor markers wins.

use std::sync::Arc;

use vmf_chain::{Eip1193Provider, ProviderFlags, SolanaProvider};

use crate::kinds::{ChainFamily, ProviderDescriptor, WalletKind};

/// The injected-provider slots a host exposes.
///
/// Every method defaults to "absent", so an environment with no wallet at
/// all is just an empty impl.
pub trait HostEnvironment: Send + Sync {
    /// The primary injected slot (`window.ethereum`).
    fn ethereum(&self) -> Option<Arc<dyn Eip1193Provider>> {
        None
    }

    /// `window.ethereum.providers`, when several wallets are injected.
    fn injected_providers(&self) -> Vec<Arc<dyn Eip1193Provider>> {
        Vec::new()
    }

    /// `window.ethereum.selectedProvider`.
    fn selected_provider(&self) -> Option<Arc<dyn Eip1193Provider>> {
        None
    }

    /// `window.coinbaseWalletExtension`.
    fn coinbase_extension(&self) -> Option<Arc<dyn Eip1193Provider>> {
        None
    }

    /// Provider built by the Coinbase Smart Wallet SDK.
    fn coinbase_smart_wallet(&self) -> Option<Arc<dyn Eip1193Provider>> {
        None
    }

    /// `window.phantom.ethereum`.
    fn phantom_ethereum(&self) -> Option<Arc<dyn Eip1193Provider>> {
        None
    }

    /// `window.phantom.solana`, falling back to `window.solana`.
    fn solana(&self) -> Option<Arc<dyn SolanaProvider>> {
        None
    }
}

/// A host whose slots are fixed at construction.
#[derive(Clone, Default)]
pub struct StaticHost {
    ethereum: Option<Arc<dyn Eip1193Provider>>,
    providers: Vec<Arc<dyn Eip1193Provider>>,
    selected: Option<Arc<dyn Eip1193Provider>>,
    coinbase_extension: Option<Arc<dyn Eip1193Provider>>,
    coinbase_smart_wallet: Option<Arc<dyn Eip1193Provider>>,
    phantom_ethereum: Option<Arc<dyn Eip1193Provider>>,
    solana: Option<Arc<dyn SolanaProvider>>,
}

impl StaticHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ethereum(mut self, provider: Arc<dyn Eip1193Provider>) -> Self {
        self.ethereum = Some(provider);
        self
    }

    pub fn with_injected(mut self, provider: Arc<dyn Eip1193Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_selected(mut self, provider: Arc<dyn Eip1193Provider>) -> Self {
        self.selected = Some(provider);
        self
    }

    pub fn with_coinbase_extension(mut self, provider: Arc<dyn Eip1193Provider>) -> Self {
        self.coinbase_extension = Some(provider);
        self
    }

    pub fn with_coinbase_smart_wallet(mut self, provider: Arc<dyn Eip1193Provider>) -> Self {
        self.coinbase_smart_wallet = Some(provider);
        self
    }

    pub fn with_phantom_ethereum(mut self, provider: Arc<dyn Eip1193Provider>) -> Self {
        self.phantom_ethereum = Some(provider);
        self
    }

    pub fn with_solana(mut self, provider: Arc<dyn SolanaProvider>) -> Self {
        self.solana = Some(provider);
        self
    }
}

impl HostEnvironment for StaticHost {
    fn ethereum(&self) -> Option<Arc<dyn Eip1193Provider>> {
        self.ethereum.clone()
    }

    fn injected_providers(&self) -> Vec<Arc<dyn Eip1193Provider>> {
        self.providers.clone()
    }

    fn selected_provider(&self) -> Option<Arc<dyn Eip1193Provider>> {
        self.selected.clone()
    }

    fn coinbase_extension(&self) -> Option<Arc<dyn Eip1193Provider>> {
        self.coinbase_extension.clone()
    }

    fn coinbase_smart_wallet(&self) -> Option<Arc<dyn Eip1193Provider>> {
        self.coinbase_smart_wallet.clone()
    }

    fn phantom_ethereum(&self) -> Option<Arc<dyn Eip1193Provider>> {
        self.phantom_ethereum.clone()
    }

    fn solana(&self) -> Option<Arc<dyn SolanaProvider>> {
        self.solana.clone()
    }
}

/// A resolved, connectable provider.
#[derive(Clone)]
pub enum ProviderHandle {
    Evm(Arc<dyn Eip1193Provider>),
    Solana(Arc<dyn SolanaProvider>),
}

impl ProviderHandle {
    pub fn family(&self) -> ChainFamily {
        match self {
            Self::Evm(_) => ChainFamily::Evm,
            Self::Solana(_) => ChainFamily::Solana,
        }
    }

    pub fn as_evm(&self) -> Option<&Arc<dyn Eip1193Provider>> {
        match self {
            Self::Evm(provider) => Some(provider),
            Self::Solana(_) => None,
        }
    }
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Evm(p) => f.debug_tuple("Evm").field(&p.flags()).finish(),
            Self::Solana(_) => f.write_str("Solana"),
        }
    }
}

pub struct ProviderRegistry {
    host: Arc<dyn HostEnvironment>,
}

impl ProviderRegistry {
    pub fn new(host: Arc<dyn HostEnvironment>) -> Self {
        Self { host }
    }

    /// Every wallet kind with its install status. Never fails; a host with
    /// no wallets yields descriptors that are all `installed: false`.
    pub fn list_providers(&self) -> Vec<ProviderDescriptor> {
        WalletKind::ALL
            .into_iter()
            .map(|kind| ProviderDescriptor::new(kind, self.resolve_provider(kind).is_some()))
            .collect()
    }

    /// The provider to use for `kind`, or `None` when the wallet is absent.
    pub fn resolve_provider(&self, kind: WalletKind) -> Option<ProviderHandle> {
        match kind {
            WalletKind::MetaMask => self
                .most_specific(|f| f.is_metamask && f.marker_count() == 1)
                .map(ProviderHandle::Evm),
            WalletKind::CoinbaseExtension => self
                .host
                .coinbase_extension()
                .or_else(|| self.most_specific(|f| f.is_coinbase_wallet))
                .or_else(|| {
                    self.host
                        .selected_provider()
                        .filter(|p| p.flags().is_coinbase_wallet)
                })
                .map(ProviderHandle::Evm),
            WalletKind::CoinbaseSmart => self.host.coinbase_smart_wallet().map(ProviderHandle::Evm),
            WalletKind::Rainbow => self
                .most_specific(|f| f.is_rainbow)
                .map(ProviderHandle::Evm),
            WalletKind::Phantom => self
                .host
                .solana()
                .filter(|p| p.is_phantom())
                .map(ProviderHandle::Solana)
                .or_else(|| self.host.phantom_ethereum().map(ProviderHandle::Evm)),
        }
    }

    fn candidates(&self) -> Vec<Arc<dyn Eip1193Provider>> {
        let injected = self.host.injected_providers();
        if !injected.is_empty() {
            return injected;
        }
        self.host.ethereum().into_iter().collect()
    }

    fn most_specific<F>(&self, matches: F) -> Option<Arc<dyn Eip1193Provider>>
    where
        F: Fn(&ProviderFlags) -> bool,
    {
        self.candidates()
            .into_iter()
            .filter(|p| matches(&p.flags()))
            .min_by_key(|p| p.flags().marker_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedSolana, ScriptedWallet};
    use vmf_chain::network::BASE_CHAIN_ID;

    fn wallet(flags: ProviderFlags) -> Arc<dyn Eip1193Provider> {
        Arc::new(ScriptedWallet::new(BASE_CHAIN_ID).with_flags(flags))
    }

    fn registry(host: StaticHost) -> ProviderRegistry {
        ProviderRegistry::new(Arc::new(host))
    }

    #[test]
    fn test_empty_host_lists_nothing_installed() {
        let descriptors = registry(StaticHost::new()).list_providers();
        assert_eq!(descriptors.len(), WalletKind::ALL.len());
        assert!(descriptors.iter().all(|d| !d.installed));
    }

    #[test]
    fn test_single_metamask_slot() {
        let reg = registry(StaticHost::new().with_ethereum(wallet(ProviderFlags {
            is_metamask: true,
            ..Default::default()
        })));
        assert!(reg.resolve_provider(WalletKind::MetaMask).is_some());
        assert!(reg.resolve_provider(WalletKind::CoinbaseExtension).is_none());
        assert!(reg.resolve_provider(WalletKind::Rainbow).is_none());
    }

    #[test]
    fn test_coinbase_claiming_metamask_is_not_metamask() {
        let reg = registry(StaticHost::new().with_ethereum(wallet(ProviderFlags {
            is_metamask: true,
            is_coinbase_wallet: true,
            ..Default::default()
        })));
        assert!(reg.resolve_provider(WalletKind::MetaMask).is_none());
        assert!(reg.resolve_provider(WalletKind::CoinbaseExtension).is_some());
    }

    #[test]
    fn test_multiple_injected_providers_are_disambiguated() {
        let metamask = wallet(ProviderFlags {
            is_metamask: true,
            ..Default::default()
        });
        let rainbow = wallet(ProviderFlags {
            is_metamask: true,
            is_rainbow: true,
            ..Default::default()
        });
        let coinbase = wallet(ProviderFlags {
            is_coinbase_wallet: true,
            ..Default::default()
        });
        let reg = registry(
            StaticHost::new()
                .with_ethereum(rainbow.clone())
                .with_injected(rainbow.clone())
                .with_injected(coinbase.clone())
                .with_injected(metamask.clone()),
        );

        let resolved = |kind| match reg.resolve_provider(kind) {
            Some(ProviderHandle::Evm(p)) => p,
            other => panic!("expected EVM provider for {:?}, got {:?}", kind, other),
        };
        assert!(Arc::ptr_eq(&resolved(WalletKind::MetaMask), &metamask));
        assert!(Arc::ptr_eq(&resolved(WalletKind::Rainbow), &rainbow));
        assert!(Arc::ptr_eq(&resolved(WalletKind::CoinbaseExtension), &coinbase));
    }

    #[test]
    fn test_dedicated_coinbase_slot_wins() {
        let generic = wallet(ProviderFlags {
            is_coinbase_wallet: true,
            ..Default::default()
        });
        let dedicated = wallet(ProviderFlags::default());
        let reg = registry(
            StaticHost::new()
                .with_ethereum(generic)
                .with_coinbase_extension(dedicated.clone()),
        );
        match reg.resolve_provider(WalletKind::CoinbaseExtension) {
            Some(ProviderHandle::Evm(p)) => assert!(Arc::ptr_eq(&p, &dedicated)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_selected_provider_fallback_for_coinbase() {
        let selected = wallet(ProviderFlags {
            is_coinbase_wallet: true,
            ..Default::default()
        });
        let reg = registry(
            StaticHost::new()
                .with_ethereum(wallet(ProviderFlags::default()))
                .with_selected(selected),
        );
        assert!(reg.resolve_provider(WalletKind::CoinbaseExtension).is_some());
    }

    #[test]
    fn test_phantom_prefers_solana() {
        let reg = registry(
            StaticHost::new()
                .with_solana(Arc::new(ScriptedSolana::new("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU")))
                .with_phantom_ethereum(wallet(ProviderFlags {
                    is_phantom: true,
                    ..Default::default()
                })),
        );
        let handle = reg.resolve_provider(WalletKind::Phantom).unwrap();
        assert_eq!(handle.family(), ChainFamily::Solana);

        let evm_only = registry(StaticHost::new().with_phantom_ethereum(wallet(ProviderFlags {
            is_phantom: true,
            ..Default::default()
        })));
        let handle = evm_only.resolve_provider(WalletKind::Phantom).unwrap();
        assert_eq!(handle.family(), ChainFamily::Evm);
    }

    #[test]
    fn test_smart_wallet_installed_only_when_exposed() {
        let reg = registry(StaticHost::new().with_coinbase_smart_wallet(wallet(ProviderFlags::default())));
        let listed = reg.list_providers();
        let smart = listed
            .iter()
            .find(|d| d.id == WalletKind::CoinbaseSmart)
            .unwrap();
        assert!(smart.installed);
        assert_eq!(listed.iter().filter(|d| d.installed).count(), 1);
    }
}
