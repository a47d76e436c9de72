//! Connection session state machine.
//!
//! ```text
//! Disconnected -> Detecting -> Connecting -> (AwaitingSignature) -> Switching -> Connected
//!                                                                       |
//!                                                                       +-> WrongNetwork
//! ```
//!
//! `Failed` is reachable from every non-terminal state. `Connected` and
//! `WrongNetwork` fall back to `Disconnected` on an explicit disconnect or
//! when the wallet reports zero accounts.
//!
//! The session's state and its record are the only ground truth a UI should
//! render; it should never poll the wallet on its own. Subscribe through
//! [`ConnectionSession::subscribe`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::json;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use vmf_chain::{run_ordered, AttemptLog, ChainTarget, Eip1193Provider, ProviderEvent, SolanaProvider};

use crate::balance::native_balance;
use crate::config::SessionConfig;
use crate::enforcer::{EnforcementOutcome, NetworkEnforcer};
use crate::errors::ConnectionError;
use crate::kinds::{ChainFamily, WalletKind};
use crate::recovery::{default_recovery_strategies, RecoveryContext, RecoveryStrategy};
use crate::registry::{HostEnvironment, ProviderHandle, ProviderRegistry};
use crate::request::{parse_accounts, request};
use crate::store::{SessionCacheEntry, SessionStore};

/// A verified connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    pub address: String,
    /// Active EVM chain; `None` for Solana connections.
    pub chain_id: Option<u64>,
    pub wallet_kind: WalletKind,
    pub family: ChainFamily,
    /// Native balance in ether, 4 decimals, when it could be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_native: Option<String>,
}

impl ConnectionRecord {
    fn evm(wallet_kind: WalletKind, address: String, chain_id: Option<u64>) -> Self {
        Self {
            address,
            chain_id,
            wallet_kind,
            family: ChainFamily::Evm,
            balance_native: None,
        }
    }

    fn solana(wallet_kind: WalletKind, address: String) -> Self {
        Self {
            address,
            chain_id: None,
            wallet_kind,
            family: ChainFamily::Solana,
            balance_native: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "record", rename_all = "camelCase")]
pub enum SessionState {
    Disconnected,
    Detecting,
    Connecting,
    AwaitingSignature,
    Switching,
    Connected(ConnectionRecord),
    /// Account known, but the wallet is not on the target chain.
    WrongNetwork(ConnectionRecord),
    Failed(String),
}

impl SessionState {
    pub fn record(&self) -> Option<&ConnectionRecord> {
        match self {
            Self::Connected(record) | Self::WrongNetwork(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Detecting => "Detecting",
            Self::Connecting => "Connecting",
            Self::AwaitingSignature => "AwaitingSignature",
            Self::Switching => "Switching",
            Self::Connected(_) => "Connected",
            Self::WrongNetwork(_) => "WrongNetwork",
            Self::Failed(_) => "Failed",
        }
    }
}

struct ActiveConnection {
    kind: WalletKind,
    handle: ProviderHandle,
}

/// Clears the in-flight flag when a connect attempt ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct ConnectionSession {
    registry: ProviderRegistry,
    enforcer: NetworkEnforcer,
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
    recovery: Vec<Box<dyn RecoveryStrategy>>,
    state: watch::Sender<SessionState>,
    active: Mutex<Option<ActiveConnection>>,
    in_flight: AtomicBool,
}

impl ConnectionSession {
    pub fn new(
        host: Arc<dyn HostEnvironment>,
        target: ChainTarget,
        store: Arc<dyn SessionStore>,
        config: SessionConfig,
    ) -> Self {
        let enforcer = NetworkEnforcer::with_timing(target, config.settle_delay, config.request_timeout);
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self {
            registry: ProviderRegistry::new(host),
            enforcer,
            store,
            config,
            recovery: default_recovery_strategies(),
            state,
            active: Mutex::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Replace the recovery sequence used for caching wallets.
    pub fn with_recovery(mut self, strategies: Vec<Box<dyn RecoveryStrategy>>) -> Self {
        self.recovery = strategies;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn enforcer(&self) -> &NetworkEnforcer {
        &self.enforcer
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn record(&self) -> Option<ConnectionRecord> {
        self.state.borrow().record().cloned()
    }

    /// The EVM provider behind the current connection, if any.
    pub fn active_provider(&self) -> Option<Arc<dyn Eip1193Provider>> {
        self.lock_active()
            .as_ref()
            .and_then(|active| active.handle.as_evm().cloned())
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveConnection>> {
        self.active.lock().unwrap_or_else(|poisoned| {
            warn!("Session mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn set_active(&self, kind: WalletKind, handle: ProviderHandle) {
        *self.lock_active() = Some(ActiveConnection { kind, handle });
    }

    fn transition(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        debug!("Session {} -> {}", previous.name(), self.state.borrow().name());
    }

    /// `Connected` on the target chain, `WrongNetwork` anywhere else.
    fn placed(&self, record: ConnectionRecord) -> SessionState {
        match (record.family, record.chain_id) {
            (ChainFamily::Evm, Some(id)) if id != self.enforcer.target().chain_id => {
                SessionState::WrongNetwork(record)
            }
            (ChainFamily::Evm, None) => SessionState::WrongNetwork(record),
            _ => SessionState::Connected(record),
        }
    }

    fn persist(&self, record: &ConnectionRecord) {
        let entry = SessionCacheEntry::new(record.wallet_kind, record.address.clone());
        if let Err(e) = self.store.save(&entry) {
            warn!("Could not cache session: {}", e);
        }
    }

    fn clear_cache(&self) {
        if let Err(e) = self.store.clear() {
            warn!("Could not clear cached session: {}", e);
        }
    }

    /// Turn a connect intent into a verified connection.
    ///
    /// A second call while one is running fails with `ConnectInProgress`
    /// rather than racing the first against the same wallet.
    pub async fn connect(&self, kind: WalletKind) -> Result<ConnectionRecord, ConnectionError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Connect to {} rejected, another attempt is in flight", kind);
            return Err(ConnectionError::ConnectInProgress);
        }
        let _in_flight = InFlight(&self.in_flight);

        let result = self.run_connect(kind).await;
        match &result {
            Ok(record) => info!("Connected {} as {}", kind, record.address),
            Err(ConnectionError::ProviderNotFound { .. }) => {
                info!("{} is not installed", kind);
                self.transition(SessionState::Disconnected);
            }
            // state already carries the record
            Err(ConnectionError::WrongNetwork { .. }) => {}
            Err(e) => {
                warn!("Connecting {} failed: {}", kind, e);
                self.transition(SessionState::Failed(e.to_string()));
            }
        }
        result
    }

    async fn run_connect(&self, kind: WalletKind) -> Result<ConnectionRecord, ConnectionError> {
        self.transition(SessionState::Detecting);
        let handle = self
            .registry
            .resolve_provider(kind)
            .ok_or_else(|| ConnectionError::provider_not_found(kind))?;

        match handle {
            ProviderHandle::Evm(provider) => self.connect_evm(kind, provider).await,
            ProviderHandle::Solana(provider) => self.connect_solana(kind, provider).await,
        }
    }

    async fn connect_evm(
        &self,
        kind: WalletKind,
        provider: Arc<dyn Eip1193Provider>,
    ) -> Result<ConnectionRecord, ConnectionError> {
        let p = provider.as_ref();
        self.hygiene(p).await;

        self.transition(SessionState::Connecting);
        let accounts = self.request_accounts(kind, p).await?;
        let address = accounts.into_iter().next().ok_or(ConnectionError::NoAccounts)?;

        self.transition(SessionState::Switching);
        if let EnforcementOutcome::Failed(failure) = self.enforcer.ensure_chain(p).await {
            let chain_id = self.enforcer.get_active_chain(p).await.ok();
            let record = ConnectionRecord::evm(kind, address.clone(), chain_id);
            self.set_active(kind, ProviderHandle::Evm(provider.clone()));
            self.transition(SessionState::WrongNetwork(record));
            return Err(ConnectionError::WrongNetwork {
                address,
                reason: failure.to_string(),
                instructions: failure
                    .instructions()
                    .map(str::to_string)
                    .unwrap_or_else(|| self.enforcer.target().manual_instructions()),
            });
        }

        let mut record = ConnectionRecord::evm(kind, address, Some(self.enforcer.target().chain_id));
        record.balance_native = match native_balance(p, &record.address, self.config.request_timeout).await {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!("Could not read native balance: {}", e);
                None
            }
        };

        self.persist(&record);
        self.set_active(kind, ProviderHandle::Evm(provider.clone()));
        self.transition(SessionState::Connected(record.clone()));
        Ok(record)
    }

    /// Best-effort revoke and unlock probe so every session asks for
    /// visible consent. Failures are logged and ignored.
    async fn hygiene(&self, p: &dyn Eip1193Provider) {
        let timeout = self.config.request_timeout;
        if p.supports("wallet_revokePermissions") {
            if let Err(e) = request(p, "wallet_revokePermissions", json!([{ "eth_accounts": {} }]), timeout).await {
                debug!("Permission revoke failed (ignored): {}", e);
            }
        }
        if let Err(e) = request(p, "eth_accounts", json!([]), timeout).await {
            debug!("Unlock probe failed (ignored): {}", e);
        }
    }

    async fn request_accounts(
        &self,
        kind: WalletKind,
        p: &dyn Eip1193Provider,
    ) -> Result<Vec<String>, ConnectionError> {
        let primary = request(p, "eth_requestAccounts", json!([]), self.config.request_timeout)
            .await
            .and_then(parse_accounts);

        match primary {
            Ok(accounts) if !accounts.is_empty() => return Ok(accounts),
            Err(e) if e.is_user_rejected() => return Err(ConnectionError::UserRejected),
            Err(ConnectionError::RequestPending) => return Err(ConnectionError::RequestPending),
            Ok(_) if !kind.caches_sessions() => return Err(ConnectionError::NoAccounts),
            Err(e) if !kind.caches_sessions() => return Err(e),
            Ok(_) => info!("{} returned no accounts, running recovery", kind),
            Err(e) => info!("{} account request failed ({}), running recovery", kind, e),
        }

        self.transition(SessionState::AwaitingSignature);
        let ctx = RecoveryContext {
            provider: p,
            target: self.enforcer.target(),
            config: &self.config,
        };
        let mut log = AttemptLog::new();
        let found = run_ordered(&self.recovery, &mut log, |strategy| strategy.attempt(&ctx)).await;
        info!("Recovery for {}: {}", kind, log.summary());

        found?
            .filter(|accounts| !accounts.is_empty())
            .ok_or(ConnectionError::NoAccounts)
    }

    async fn connect_solana(
        &self,
        kind: WalletKind,
        provider: Arc<dyn SolanaProvider>,
    ) -> Result<ConnectionRecord, ConnectionError> {
        self.transition(SessionState::Connecting);
        let address = self.solana_connect(provider.as_ref(), false).await?;

        let record = ConnectionRecord::solana(kind, address);
        self.persist(&record);
        self.set_active(kind, ProviderHandle::Solana(provider));
        self.transition(SessionState::Connected(record.clone()));
        Ok(record)
    }

    async fn solana_connect(
        &self,
        provider: &dyn SolanaProvider,
        only_if_trusted: bool,
    ) -> Result<String, ConnectionError> {
        let address = tokio::time::timeout(self.config.request_timeout, provider.connect(only_if_trusted))
            .await
            .map_err(|_| ConnectionError::Timeout {
                method: "connect".to_string(),
            })??;
        if address.is_empty() {
            return Err(ConnectionError::NoAccounts);
        }
        Ok(address)
    }

    /// Best-effort provider disconnect, then forget the session.
    pub async fn disconnect(&self) {
        let active = self.lock_active().take();
        if let Some(active) = active {
            let timeout = self.config.request_timeout;
            let result = match &active.handle {
                ProviderHandle::Evm(p) => tokio::time::timeout(timeout, p.disconnect()).await,
                ProviderHandle::Solana(p) => tokio::time::timeout(timeout, p.disconnect()).await,
            };
            match result {
                Ok(Ok(())) => debug!("{} disconnected", active.kind),
                Ok(Err(e)) => debug!("{} disconnect failed (ignored): {}", active.kind, e),
                Err(_) => debug!("{} disconnect timed out (ignored)", active.kind),
            }
        }
        self.clear_cache();
        self.transition(SessionState::Disconnected);
    }

    /// Startup only: silently restore a cached connection younger than the TTL.
    pub async fn restore_session(&self) -> Option<ConnectionRecord> {
        let entry = match self.store.load() {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cached session unreadable, clearing it: {}", e);
                self.clear_cache();
                return None;
            }
        };

        if entry.is_expired(Utc::now(), self.config.session_ttl) {
            info!("Cached {} session expired, clearing it", entry.wallet_kind);
            self.clear_cache();
            self.transition(SessionState::Disconnected);
            return None;
        }

        match self.silent_reconnect(&entry).await {
            Ok(record) => {
                info!("Restored {} session for {}", entry.wallet_kind, record.address);
                Some(record)
            }
            Err(e) => {
                info!("Cached {} session not restored: {}", entry.wallet_kind, e);
                self.clear_cache();
                self.transition(SessionState::Disconnected);
                None
            }
        }
    }

    async fn silent_reconnect(&self, entry: &SessionCacheEntry) -> Result<ConnectionRecord, ConnectionError> {
        let kind = entry.wallet_kind;
        let handle = self
            .registry
            .resolve_provider(kind)
            .ok_or_else(|| ConnectionError::provider_not_found(kind))?;

        let record = match &handle {
            ProviderHandle::Evm(provider) => {
                let p = provider.as_ref();
                let accounts = parse_accounts(request(p, "eth_accounts", json!([]), self.config.request_timeout).await?)?;
                let live = self.check_cached(entry, accounts.into_iter().next())?;
                let chain_id = self.enforcer.observe_chain(p).await?;
                let mut record = ConnectionRecord::evm(kind, live, Some(chain_id));
                record.balance_native = native_balance(p, &record.address, self.config.request_timeout)
                    .await
                    .ok();
                record
            }
            ProviderHandle::Solana(provider) => {
                let live = self.solana_connect(provider.as_ref(), true).await?;
                ConnectionRecord::solana(kind, self.check_cached(entry, Some(live))?)
            }
        };

        self.set_active(kind, handle);
        self.transition(self.placed(record.clone()));
        Ok(record)
    }

    fn check_cached(&self, entry: &SessionCacheEntry, live: Option<String>) -> Result<String, ConnectionError> {
        let live = live.ok_or(ConnectionError::NoAccounts)?;
        if entry.matches_address(&live) {
            Ok(live)
        } else {
            Err(ConnectionError::AccountMismatch {
                cached: entry.address.clone(),
                live,
            })
        }
    }

    /// Apply a provider event to the current connection.
    pub fn handle_event(&self, event: ProviderEvent) {
        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.into_iter().next() {
                None => {
                    info!("Wallet reported no accounts, disconnecting");
                    self.reset();
                }
                Some(address) => {
                    if let Some(mut record) = self.record() {
                        if !record.address.eq_ignore_ascii_case(&address) {
                            info!("Wallet account changed to {}", address);
                            record.address = address;
                            let next = self.placed(record);
                            if let SessionState::Connected(record) = &next {
                                self.persist(record);
                            }
                            self.transition(next);
                        }
                    }
                }
            },
            ProviderEvent::ChainChanged(chain_id) => {
                if let Some(mut record) = self.record().filter(|r| r.family == ChainFamily::Evm) {
                    debug!("Wallet chain changed to {}", chain_id);
                    record.chain_id = Some(chain_id);
                    self.transition(self.placed(record));
                }
            }
            ProviderEvent::Disconnect => {
                info!("Wallet disconnected");
                self.reset();
            }
        }
    }

    fn reset(&self) {
        self.lock_active().take();
        self.clear_cache();
        self.transition(SessionState::Disconnected);
    }

    /// Forward the active wallet's events into [`handle_event`](Self::handle_event)
    /// until the wallet stops emitting or the session is dropped.
    pub fn listen_for_events(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let provider = self.active_provider()?;
        let mut events = provider.events()?;
        let session = Arc::downgrade(self);

        Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => match session.upgrade() {
                        Some(session) => session.handle_event(event),
                        None => break,
                    },
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("Missed {} wallet events", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("Wallet event listener stopped");
        }))
    }
}
