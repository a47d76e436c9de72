//! Network enforcement.
//!
//! Drives a connected wallet onto the one chain VMF requires:
//!
//! 1. Read the active chain; if it already matches, stop (no prompts).
//! 2. Request a switch, wait for it to settle and read the chain again.
//! 3. If the wallet does not know the chain, add it and switch once more.
//! 4. A rejection ends enforcement with a user-actionable failure.
//! 5. Anything else ends it with the manual setup instructions.
//!
//! There is no retry beyond the single add-then-switch cycle.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;
use vmf_chain::{parse_chain_id, ChainTarget, Eip1193Provider};

use crate::config::{DEFAULT_SETTLE_DELAY, DEFAULT_WALLET_REQUEST_TIMEOUT};
use crate::errors::ConnectionError;
use crate::request::request;

/// Where enforcement currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NetworkState {
    Unknown,
    Correct,
    Wrong,
    Switching,
    Adding,
    Failed,
}

/// Why the wallet could not be moved to the target chain.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum EnforcementFailure {
    #[error("Network switch rejected. Please switch to {chain_name} in your wallet to continue.")]
    UserRejected { chain_name: String },

    #[error("A network request is already pending. Please check your wallet.")]
    RequestPending,

    #[error("Could not read the active chain: {reason}")]
    ChainUnreadable { reason: String, instructions: String },

    #[error("Could not switch to {chain_name}: {reason}")]
    SwitchFailed {
        chain_name: String,
        reason: String,
        instructions: String,
    },

    #[error("Could not add {chain_name} to the wallet: {reason}")]
    AddFailed {
        chain_name: String,
        reason: String,
        instructions: String,
    },

    /// The wallet acknowledged the switch but still reports another chain.
    #[error("Wallet still on chain {actual_chain_id} after switching to {chain_name}")]
    NotApplied {
        chain_name: String,
        actual_chain_id: u64,
        instructions: String,
    },
}

impl EnforcementFailure {
    /// Manual setup text to show verbatim, when the failure calls for it.
    pub fn instructions(&self) -> Option<&str> {
        match self {
            Self::UserRejected { .. } | Self::RequestPending => None,
            Self::ChainUnreadable { instructions, .. }
            | Self::SwitchFailed { instructions, .. }
            | Self::AddFailed { instructions, .. }
            | Self::NotApplied { instructions, .. } => Some(instructions),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnforcementOutcome {
    Correct,
    Failed(EnforcementFailure),
}

impl EnforcementOutcome {
    pub fn is_correct(&self) -> bool {
        matches!(self, Self::Correct)
    }
}

pub struct NetworkEnforcer {
    target: ChainTarget,
    settle_delay: Duration,
    request_timeout: Duration,
    state: Mutex<NetworkState>,
}

impl NetworkEnforcer {
    pub fn new(target: ChainTarget) -> Self {
        Self::with_timing(target, DEFAULT_SETTLE_DELAY, DEFAULT_WALLET_REQUEST_TIMEOUT)
    }

    pub fn with_timing(target: ChainTarget, settle_delay: Duration, request_timeout: Duration) -> Self {
        Self {
            target,
            settle_delay,
            request_timeout,
            state: Mutex::new(NetworkState::Unknown),
        }
    }

    pub fn target(&self) -> &ChainTarget {
        &self.target
    }

    pub fn state(&self) -> NetworkState {
        *self.lock_state()
    }

    fn lock_state(&self) -> MutexGuard<'_, NetworkState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Network state mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn set_state(&self, next: NetworkState) {
        let mut state = self.lock_state();
        if *state != next {
            debug!("Network state {:?} -> {:?}", *state, next);
            *state = next;
        }
    }

    /// One `eth_chainId` read, no retry.
    pub async fn get_active_chain(&self, provider: &dyn Eip1193Provider) -> Result<u64, ConnectionError> {
        let value = request(provider, "eth_chainId", serde_json::json!([]), self.request_timeout).await?;
        Ok(parse_chain_id(&value)?)
    }

    /// Read the active chain and record whether it is the target. Never prompts.
    pub async fn observe_chain(&self, provider: &dyn Eip1193Provider) -> Result<u64, ConnectionError> {
        let chain_id = self.get_active_chain(provider).await?;
        self.set_state(if chain_id == self.target.chain_id {
            NetworkState::Correct
        } else {
            NetworkState::Wrong
        });
        Ok(chain_id)
    }

    /// Whether `provider` is on the target chain. Never prompts.
    pub async fn verify_chain(&self, provider: &dyn Eip1193Provider) -> Result<bool, ConnectionError> {
        Ok(self.observe_chain(provider).await? == self.target.chain_id)
    }

    /// Make sure `provider` is on the target chain.
    pub async fn ensure_chain(&self, provider: &dyn Eip1193Provider) -> EnforcementOutcome {
        let outcome = self.enforce(provider).await;
        match &outcome {
            EnforcementOutcome::Correct => self.set_state(NetworkState::Correct),
            EnforcementOutcome::Failed(failure) => {
                warn!("Network enforcement failed: {}", failure);
                self.set_state(NetworkState::Failed);
            }
        }
        outcome
    }

    async fn enforce(&self, provider: &dyn Eip1193Provider) -> EnforcementOutcome {
        match self.verify_chain(provider).await {
            Ok(true) => return EnforcementOutcome::Correct,
            Ok(false) => {}
            Err(e) => {
                return EnforcementOutcome::Failed(EnforcementFailure::ChainUnreadable {
                    reason: e.to_string(),
                    instructions: self.target.manual_instructions(),
                })
            }
        }

        info!("Switching wallet to {} ({})", self.target.chain_name, self.target.chain_id_hex());
        match self.switch(provider).await {
            Ok(()) => return self.confirm(provider).await,
            Err(e) if e.is_chain_unknown() => {
                debug!("Chain {} unknown to wallet, adding it", self.target.chain_id_hex());
            }
            Err(e) => return EnforcementOutcome::Failed(self.switch_failure(e)),
        }

        self.set_state(NetworkState::Adding);
        let added = request(
            provider,
            "wallet_addEthereumChain",
            self.target.add_chain_params(),
            self.request_timeout,
        )
        .await;
        if let Err(e) = added {
            return EnforcementOutcome::Failed(match e {
                ConnectionError::UserRejected => self.rejected(),
                ConnectionError::RequestPending => EnforcementFailure::RequestPending,
                other => EnforcementFailure::AddFailed {
                    chain_name: self.target.chain_name.clone(),
                    reason: other.to_string(),
                    instructions: self.target.manual_instructions(),
                },
            });
        }

        match self.switch(provider).await {
            Ok(()) => self.confirm(provider).await,
            Err(e) => EnforcementOutcome::Failed(self.switch_failure(e)),
        }
    }

    async fn switch(&self, provider: &dyn Eip1193Provider) -> Result<(), ConnectionError> {
        self.set_state(NetworkState::Switching);
        request(
            provider,
            "wallet_switchEthereumChain",
            self.target.switch_chain_params(),
            self.request_timeout,
        )
        .await
        .map(|_| ())
    }

    /// A switch acknowledgement does not guarantee the wallet moved.
    async fn confirm(&self, provider: &dyn Eip1193Provider) -> EnforcementOutcome {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        match self.get_active_chain(provider).await {
            Ok(chain_id) if chain_id == self.target.chain_id => EnforcementOutcome::Correct,
            Ok(actual_chain_id) => EnforcementOutcome::Failed(EnforcementFailure::NotApplied {
                chain_name: self.target.chain_name.clone(),
                actual_chain_id,
                instructions: self.target.manual_instructions(),
            }),
            Err(e) => EnforcementOutcome::Failed(EnforcementFailure::ChainUnreadable {
                reason: e.to_string(),
                instructions: self.target.manual_instructions(),
            }),
        }
    }

    fn rejected(&self) -> EnforcementFailure {
        EnforcementFailure::UserRejected {
            chain_name: self.target.chain_name.clone(),
        }
    }

    fn switch_failure(&self, error: ConnectionError) -> EnforcementFailure {
        match error {
            ConnectionError::UserRejected => self.rejected(),
            ConnectionError::RequestPending => EnforcementFailure::RequestPending,
            other => EnforcementFailure::SwitchFailed {
                chain_name: self.target.chain_name.clone(),
                reason: other.to_string(),
                instructions: self.target.manual_instructions(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedWallet;
    use vmf_chain::network::BASE_CHAIN_ID;
    use vmf_chain::provider::INTERNAL_ERROR;
    use vmf_chain::ProviderRpcError;

    const SWITCH: &str = "wallet_switchEthereumChain";
    const ADD: &str = "wallet_addEthereumChain";

    fn enforcer() -> NetworkEnforcer {
        NetworkEnforcer::with_timing(ChainTarget::base(), Duration::ZERO, Duration::from_secs(5))
    }

    fn wallet_calls_without_reads(wallet: &ScriptedWallet) -> Vec<String> {
        wallet
            .calls()
            .into_iter()
            .filter(|m| m != "eth_chainId")
            .collect()
    }

    #[tokio::test]
    async fn test_already_correct_makes_no_switch_calls() {
        let wallet = ScriptedWallet::new(BASE_CHAIN_ID);
        let enforcer = enforcer();

        assert_eq!(enforcer.ensure_chain(&wallet).await, EnforcementOutcome::Correct);
        assert_eq!(enforcer.ensure_chain(&wallet).await, EnforcementOutcome::Correct);

        assert_eq!(wallet.calls(), vec!["eth_chainId", "eth_chainId"]);
        assert_eq!(enforcer.state(), NetworkState::Correct);
    }

    #[tokio::test]
    async fn test_known_chain_switches_once() {
        let wallet = ScriptedWallet::new(1).with_known_chains(&[1, BASE_CHAIN_ID]);
        let enforcer = enforcer();

        assert!(enforcer.ensure_chain(&wallet).await.is_correct());
        assert_eq!(wallet_calls_without_reads(&wallet), vec![SWITCH]);
        assert_eq!(wallet.current_chain(), BASE_CHAIN_ID);
    }

    #[tokio::test]
    async fn test_unknown_chain_switch_add_switch() {
        let wallet = ScriptedWallet::new(1).with_known_chains(&[1]);
        let enforcer = enforcer();

        assert!(enforcer.ensure_chain(&wallet).await.is_correct());
        assert_eq!(wallet_calls_without_reads(&wallet), vec![SWITCH, ADD, SWITCH]);
        assert_eq!(wallet.current_chain(), BASE_CHAIN_ID);
        assert_eq!(enforcer.state(), NetworkState::Correct);
    }

    #[tokio::test]
    async fn test_internal_error_treated_as_unknown_chain() {
        let wallet = ScriptedWallet::new(1)
            .script(SWITCH, Err(ProviderRpcError::new(INTERNAL_ERROR, "Unrecognized chain")));
        let enforcer = enforcer();

        assert!(enforcer.ensure_chain(&wallet).await.is_correct());
        assert_eq!(wallet_calls_without_reads(&wallet), vec![SWITCH, ADD, SWITCH]);
    }

    #[tokio::test]
    async fn test_rejected_switch_is_not_retried() {
        let wallet = ScriptedWallet::new(1).script(SWITCH, Err(ProviderRpcError::user_rejected()));
        let enforcer = enforcer();

        let outcome = enforcer.ensure_chain(&wallet).await;
        assert_eq!(
            outcome,
            EnforcementOutcome::Failed(EnforcementFailure::UserRejected {
                chain_name: "Base".to_string()
            })
        );
        assert_eq!(wallet.count(SWITCH), 1);
        assert_eq!(enforcer.state(), NetworkState::Failed);
    }

    #[tokio::test]
    async fn test_rejected_add_stops() {
        let wallet = ScriptedWallet::new(1)
            .with_known_chains(&[1])
            .script(ADD, Err(ProviderRpcError::user_rejected()));

        let outcome = enforcer().ensure_chain(&wallet).await;
        assert!(matches!(
            outcome,
            EnforcementOutcome::Failed(EnforcementFailure::UserRejected { .. })
        ));
        assert_eq!(wallet_calls_without_reads(&wallet), vec![SWITCH, ADD]);
    }

    #[tokio::test]
    async fn test_other_error_carries_instructions() {
        let wallet = ScriptedWallet::new(1).script(SWITCH, Err(ProviderRpcError::new(4100, "unauthorized")));

        match enforcer().ensure_chain(&wallet).await {
            EnforcementOutcome::Failed(failure) => {
                let text = failure.instructions().unwrap();
                assert!(text.contains("RPC URL: https://mainnet.base.org"));
                assert!(text.contains("Chain ID: 8453"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_acknowledged_switch_is_verified() {
        let wallet = ScriptedWallet::new(1).ignoring_switch();

        match enforcer().ensure_chain(&wallet).await {
            EnforcementOutcome::Failed(EnforcementFailure::NotApplied { actual_chain_id, .. }) => {
                assert_eq!(actual_chain_id, 1)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_verify_chain_never_prompts() {
        let wallet = ScriptedWallet::new(1);
        let enforcer = enforcer();

        assert!(!enforcer.verify_chain(&wallet).await.unwrap());
        assert_eq!(enforcer.state(), NetworkState::Wrong);
        assert_eq!(wallet.calls(), vec!["eth_chainId"]);
    }
}
