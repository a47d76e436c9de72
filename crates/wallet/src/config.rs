//! Session configuration.

use std::time::Duration;

use vmf_chain::network::SupportedNetwork;

/// Storage key of the cached connection.
pub const SESSION_KEY: &str = "vmf_connected_wallet";

/// How long a cached connection may be silently restored.
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Deadline for a single wallet request. Generous, since most requests wait
/// on a human in the wallet UI.
pub const DEFAULT_WALLET_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Pause after a chain switch before re-reading the active chain.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

const DEFAULT_CONSENT_MESSAGE: &str =
    "Welcome to VMF!\n\nSign this message to confirm you own this wallet.\n\nAddress: {address}\nNonce: {nonce}";

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub request_timeout: Duration,
    pub settle_delay: Duration,
    /// Chains a caching wallet is bounced through before returning to the target.
    pub cycle_chain_ids: Vec<u64>,
    /// Consent text; `{address}` and `{nonce}` are substituted.
    pub consent_message: String,
    pub session_ttl: Duration,
}

impl SessionConfig {
    pub fn consent_message_for(&self, address: &str, nonce: &str) -> String {
        self.consent_message
            .replace("{address}", address)
            .replace("{nonce}", nonce)
    }

    /// No settle delay; for tests and hosts that confirm switches synchronously.
    pub fn without_settle_delay(mut self) -> Self {
        self.settle_delay = Duration::ZERO;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_WALLET_REQUEST_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            cycle_chain_ids: vec![SupportedNetwork::ETHEREUM.chain_id],
            consent_message: DEFAULT_CONSENT_MESSAGE.to_string(),
            session_ttl: SESSION_TTL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consent_message_substitution() {
        let config = SessionConfig::default();
        let message = config.consent_message_for("0xabc", "n0nce");
        assert!(message.contains("Address: 0xabc"));
        assert!(message.ends_with("Nonce: n0nce"));
    }
}
