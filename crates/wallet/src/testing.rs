//! Scripted wallets for unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use vmf_chain::{parse_chain_id, Eip1193Provider, ProviderEvent, ProviderFlags, ProviderRpcError, SolanaProvider};

pub const ALICE: &str = "0x1111111111111111111111111111111111111111";
pub const BOB: &str = "0x2222222222222222222222222222222222222222";

/// An in-memory EIP-1193 wallet.
///
/// Behaves like a real wallet by default (switching to an unknown chain
/// fails with 4902, adding a chain makes it known, ...). `script` queues
/// one-shot responses that take precedence over the default behavior.
pub struct ScriptedWallet {
    flags: ProviderFlags,
    chain_id: Mutex<u64>,
    known_chains: Mutex<HashSet<u64>>,
    accounts: Mutex<Vec<String>>,
    authorized: Mutex<Vec<String>>,
    scripted: Mutex<HashMap<String, VecDeque<Result<Value, ProviderRpcError>>>>,
    unsupported: HashSet<String>,
    ignore_switch: bool,
    request_delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
    events: broadcast::Sender<ProviderEvent>,
    pub disconnects: AtomicUsize,
}

impl ScriptedWallet {
    pub fn new(chain_id: u64) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            flags: ProviderFlags::default(),
            chain_id: Mutex::new(chain_id),
            known_chains: Mutex::new([1, chain_id].into_iter().collect()),
            accounts: Mutex::new(vec![ALICE.to_string()]),
            authorized: Mutex::new(Vec::new()),
            scripted: Mutex::new(HashMap::new()),
            unsupported: HashSet::new(),
            ignore_switch: false,
            request_delay: None,
            calls: Mutex::new(Vec::new()),
            events,
            disconnects: AtomicUsize::new(0),
        }
    }

    pub fn metamask(chain_id: u64) -> Self {
        Self::new(chain_id).with_flags(ProviderFlags {
            is_metamask: true,
            ..Default::default()
        })
    }

    pub fn coinbase(chain_id: u64) -> Self {
        Self::new(chain_id).with_flags(ProviderFlags {
            is_coinbase_wallet: true,
            ..Default::default()
        })
    }

    pub fn with_flags(mut self, flags: ProviderFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_accounts(self, accounts: &[&str]) -> Self {
        *self.accounts.lock().unwrap() = accounts.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Accounts `eth_accounts` returns without a prompt.
    pub fn with_authorized(self, accounts: &[&str]) -> Self {
        *self.authorized.lock().unwrap() = accounts.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_known_chains(self, chains: &[u64]) -> Self {
        *self.known_chains.lock().unwrap() = chains.iter().copied().collect();
        self
    }

    pub fn without_method(mut self, method: &str) -> Self {
        self.unsupported.insert(method.to_string());
        self
    }

    /// Acknowledge switches without actually changing chain.
    pub fn ignoring_switch(mut self) -> Self {
        self.ignore_switch = true;
        self
    }

    /// Make `eth_requestAccounts` take `delay`, like a wallet waiting on its user.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = Some(delay);
        self
    }

    pub fn script(self, method: &str, response: Result<Value, ProviderRpcError>) -> Self {
        self.scripted
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls().iter().filter(|m| m.as_str() == method).count()
    }

    pub fn current_chain(&self) -> u64 {
        *self.chain_id.lock().unwrap()
    }

    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    fn default_response(&self, method: &str, params: &Value) -> Result<Value, ProviderRpcError> {
        match method {
            "eth_chainId" => Ok(json!(format!("{:#x}", self.current_chain()))),
            "eth_accounts" => Ok(json!(self.authorized.lock().unwrap().clone())),
            "eth_requestAccounts" => {
                let accounts = self.accounts.lock().unwrap().clone();
                *self.authorized.lock().unwrap() = accounts.clone();
                Ok(json!(accounts))
            }
            "wallet_switchEthereumChain" => {
                let chain_id = parse_chain_id(&params[0]["chainId"])
                    .map_err(|e| ProviderRpcError::new(-32602, e.to_string()))?;
                if !self.known_chains.lock().unwrap().contains(&chain_id) {
                    return Err(ProviderRpcError::unrecognized_chain(&format!("{:#x}", chain_id)));
                }
                if !self.ignore_switch {
                    *self.chain_id.lock().unwrap() = chain_id;
                }
                Ok(Value::Null)
            }
            "wallet_addEthereumChain" => {
                let chain_id = parse_chain_id(&params[0]["chainId"])
                    .map_err(|e| ProviderRpcError::new(-32602, e.to_string()))?;
                self.known_chains.lock().unwrap().insert(chain_id);
                Ok(Value::Null)
            }
            "wallet_requestPermissions" => {
                let accounts = self.accounts.lock().unwrap().clone();
                *self.authorized.lock().unwrap() = accounts;
                Ok(json!([{ "parentCapability": "eth_accounts" }]))
            }
            "wallet_revokePermissions" => {
                self.authorized.lock().unwrap().clear();
                Ok(Value::Null)
            }
            "personal_sign" => Ok(json!(format!("0x{}", "ab".repeat(65)))),
            // 1.5 ETH
            "eth_getBalance" => Ok(json!("0x14d1120d7b160000")),
            "eth_call" => Ok(json!("0x")),
            other => Err(ProviderRpcError::unsupported_method(other)),
        }
    }
}

#[async_trait]
impl Eip1193Provider for ScriptedWallet {
    fn flags(&self) -> ProviderFlags {
        self.flags
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        self.calls.lock().unwrap().push(method.to_string());

        if let (Some(delay), "eth_requestAccounts") = (self.request_delay, method) {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(response) => response,
            None => self.default_response(method, &params),
        }
    }

    fn supports(&self, method: &str) -> bool {
        !self.unsupported.contains(method)
    }

    fn events(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
        Some(self.events.subscribe())
    }

    async fn disconnect(&self) -> Result<(), ProviderRpcError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// An in-memory Phantom Solana wallet.
pub struct ScriptedSolana {
    pub public_key: String,
    pub trusted: bool,
    pub reject: bool,
    pub disconnects: AtomicUsize,
}

impl ScriptedSolana {
    pub fn new(public_key: &str) -> Self {
        Self {
            public_key: public_key.to_string(),
            trusted: true,
            reject: false,
            disconnects: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SolanaProvider for ScriptedSolana {
    fn is_phantom(&self) -> bool {
        true
    }

    async fn connect(&self, only_if_trusted: bool) -> Result<String, ProviderRpcError> {
        if self.reject || (only_if_trusted && !self.trusted) {
            return Err(ProviderRpcError::user_rejected());
        }
        Ok(self.public_key.clone())
    }

    async fn disconnect(&self) -> Result<(), ProviderRpcError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
