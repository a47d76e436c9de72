//! Per-source circuit breaker.
//!
//! A source that keeps timing out or getting rate limited is skipped for a
//! while instead of costing a round trip on every resolution. States:
//!
//! - **Closed**: the source is tried normally.
//! - **Open**: the source is skipped.
//! - **HalfOpen**: the recovery window elapsed; the source is tried again and
//!   closes after enough successes, or reopens on the first failure.
//!
//! Skipping never reorders the waterfall. State is in-memory only.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::Serialize;

const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
const DEFAULT_RECOVERY_TIMEOUT: Duration = Duration::from_secs(30);
const HALF_OPEN_SUCCESS_THRESHOLD: u32 = 1;

/// Circuit breaker state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Open => write!(f, "Open"),
            Self::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

#[derive(Debug)]
struct Circuit {
    state: CircuitState,
    failure_count: u32,
    half_open_successes: u32,
    opened_at: Option<Instant>,
}

impl Circuit {
    fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            half_open_successes: 0,
            opened_at: None,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Consecutive penalized failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long an open circuit stays open.
    pub recovery_timeout: Duration,
    /// Successes needed in HalfOpen before closing.
    pub half_open_success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            recovery_timeout: DEFAULT_RECOVERY_TIMEOUT,
            half_open_success_threshold: HALF_OPEN_SUCCESS_THRESHOLD,
        }
    }
}

/// Thread-safe circuit breaker keyed by source id.
pub struct CircuitBreaker {
    circuits: Mutex<HashMap<String, Circuit>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::with_config(CircuitBreakerConfig::default())
    }

    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        Self {
            circuits: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// A poisoned lock only means a panic elsewhere; the counters are still usable.
    fn lock_circuits(&self) -> MutexGuard<'_, HashMap<String, Circuit>> {
        self.circuits.lock().unwrap_or_else(|poisoned| {
            warn!("Circuit breaker mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Whether `source` may be tried now. Moves Open to HalfOpen once the
    /// recovery window has elapsed.
    pub fn is_allowed(&self, source: &str) -> bool {
        let mut circuits = self.lock_circuits();
        let circuit = circuits
            .entry(source.to_string())
            .or_insert_with(Circuit::closed);

        match circuit.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = circuit
                    .opened_at
                    .map(|at| at.elapsed() >= self.config.recovery_timeout)
                    .unwrap_or(true);
                if elapsed {
                    info!("Circuit breaker: '{}' Open -> HalfOpen", source);
                    circuit.state = CircuitState::HalfOpen;
                    circuit.half_open_successes = 0;
                }
                elapsed
            }
        }
    }

    pub fn record_success(&self, source: &str) {
        let mut circuits = self.lock_circuits();
        let circuit = circuits
            .entry(source.to_string())
            .or_insert_with(Circuit::closed);

        match circuit.state {
            CircuitState::Closed => circuit.failure_count = 0,
            CircuitState::HalfOpen => {
                circuit.half_open_successes += 1;
                if circuit.half_open_successes >= self.config.half_open_success_threshold {
                    info!("Circuit breaker: '{}' HalfOpen -> Closed", source);
                    *circuit = Circuit::closed();
                }
            }
            CircuitState::Open => {
                debug!("Circuit breaker: success for '{}' while Open", source);
            }
        }
    }

    pub fn record_failure(&self, source: &str) {
        let mut circuits = self.lock_circuits();
        let circuit = circuits
            .entry(source.to_string())
            .or_insert_with(Circuit::closed);

        circuit.failure_count += 1;

        match circuit.state {
            CircuitState::Closed if circuit.failure_count >= self.config.failure_threshold => {
                info!(
                    "Circuit breaker: opening '{}' after {} failures",
                    source, circuit.failure_count
                );
                circuit.state = CircuitState::Open;
                circuit.opened_at = Some(Instant::now());
            }
            CircuitState::Closed => {
                debug!(
                    "Circuit breaker: failure for '{}' ({}/{})",
                    source, circuit.failure_count, self.config.failure_threshold
                );
            }
            CircuitState::HalfOpen => {
                info!("Circuit breaker: '{}' failed in HalfOpen, reopening", source);
                circuit.state = CircuitState::Open;
                circuit.opened_at = Some(Instant::now());
                circuit.half_open_successes = 0;
            }
            CircuitState::Open => {}
        }
    }

    pub fn state(&self, source: &str) -> CircuitState {
        self.lock_circuits()
            .get(source)
            .map(|c| c.state)
            .unwrap_or(CircuitState::Closed)
    }

    pub fn failure_count(&self, source: &str) -> u32 {
        self.lock_circuits()
            .get(source)
            .map(|c| c.failure_count)
            .unwrap_or(0)
    }

    pub fn reset(&self, source: &str) {
        if let Some(circuit) = self.lock_circuits().get_mut(source) {
            info!("Circuit breaker: resetting '{}'", source);
            *circuit = Circuit::closed();
        }
    }

    /// Current state of every source seen so far, sorted by id.
    pub fn snapshot(&self) -> Vec<CircuitSnapshot> {
        let mut snapshot: Vec<CircuitSnapshot> = self
            .lock_circuits()
            .iter()
            .map(|(source, circuit)| CircuitSnapshot {
                source: source.clone(),
                state: circuit.state,
                failure_count: circuit.failure_count,
            })
            .collect();
        snapshot.sort_by(|a, b| a.source.cmp(&b.source));
        snapshot
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

/// State of one source's circuit.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitSnapshot {
    pub source: String,
    pub state: CircuitState,
    pub failure_count: u32,
}
