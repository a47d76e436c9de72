/// How a source failure affects future resolutions.
///
/// The waterfall always moves on to the next source; this only decides the
/// circuit-breaker bookkeeping.
///
/// | Class | Record Circuit Breaker Failure? |
/// |-------|--------------------------------|
/// | `Never` | No |
/// | `FailoverWithPenalty` | Yes |
/// | `NextProvider` | No |
/// | `CircuitOpen` | No (already open) |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// The quote itself was unusable (failed validation). The source is
    /// healthy.
    Never,

    /// Transient failure (timeout, 429, network). Counts towards opening the
    /// source's circuit.
    FailoverWithPenalty,

    /// The source had nothing for us (no pair, unset oracle, revert).
    NextProvider,

    /// The source's circuit is open; it was skipped.
    CircuitOpen,
}

impl RetryClass {
    /// Whether this failure should be recorded against the source.
    pub fn penalizes(self) -> bool {
        matches!(self, Self::FailoverWithPenalty)
    }
}
