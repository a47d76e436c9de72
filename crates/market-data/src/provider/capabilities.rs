//! Price source classification.

use serde::Serialize;

/// Where a source gets its price from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    /// Third-party HTTP aggregator
    Aggregator,
    /// Read-only contract call over JSON-RPC
    OnChain,
    /// Constant; cannot fail
    Static,
}

impl SourceKind {
    /// Whether the source needs the network at all.
    pub fn is_remote(self) -> bool {
        !matches!(self, Self::Static)
    }
}
