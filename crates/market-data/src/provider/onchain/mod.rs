//! On-chain price sources.
//!
//! All of them are read-only `eth_call`s built with the hand-rolled encoder
//! and submitted through a [`CallTransport`], so tests can script results
//! without a node.

mod oracle;
mod quoter;
mod slot0;
mod static_multiple;

pub use oracle::FixedPriceOracleSource;
pub use quoter::QuoterSource;
pub use slot0::{sqrt_price_x96_to_price, PoolSlot0Source};
pub use static_multiple::StaticMultipleSource;

use vmf_chain::{CallArg, CallTransport, RawCall};

use crate::errors::MarketDataError;

/// Encode and submit one read, returning the raw hex result.
async fn read(
    transport: &dyn CallTransport,
    to: &str,
    selector: &str,
    args: &[CallArg],
) -> Result<String, MarketDataError> {
    let call = RawCall::new(to, selector, args)?;
    Ok(transport.eth_call(&call).await?)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use vmf_chain::{CallTransport, ChainError, RawCall};

    /// Transport answering by `(to, selector)`; unknown calls revert (`0x`).
    #[derive(Default)]
    pub struct ScriptedTransport {
        replies: HashMap<(String, String), Result<String, String>>,
        pub calls: AtomicUsize,
    }

    impl ScriptedTransport {
        pub fn reply(mut self, to: &str, selector: &str, result: &str) -> Self {
            self.replies.insert(
                (to.to_ascii_lowercase(), selector.to_string()),
                Ok(result.to_string()),
            );
            self
        }

        pub fn fail(mut self, to: &str, selector: &str, message: &str) -> Self {
            self.replies.insert(
                (to.to_ascii_lowercase(), selector.to_string()),
                Err(message.to_string()),
            );
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CallTransport for ScriptedTransport {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn eth_call(&self, call: &RawCall) -> Result<String, ChainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let key = (call.to.clone(), call.selector().to_string());
            match self.replies.get(&key) {
                Some(Ok(result)) => Ok(result.clone()),
                Some(Err(message)) => Err(ChainError::Timeout(message.clone())),
                None => Ok("0x".to_string()),
            }
        }
    }

    /// Left-pad a hex value to one 32-byte word.
    pub fn word(hex: &str) -> String {
        format!("0x{:0>64}", hex.trim_start_matches("0x"))
    }
}
