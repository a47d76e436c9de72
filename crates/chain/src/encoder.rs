//! Minimal ABI-less call encoding.
//!
//! VMF only ever reads a handful of fixed-layout functions (`balanceOf`,
//! `decimals`, a quoter call and a few static getters), so instead of an ABI
//! coder this module builds payloads by hand: a 4-byte selector followed by
//! one 32-byte word per argument. Addresses are right-aligned in their word,
//! integers are big-endian.
//!
//! Results are decoded the same way: the first 32-byte word of the returned
//! hex string is the value.

use alloy_primitives::{keccak256, U256};
use serde::{Deserialize, Serialize};

use crate::errors::ChainError;

/// `balanceOf(address)`
pub const BALANCE_OF_SELECTOR: &str = "0x70a08231";
/// `decimals()`
pub const DECIMALS_SELECTOR: &str = "0x313ce567";
/// `quoteExactInputSingle(address,address,uint24,uint256,uint160)`
pub const QUOTE_EXACT_INPUT_SINGLE_SELECTOR: &str = "0xf7729d43";
/// `donationMultipleBps()`
pub const DONATION_MULTIPLE_BPS_SELECTOR: &str = "0x95e3b085";
/// `slot0()`
pub const SLOT0_SELECTOR: &str = "0x3850c7bd";
/// `token0()`
pub const TOKEN0_SELECTOR: &str = "0x0dfe1681";

/// Signature of the token's oracle getter.
pub const PRICE_ORACLE_SIGNATURE: &str = "priceOracle()";
/// Signature of the fixed-price oracle's spot price getter (1e18 scaled).
pub const SPOT_PRICE_SIGNATURE: &str = "spotPriceUSDCPerVMF()";

/// The all-zero address, returned by getters that were never configured.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

const WORD_HEX_LEN: usize = 64;
const ADDRESS_HEX_LEN: usize = 40;
const SELECTOR_HEX_LEN: usize = 8;

/// One argument of an encoded call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallArg {
    /// A `0x`-prefixed (or bare) 20-byte hex address.
    Address(String),
    /// Any unsigned integer up to 256 bits (`uint24`, `uint160`, `uint256`...).
    Uint(U256),
}

impl CallArg {
    pub fn address(value: impl Into<String>) -> Self {
        Self::Address(value.into())
    }

    pub fn uint(value: impl Into<U256>) -> Self {
        Self::Uint(value.into())
    }
}

impl From<U256> for CallArg {
    fn from(value: U256) -> Self {
        Self::Uint(value)
    }
}

impl From<u64> for CallArg {
    fn from(value: u64) -> Self {
        Self::Uint(U256::from(value))
    }
}

/// A fully encoded read-only contract call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCall {
    /// Contract address
    pub to: String,
    /// `0x`-prefixed call data
    pub data: String,
}

impl RawCall {
    /// Encode `selector(args...)` against `to`.
    pub fn new(to: &str, selector: &str, args: &[CallArg]) -> Result<Self, ChainError> {
        let to = normalize_address(to)?;
        let data = encode_call(selector, args)?;
        Ok(Self { to, data })
    }

    /// The 4-byte selector this call starts with.
    pub fn selector(&self) -> &str {
        let end = (2 + SELECTOR_HEX_LEN).min(self.data.len());
        &self.data[..end]
    }
}

/// Build raw call data: selector followed by one left-padded word per argument.
///
/// Deterministic and pure; fails only when an address (or the selector) has
/// the wrong length or is not hex.
pub fn encode_call(selector: &str, args: &[CallArg]) -> Result<String, ChainError> {
    let selector_hex = normalize_selector(selector)?;

    let mut data = String::with_capacity(2 + SELECTOR_HEX_LEN + args.len() * WORD_HEX_LEN);
    data.push_str("0x");
    data.push_str(&selector_hex);

    for arg in args {
        data.push_str(&encode_word(arg)?);
    }

    Ok(data)
}

fn encode_word(arg: &CallArg) -> Result<String, ChainError> {
    match arg {
        CallArg::Address(address) => {
            let normalized = normalize_address(address)?;
            Ok(format!(
                "{:0>width$}",
                &normalized[2..],
                width = WORD_HEX_LEN
            ))
        }
        CallArg::Uint(value) => Ok(hex::encode(value.to_be_bytes::<32>())),
    }
}

/// Lower-case an address and make sure it is 20 bytes of hex.
pub fn normalize_address(address: &str) -> Result<String, ChainError> {
    let body = strip_hex_prefix(address.trim());
    if body.len() != ADDRESS_HEX_LEN || !is_hex(body) {
        return Err(ChainError::MalformedAddress(address.to_string()));
    }
    Ok(format!("0x{}", body.to_ascii_lowercase()))
}

fn normalize_selector(selector: &str) -> Result<String, ChainError> {
    let body = strip_hex_prefix(selector.trim());
    if body.len() != SELECTOR_HEX_LEN || !is_hex(body) {
        return Err(ChainError::MalformedSelector(selector.to_string()));
    }
    Ok(body.to_ascii_lowercase())
}

/// Interpret a call result as an unsigned integer.
///
/// Only the first word is read, so multi-value returns (like the quoter's
/// `(amountOut, ...)`) decode to their leading value.
pub fn decode_uint(result: &str) -> Result<U256, ChainError> {
    let body = result_body(result)?;
    let word = &body[..body.len().min(WORD_HEX_LEN)];
    U256::from_str_radix(word, 16)
        .map_err(|e| ChainError::Decode(format!("invalid integer '{}': {}", word, e)))
}

/// Split a call result into 32-byte words.
pub fn decode_words(result: &str) -> Result<Vec<U256>, ChainError> {
    let body = result_body(result)?;

    if body.len() < WORD_HEX_LEN {
        return Ok(vec![decode_uint(result)?]);
    }
    if body.len() % WORD_HEX_LEN != 0 {
        return Err(ChainError::Decode(format!(
            "result length {} is not a whole number of words",
            body.len()
        )));
    }

    body.as_bytes()
        .chunks(WORD_HEX_LEN)
        .map(|chunk| {
            let word = std::str::from_utf8(chunk)
                .map_err(|e| ChainError::Decode(e.to_string()))?;
            U256::from_str_radix(word, 16)
                .map_err(|e| ChainError::Decode(format!("invalid word '{}': {}", word, e)))
        })
        .collect()
}

/// Interpret a call result as an address (low 20 bytes of the first word).
pub fn decode_address(result: &str) -> Result<String, ChainError> {
    let value = decode_uint(result)?;
    let bytes = value.to_be_bytes::<32>();
    Ok(format!("0x{}", hex::encode(&bytes[12..])))
}

/// True when `address` is the all-zero address.
pub fn is_zero_address(address: &str) -> bool {
    normalize_address(address)
        .map(|a| a == ZERO_ADDRESS)
        .unwrap_or(false)
}

fn result_body(result: &str) -> Result<&str, ChainError> {
    let body = strip_hex_prefix(result.trim());
    if body.is_empty() {
        return Err(ChainError::Decode(
            "empty call result (reverted or no contract code)".to_string(),
        ));
    }
    if !is_hex(body) {
        return Err(ChainError::Decode(format!("non-hex call result: {}", result)));
    }
    Ok(body)
}

/// First four bytes of `keccak256(signature)`, `0x`-prefixed.
pub fn selector(signature: &str) -> String {
    let hash = keccak256(signature.as_bytes());
    format!("0x{}", hex::encode(&hash[..4]))
}

/// Lossy conversion used for human-facing amounts and prices.
pub fn u256_to_f64(value: U256) -> f64 {
    value.to_string().parse::<f64>().unwrap_or(f64::INFINITY)
}

/// Scale a raw integer amount down by `10^decimals`.
pub fn format_units(raw: U256, decimals: u8) -> f64 {
    u256_to_f64(raw) / 10f64.powi(i32::from(decimals))
}

/// Shorten an address for display: `0x1234...abcd`.
pub fn format_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

fn strip_hex_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

fn is_hex(value: &str) -> bool {
    value.chars().all(|c| c.is_ascii_hexdigit())
}
