//! Fixed-point decimal boundary.
//!
//! Every integer that comes off the chain is scaled by the token's declared
//! decimals (18 unless fetched otherwise). Conversion to the display domain
//! goes through a full decimal string and `f64::from_str`, which rounds to
//! nearest with ties to even, so repeated refreshes of the same raw value
//! always display identically.

use alloy_primitives::U256;
use eyre::{eyre, Result};

/// Convert a raw fixed-point integer to a display value.
pub fn to_display(value: U256, decimals: u8) -> f64 {
    if value.is_zero() {
        return 0.0;
    }
    let digits = value.to_string();
    let decimals = decimals as usize;

    let text = if digits.len() > decimals {
        let (whole, frac) = digits.split_at(digits.len() - decimals);
        format!("{}.{}", whole, frac)
    } else {
        format!("0.{}{}", "0".repeat(decimals - digits.len()), digits)
    };

    text.parse::<f64>().unwrap_or(0.0)
}

/// Parse a human-entered decimal amount into raw fixed-point units.
///
/// Excess fractional digits beyond `decimals` are truncated, matching how
/// wallets treat sub-wei input.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    if amount.is_empty() || amount == "." {
        return Err(eyre!("empty amount"));
    }

    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(eyre!("invalid decimal amount: {}", amount));
    }

    let decimals = decimals as usize;
    let mut padded = frac.to_string();
    padded.truncate(decimals);
    while padded.len() < decimals {
        padded.push('0');
    }

    let raw = format!("{}{}", whole, padded);
    let raw = raw.trim_start_matches('0');
    if raw.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(raw, 10).map_err(|e| eyre!("amount out of range: {}", e))
}

/// Format an f64 amount into raw units via its full decimal expansion.
pub fn parse_display(amount: f64, decimals: u8) -> Result<U256> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(eyre!("invalid amount: {}", amount));
    }
    parse_units(&format!("{:.*}", decimals as usize, amount), decimals)
}
