//! Referrer address validation.
//!
//! A referrer is accepted only when it is a `0x`-prefixed, 40-hex-character
//! address and not the zero address; anything else resolves to the zero
//! address (the contract treats zero as "no referrer").

use alloy_primitives::Address;
use std::str::FromStr;
use tracing::debug;

pub fn parse_referrer(raw: Option<&str>) -> Address {
    let Some(raw) = raw else {
        return Address::ZERO;
    };
    let raw = raw.trim();

    let hex_part = match raw.strip_prefix("0x") {
        Some(h) => h,
        None => return Address::ZERO,
    };
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        debug!("malformed referrer {:?}; using zero address", raw);
        return Address::ZERO;
    }

    match Address::from_str(raw) {
        Ok(addr) if addr != Address::ZERO => addr,
        _ => Address::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_referrer_passes_through() {
        let addr = "0x41f52A42091A6B2146561bF05b722Ad1d0e46f8b";
        assert_eq!(
            parse_referrer(Some(addr)),
            Address::from_str(addr).unwrap()
        );
    }

    #[test]
    fn test_zero_address_rejected() {
        assert_eq!(
            parse_referrer(Some("0x0000000000000000000000000000000000000000")),
            Address::ZERO
        );
    }

    #[test]
    fn test_garbage_rejected() {
        assert_eq!(parse_referrer(Some("not-an-address")), Address::ZERO);
        assert_eq!(parse_referrer(Some("0x1234")), Address::ZERO);
        assert_eq!(
            // 40 chars but not hex
            parse_referrer(Some("0xZZf52A42091A6B2146561bF05b722Ad1d0e46f8b")),
            Address::ZERO
        );
        assert_eq!(parse_referrer(None), Address::ZERO);
    }
}
