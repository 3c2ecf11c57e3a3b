//! Supported token and pool definitions.
//!
//! The staking product supports a small fixed set of assets:
//! - BNB (native coin, wrapped as WBNB inside router paths)
//! - KIND (project token, staked as KIND/WBNB LP)
//! - HUG (reward token, staked as HUG/WBNB LP)
//!
//! Anything outside this set is rejected with `UnsupportedAsset` before a
//! transaction is built.

use alloy_primitives::{address, Address};

/// A token the console knows how to trade and price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub symbol: &'static str,
    pub address: Address,
    pub decimals: u8,
    /// Native-coin input: sent as transaction value, WBNB substituted in paths.
    pub is_native: bool,
}

// ============================================
// TOKEN ADDRESSES (BNB CHAIN)
// ============================================

pub const WBNB_TOKEN: Address = address!("bb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c");
pub const KIND_TOKEN: Address = address!("41f52A42091A6B2146561bF05b722Ad1d0e46f8b");
pub const HUG_TOKEN: Address = address!("9A02eb2B692FaE1Ea01987d4851F647CD5Ba924f");

// LP pairs backing the two staking pools
pub const KIND_WBNB_PAIR: Address = address!("628C0fe6DA9854EDf0f3E2C7657af6ecf29C740E");
pub const HUG_WBNB_PAIR: Address = address!("4c22D5CF4f11bfCCbed5c3a6B119C140FC716a93");

/// PancakeSwap V2 router.
pub const ROUTER_ADDRESS: Address = address!("10ED43C718714eb63d5aA57B78B54704E256024E");

pub fn supported_tokens() -> Vec<Token> {
    vec![
        Token {
            symbol: "BNB",
            address: WBNB_TOKEN,
            decimals: 18,
            is_native: true,
        },
        Token {
            symbol: "KIND",
            address: KIND_TOKEN,
            decimals: 18,
            is_native: false,
        },
        Token {
            symbol: "HUG",
            address: HUG_TOKEN,
            decimals: 18,
            is_native: false,
        },
    ]
}

/// Case-insensitive symbol lookup.
pub fn token_by_symbol(symbol: &str) -> Option<Token> {
    supported_tokens()
        .into_iter()
        .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
}

// ============================================
// STAKING POOLS
// ============================================

/// One staking pool: an LP pair plus the non-WBNB token inside it.
#[derive(Debug, Clone, Copy)]
pub struct PoolInfo {
    pub pid: u64,
    pub label: &'static str,
    pub token_symbol: &'static str,
    pub token: Address,
    pub lp_pair: Address,
}

pub fn all_pools() -> Vec<PoolInfo> {
    vec![
        PoolInfo {
            pid: 0,
            label: "KIND / BNB Pool",
            token_symbol: "KIND",
            token: KIND_TOKEN,
            lp_pair: KIND_WBNB_PAIR,
        },
        PoolInfo {
            pid: 1,
            label: "HUG / BNB Pool",
            token_symbol: "HUG",
            token: HUG_TOKEN,
            lp_pair: HUG_WBNB_PAIR,
        },
    ]
}

pub fn pool_by_pid(pid: u64) -> Option<PoolInfo> {
    all_pools().into_iter().find(|p| p.pid == pid)
}

/// LP pair for a pool id, if the pool exists.
pub fn lp_pair_for(pid: u64) -> Option<Address> {
    pool_by_pid(pid).map(|p| p.lp_pair)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_lookup_is_case_insensitive() {
        assert_eq!(token_by_symbol("kind").unwrap().address, KIND_TOKEN);
        assert_eq!(token_by_symbol("HUG").unwrap().address, HUG_TOKEN);
        assert!(token_by_symbol("DOGE").is_none());
    }

    #[test]
    fn test_native_token_routes_through_wbnb() {
        let bnb = token_by_symbol("BNB").unwrap();
        assert!(bnb.is_native);
        assert_eq!(bnb.address, WBNB_TOKEN);
    }

    #[test]
    fn test_pool_lookup() {
        assert_eq!(lp_pair_for(0), Some(KIND_WBNB_PAIR));
        assert_eq!(lp_pair_for(1), Some(HUG_WBNB_PAIR));
        assert_eq!(lp_pair_for(7), None);
    }
}
