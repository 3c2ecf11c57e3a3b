//! Configuration for the staking console.
//!
//! Everything is loadable from environment variables (with `.env` support)
//! or a TOML file, with working defaults for the public BNB chain endpoints.

use alloy_primitives::Address;
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Staking contract address (KIND/HUG LP staking).
const DEFAULT_STAKING_CONTRACT: &str = "0x5A3bF4a2Cab1e8bD6F2eA5A0c9E1f7C4D0b2a913";

/// Public BSC RPC endpoint.
const DEFAULT_RPC_URL: &str = "https://bsc-dataseed.bnbchain.org";

/// Reference-asset (BNB) USD price feed.
const DEFAULT_PRICE_FEED_URL: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=binancecoin&vs_currencies=usd";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // ========== Network Settings ==========
    /// JSON-RPC URL used for all reads and transaction submission
    pub rpc_url: String,

    /// Chain ID (56 = BNB chain mainnet)
    pub chain_id: u64,

    /// Staking contract address
    pub staking_contract: String,

    // ========== Refresh Settings ==========
    /// Fixed polling interval between refresh cycles (seconds)
    pub poll_interval_secs: u64,

    /// Cooldown after a refresh batch before the dedup flag clears (seconds)
    pub refresh_cooldown_secs: u64,

    // ========== Price Feed ==========
    /// HTTP endpoint returning the reference asset's USD price
    pub price_feed_url: String,

    /// Coin id key inside the feed response
    pub price_coin_id: String,

    /// How long a fetched reference price stays fresh (seconds)
    pub price_cache_secs: u64,

    // ========== Transaction Settings ==========
    /// Maximum slippage tolerance for swaps (0.01 = 1%)
    pub max_slippage: f64,

    /// Gas limit applied to write transactions
    pub tx_gas_limit: u64,

    /// Seconds until a router deadline expires
    pub tx_deadline_secs: u64,

    // ========== Watch Settings ==========
    /// Address whose positions are monitored when no wallet key is set
    pub watch_address: Option<String>,

    /// Referrer address credited on stakes (validated, zero if malformed)
    pub referrer: Option<String>,
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            rpc_url: env::var("RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string()),
            chain_id: env::var("CHAIN_ID")
                .unwrap_or_else(|_| "56".to_string())
                .parse()
                .unwrap_or(56),
            staking_contract: env::var("STAKING_CONTRACT")
                .unwrap_or_else(|_| DEFAULT_STAKING_CONTRACT.to_string()),

            poll_interval_secs: env::var("POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            refresh_cooldown_secs: env::var("REFRESH_COOLDOWN_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),

            price_feed_url: env::var("PRICE_FEED_URL")
                .unwrap_or_else(|_| DEFAULT_PRICE_FEED_URL.to_string()),
            price_coin_id: env::var("PRICE_COIN_ID")
                .unwrap_or_else(|_| "binancecoin".to_string()),
            price_cache_secs: env::var("PRICE_CACHE_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),

            max_slippage: env::var("MAX_SLIPPAGE")
                .unwrap_or_else(|_| "0.005".to_string())
                .parse()
                .unwrap_or(0.005),
            tx_gas_limit: env::var("TX_GAS_LIMIT")
                .unwrap_or_else(|_| "600000".to_string())
                .parse()
                .unwrap_or(600_000),
            tx_deadline_secs: env::var("TX_DEADLINE_SECS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .unwrap_or(600),

            watch_address: env::var("WATCH_ADDRESS").ok(),
            referrer: env::var("REFERRER").ok(),
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Parsed staking contract address
    pub fn staking_address(&self) -> Result<Address> {
        Address::from_str(&self.staking_contract)
            .map_err(|e| eyre::eyre!("invalid STAKING_CONTRACT: {}", e))
    }

    /// Validate configuration before running
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() || self.rpc_url.contains("YOUR_API_KEY") {
            return Err(eyre::eyre!("Invalid RPC_URL - please set a valid endpoint"));
        }
        self.staking_address()?;

        if self.poll_interval_secs == 0 {
            return Err(eyre::eyre!("POLL_INTERVAL_SECS must be > 0"));
        }
        if self.refresh_cooldown_secs >= self.poll_interval_secs {
            return Err(eyre::eyre!(
                "REFRESH_COOLDOWN_SECS ({}) must be shorter than POLL_INTERVAL_SECS ({})",
                self.refresh_cooldown_secs,
                self.poll_interval_secs
            ));
        }
        if !(0.0..=0.5).contains(&self.max_slippage) {
            return Err(eyre::eyre!(
                "MAX_SLIPPAGE should be between 0 and 0.5 (currently {})",
                self.max_slippage
            ));
        }
        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║              STAKEWATCH - CONFIGURATION                    ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Chain ID:          {:^40} ║", self.chain_id);
        println!("║ Poll interval:     {:>37} s  ║", self.poll_interval_secs);
        println!("║ Refresh cooldown:  {:>37} s  ║", self.refresh_cooldown_secs);
        println!("║ Max slippage:      {:>37.2}%  ║", self.max_slippage * 100.0);
        println!(
            "║ Watch address:     {:^40} ║",
            self.watch_address.as_deref().unwrap_or("(wallet)")
        );
        println!(
            "║ Referrer:          {:^40} ║",
            self.referrer.as_deref().unwrap_or("(none)")
        );
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            chain_id: 56,
            staking_contract: DEFAULT_STAKING_CONTRACT.to_string(),
            poll_interval_secs: 30,
            refresh_cooldown_secs: 5,
            price_feed_url: DEFAULT_PRICE_FEED_URL.to_string(),
            price_coin_id: "binancecoin".to_string(),
            price_cache_secs: 10,
            max_slippage: 0.005,
            tx_gas_limit: 600_000,
            tx_deadline_secs: 600,
            watch_address: None,
            referrer: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.chain_id, 56);
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.refresh_cooldown_secs, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cooldown_must_fit_inside_interval() {
        let config = Config {
            refresh_cooldown_secs: 30,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_slippage_bounds() {
        let config = Config {
            max_slippage: 0.9,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.rpc_url, config.rpc_url);
        assert_eq!(parsed.poll_interval_secs, config.poll_interval_secs);
    }

    #[test]
    fn test_save_and_reload_file() {
        let path = std::env::temp_dir().join("stakewatch-config-test.toml");
        let config = Config {
            poll_interval_secs: 45,
            ..Config::default()
        };
        config.save_to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.poll_interval_secs, 45);
        assert_eq!(loaded.staking_contract, config.staking_contract);
        fs::remove_file(&path).ok();
    }
}
