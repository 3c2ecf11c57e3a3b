//! Token USD pricing.
//!
//! The reference asset's (BNB) USD price comes from an external HTTP feed and
//! is treated as a black box that may be stale or down; on failure the price
//! reads as 0 and every downstream USD figure collapses to 0 rather than
//! erroring. Token prices are then derived from an on-chain pair's reserve
//! ratio against that reference price.

use alloy_primitives::Address;
use eyre::{eyre, Result};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{trace, warn};

use crate::chain::PairReserves;
use crate::config::Config;

/// Timeout for price feed calls
const FEED_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Copy)]
struct CachedPrice {
    usd: f64,
    fetched_at: Instant,
}

pub struct PriceOracle {
    http_client: Client,
    feed_url: String,
    coin_id: String,
    cache_duration: Duration,
    cache: Arc<RwLock<Option<CachedPrice>>>,
}

impl PriceOracle {
    pub fn new(config: &Config) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(FEED_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            http_client,
            feed_url: config.price_feed_url.clone(),
            coin_id: config.price_coin_id.clone(),
            cache_duration: Duration::from_secs(config.price_cache_secs),
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Reference asset USD price, cached. Zero when the feed is unreachable
    /// or returns an unexpected shape.
    pub async fn reference_price_usd(&self) -> f64 {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = *cache {
                if cached.fetched_at.elapsed() < self.cache_duration {
                    trace!("using cached reference price: {}", cached.usd);
                    return cached.usd;
                }
            }
        }

        match self.fetch_reference_price().await {
            Ok(usd) => {
                let mut cache = self.cache.write().await;
                *cache = Some(CachedPrice {
                    usd,
                    fetched_at: Instant::now(),
                });
                usd
            }
            Err(e) => {
                warn!("reference price fetch failed: {}; using 0", e);
                0.0
            }
        }
    }

    /// Feed shape: `{"<coin_id>": {"usd": <price>}}`.
    async fn fetch_reference_price(&self) -> Result<f64> {
        let response: HashMap<String, HashMap<String, f64>> = self
            .http_client
            .get(&self.feed_url)
            .send()
            .await?
            .json()
            .await?;

        let usd = response
            .get(&self.coin_id)
            .and_then(|entry| entry.get("usd"))
            .copied()
            .ok_or_else(|| eyre!("no usd price for {} in feed response", self.coin_id))?;

        if !usd.is_finite() || usd < 0.0 {
            return Err(eyre!("feed returned invalid price: {}", usd));
        }
        Ok(usd)
    }

    /// USD price of `target` from a pair's reserves plus the reference price.
    pub async fn token_price_usd(&self, target: Address, reserves: Option<PairReserves>) -> f64 {
        let Some(reserves) = reserves else {
            return 0.0;
        };
        let reference = self.reference_price_usd().await;
        price_from_reserves(target, &reserves, reference)
    }
}

/// Derive a token's USD price from pair reserves.
///
/// Orientation is by address match with no assumption about token0/token1
/// ordering. Non-positive reserves or a non-finite ratio yield exactly 0;
/// NaN and infinity never escape into downstream state.
pub fn price_from_reserves(
    target: Address,
    reserves: &PairReserves,
    reference_price_usd: f64,
) -> f64 {
    let (target_reserve, reference_reserve) = if reserves.token0 == target {
        (reserves.reserve0, reserves.reserve1)
    } else if reserves.token1 == target {
        (reserves.reserve1, reserves.reserve0)
    } else {
        warn!("target {:?} is not part of the pair", target);
        return 0.0;
    };

    if target_reserve <= 0.0 || reference_reserve <= 0.0 {
        return 0.0;
    }

    let price = (reference_reserve / target_reserve) * reference_price_usd;
    if price.is_finite() {
        price
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::{KIND_TOKEN, WBNB_TOKEN};

    fn pair(token0: Address, token1: Address, r0: f64, r1: f64) -> PairReserves {
        PairReserves {
            token0,
            token1,
            reserve0: r0,
            reserve1: r1,
        }
    }

    #[test]
    fn test_price_orientation_invariant() {
        // 1000 KIND vs 10 WBNB at $600/BNB => $6 per KIND
        let forward = pair(KIND_TOKEN, WBNB_TOKEN, 1000.0, 10.0);
        let flipped = pair(WBNB_TOKEN, KIND_TOKEN, 10.0, 1000.0);

        let a = price_from_reserves(KIND_TOKEN, &forward, 600.0);
        let b = price_from_reserves(KIND_TOKEN, &flipped, 600.0);
        assert_eq!(a, b);
        assert!((a - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_reserve_yields_zero() {
        let empty = pair(KIND_TOKEN, WBNB_TOKEN, 0.0, 10.0);
        let price = price_from_reserves(KIND_TOKEN, &empty, 600.0);
        assert_eq!(price, 0.0);
        assert!(!price.is_nan());

        let empty_other = pair(KIND_TOKEN, WBNB_TOKEN, 1000.0, 0.0);
        assert_eq!(price_from_reserves(KIND_TOKEN, &empty_other, 600.0), 0.0);
    }

    #[test]
    fn test_foreign_token_yields_zero() {
        let p = pair(KIND_TOKEN, WBNB_TOKEN, 1000.0, 10.0);
        assert_eq!(price_from_reserves(Address::ZERO, &p, 600.0), 0.0);
    }

    #[test]
    fn test_stale_feed_collapses_to_zero() {
        let p = pair(KIND_TOKEN, WBNB_TOKEN, 1000.0, 10.0);
        assert_eq!(price_from_reserves(KIND_TOKEN, &p, 0.0), 0.0);
    }
}
