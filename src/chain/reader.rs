//! Read-only accessor over the staking contract, LP pairs, and ERC-20s.
//!
//! Reads never throw past this boundary: every public method catches the
//! transport/decode error, logs it, and degrades to a documented zero-value
//! default so a render always has a consistent, if stale, dataset.

use alloy_primitives::{Address, Bytes, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::SolCall;
use eyre::{eyre, Result};
use futures::future::join_all;
use tracing::{debug, warn};

use super::abi::{IPancakePair, IPancakeRouter, IStaking, IERC20};
use super::units::{parse_units, to_display};
use crate::model::{default_plans, Plan, PoolStats, Position};
use crate::tokens::{lp_pair_for, Token, ROUTER_ADDRESS};

/// Reserves of one LP pair in display units, with token orientation intact.
#[derive(Debug, Clone, Copy)]
pub struct PairReserves {
    pub token0: Address,
    pub token1: Address,
    pub reserve0: f64,
    pub reserve1: f64,
}

pub struct ChainReader {
    rpc_url: String,
    staking: Address,
}

impl ChainReader {
    pub fn new(rpc_url: String, staking: Address) -> Self {
        Self { rpc_url, staking }
    }

    /// Raw eth_call against a contract.
    async fn call(&self, to: Address, calldata: Vec<u8>) -> Result<Bytes> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.parse()?);
        let tx = TransactionRequest::default().to(to).input(calldata.into());
        provider
            .call(tx)
            .await
            .map_err(|e| eyre!("eth_call to {:?} failed: {}", to, e))
    }

    // ============================================
    // STAKING CONTRACT READS
    // ============================================

    async fn try_plans(&self) -> Result<Vec<Plan>> {
        let raw = self
            .call(self.staking, IStaking::getPlansCall {}.abi_encode())
            .await?;
        let decoded = IStaking::getPlansCall::abi_decode_returns(&raw)
            .map_err(|e| eyre!("getPlans decode failed: {}", e))?;

        Ok(decoded
            .iter()
            .enumerate()
            .map(|(idx, p)| Plan {
                id: idx as u64,
                min_usd: to_display(p.minUSD, 18),
                monthly_rate_bps: p.monthlyRateBps.to::<u64>(),
            })
            .collect())
    }

    /// Plans as reported by the contract; the hardcoded tier table stands in
    /// until a read succeeds with at least four entries.
    pub async fn plans_or_default(&self) -> Vec<Plan> {
        match self.try_plans().await {
            Ok(plans) if plans.len() >= 4 => plans.into_iter().take(4).collect(),
            Ok(plans) => {
                debug!("getPlans returned {} entries, using defaults", plans.len());
                default_plans()
            }
            Err(e) => {
                warn!("getPlans failed: {}; using default plan table", e);
                default_plans()
            }
        }
    }

    async fn try_pool_stats(&self, pid: u64) -> Result<PoolStats> {
        let raw = self
            .call(
                self.staking,
                IStaking::poolStatsCall { pid: U256::from(pid) }.abi_encode(),
            )
            .await?;
        let stats = IStaking::poolStatsCall::abi_decode_returns(&raw)
            .map_err(|e| eyre!("poolStats decode failed: {}", e))?;

        Ok(PoolStats {
            total_staked_lp: to_display(stats.totalStakedLP, 18),
            total_staked_usd: to_display(stats.totalStakedUSD, 18),
            total_burned_token: to_display(stats.totalBurnedToken, 18),
            total_bnb_to_dev: to_display(stats.totalBNBToDev, 18),
        })
    }

    pub async fn pool_stats(&self, pid: u64) -> PoolStats {
        match self.try_pool_stats(pid).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("poolStats({}) failed: {}; using zero stats", pid, e);
                PoolStats::default()
            }
        }
    }

    async fn try_position_ids(&self, user: Address) -> Result<Vec<u64>> {
        let raw = self
            .call(self.staking, IStaking::positionsOfCall { user }.abi_encode())
            .await?;
        let ids = IStaking::positionsOfCall::abi_decode_returns(&raw)
            .map_err(|e| eyre!("positionsOf decode failed: {}", e))?;
        Ok(ids.iter().map(|id| id.to::<u64>()).collect())
    }

    async fn try_position(&self, id: u64, plans: &[Plan]) -> Result<Position> {
        let raw = self
            .call(
                self.staking,
                IStaking::positionInfoCall { id: U256::from(id) }.abi_encode(),
            )
            .await?;
        let info = IStaking::positionInfoCall::abi_decode_returns(&raw)
            .map_err(|e| eyre!("positionInfo decode failed: {}", e))?;

        let plan_id = info.pos.planId.to::<u64>();
        let monthly_rate_bps = plans
            .iter()
            .find(|p| p.id == plan_id)
            .map(|p| p.monthly_rate_bps)
            .unwrap_or(0);

        Ok(Position {
            id,
            pid: info.pos.pid.to::<u64>(),
            lp_amount: to_display(info.pos.lpAmount, 18),
            stake_usd: to_display(info.pos.stakeUSD, 18),
            plan_id,
            monthly_rate_bps,
            start_time: info.pos.startTime.to::<u64>(),
            end_time: info.pos.endTime.to::<u64>(),
            closed: info.pos.closed,
            last_claim_time: info.pos.lastClaimTime.to::<u64>(),
            end_time_at_close: info.pos.endTimeAtClose.to::<u64>(),
            claimable_usd: to_display(info.claimableUSD, 18),
            claimable_reward: to_display(info.claimableReward, 18),
        })
    }

    /// All of a user's positions, with plan rates resolved. Positions that
    /// fail to load individually are dropped from the list, not fatal.
    pub async fn positions(&self, user: Address) -> Vec<Position> {
        let ids = match self.try_position_ids(user).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("positionsOf({:?}) failed: {}; using empty list", user, e);
                return Vec::new();
            }
        };

        let plans = self.plans_or_default().await;
        let fetched = join_all(ids.iter().map(|&id| self.try_position(id, &plans))).await;

        fetched
            .into_iter()
            .zip(ids)
            .filter_map(|(res, id)| match res {
                Ok(pos) => Some(pos),
                Err(e) => {
                    warn!("positionInfo({}) failed: {}; skipping", id, e);
                    None
                }
            })
            .collect()
    }

    /// Pool id of a single position; `None` when the read fails. Used to
    /// target the right pool when reloading after a claim or unstake.
    pub async fn position_pid(&self, id: u64) -> Option<u64> {
        match self.try_position(id, &[]).await {
            Ok(pos) => Some(pos.pid),
            Err(e) => {
                warn!("positionInfo({}) failed: {}; pool unknown", id, e);
                None
            }
        }
    }

    pub async fn referral_earnings(&self, user: Address) -> f64 {
        let result: Result<f64> = async {
            let raw = self
                .call(
                    self.staking,
                    IStaking::referralEarningsCall { user }.abi_encode(),
                )
                .await?;
            let earnings = IStaking::referralEarningsCall::abi_decode_returns(&raw)
                .map_err(|e| eyre!("referralEarnings decode failed: {}", e))?;
            Ok(to_display(earnings, 18))
        }
        .await;

        result.unwrap_or_else(|e| {
            warn!("referralEarnings failed: {}; using 0", e);
            0.0
        })
    }

    pub async fn position_counter(&self) -> u64 {
        let result: Result<u64> = async {
            let raw = self
                .call(self.staking, IStaking::positionCounterCall {}.abi_encode())
                .await?;
            let counter = IStaking::positionCounterCall::abi_decode_returns(&raw)
                .map_err(|e| eyre!("positionCounter decode failed: {}", e))?;
            Ok(counter.to::<u64>())
        }
        .await;

        result.unwrap_or_else(|e| {
            warn!("positionCounter failed: {}; using 0", e);
            0
        })
    }

    // ============================================
    // ERC-20 / LP PAIR READS
    // ============================================

    async fn try_erc20_balance(&self, token: Address, owner: Address, decimals: u8) -> Result<f64> {
        let raw = self
            .call(token, IERC20::balanceOfCall { owner }.abi_encode())
            .await?;
        let balance = IERC20::balanceOfCall::abi_decode_returns(&raw)
            .map_err(|e| eyre!("balanceOf decode failed: {}", e))?;
        Ok(to_display(balance, decimals))
    }

    /// Declared decimals of an arbitrary ERC-20; 18 when the read fails.
    pub async fn erc20_decimals(&self, token: Address) -> u8 {
        let result: Result<u8> = async {
            let raw = self
                .call(token, IERC20::decimalsCall {}.abi_encode())
                .await?;
            IERC20::decimalsCall::abi_decode_returns(&raw)
                .map_err(|e| eyre!("decimals decode failed: {}", e))
        }
        .await;

        result.unwrap_or_else(|e| {
            warn!("decimals({:?}) failed: {}; assuming 18", token, e);
            18
        })
    }

    pub async fn erc20_balance(&self, token: Address, owner: Address) -> f64 {
        let decimals = self.erc20_decimals(token).await;
        self.try_erc20_balance(token, owner, decimals)
            .await
            .unwrap_or_else(|e| {
                warn!("balanceOf({:?}) failed: {}; using 0", token, e);
                0.0
            })
    }

    /// User's LP-token balance for a pool. Unknown pid reads as zero.
    pub async fn lp_balance(&self, pid: u64, user: Address) -> f64 {
        let Some(pair) = lp_pair_for(pid) else {
            warn!("lp_balance: unknown pid {}", pid);
            return 0.0;
        };
        self.try_erc20_balance(pair, user, 18)
            .await
            .unwrap_or_else(|e| {
                warn!("LP balanceOf failed: {}; using 0", e);
                0.0
            })
    }

    async fn try_pair_reserves(&self, pair: Address) -> Result<PairReserves> {
        let raw = self
            .call(pair, IPancakePair::getReservesCall {}.abi_encode())
            .await?;
        let reserves = IPancakePair::getReservesCall::abi_decode_returns(&raw)
            .map_err(|e| eyre!("getReserves decode failed: {}", e))?;

        let raw0 = self
            .call(pair, IPancakePair::token0Call {}.abi_encode())
            .await?;
        let token0 = IPancakePair::token0Call::abi_decode_returns(&raw0)
            .map_err(|e| eyre!("token0 decode failed: {}", e))?;

        let raw1 = self
            .call(pair, IPancakePair::token1Call {}.abi_encode())
            .await?;
        let token1 = IPancakePair::token1Call::abi_decode_returns(&raw1)
            .map_err(|e| eyre!("token1 decode failed: {}", e))?;

        Ok(PairReserves {
            token0,
            token1,
            reserve0: to_display(U256::from(reserves.reserve0.to::<u128>()), 18),
            reserve1: to_display(U256::from(reserves.reserve1.to::<u128>()), 18),
        })
    }

    pub async fn pair_reserves(&self, pair: Address) -> Option<PairReserves> {
        match self.try_pair_reserves(pair).await {
            Ok(r) => Some(r),
            Err(e) => {
                warn!("pair reserves for {:?} failed: {}", pair, e);
                None
            }
        }
    }

    // ============================================
    // ROUTER QUOTE
    // ============================================

    async fn try_quote(&self, from: Token, to: Token, amount_in: &str) -> Result<f64> {
        let amount = parse_units(amount_in, from.decimals)?;
        let path = vec![from.address, to.address];
        let raw = self
            .call(
                ROUTER_ADDRESS,
                IPancakeRouter::getAmountsOutCall {
                    amountIn: amount,
                    path,
                }
                .abi_encode(),
            )
            .await?;
        let amounts = IPancakeRouter::getAmountsOutCall::abi_decode_returns(&raw)
            .map_err(|e| eyre!("getAmountsOut decode failed: {}", e))?;
        let out = amounts
            .last()
            .copied()
            .ok_or_else(|| eyre!("empty amounts from router"))?;
        Ok(to_display(out, to.decimals))
    }

    /// Router view quote: expected output for an exact input. Zero on any
    /// failure so an estimate box can always render.
    pub async fn quote(&self, from: Token, to: Token, amount_in: &str) -> f64 {
        self.try_quote(from, to, amount_in).await.unwrap_or_else(|e| {
            warn!("getAmountsOut {}->{} failed: {}; quoting 0", from.symbol, to.symbol, e);
            0.0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_reader() -> ChainReader {
        // Nothing listens here; every call fails at the transport.
        ChainReader::new("http://127.0.0.1:9".to_string(), Address::ZERO)
    }

    #[tokio::test]
    async fn test_position_pid_unknown_on_failed_read() {
        assert_eq!(offline_reader().position_pid(1).await, None);
    }

    #[tokio::test]
    async fn test_erc20_balance_degrades_to_zero() {
        // decimals() falls back to 18, balanceOf falls back to 0
        let balance = offline_reader()
            .erc20_balance(Address::ZERO, Address::ZERO)
            .await;
        assert_eq!(balance, 0.0);
    }

    #[tokio::test]
    async fn test_pool_stats_degrade_to_defaults() {
        let stats = offline_reader().pool_stats(0).await;
        assert_eq!(stats, PoolStats::default());
    }
}
