//! Write path: approve-then-act transaction sequences.
//!
//! Every state-changing action is at most two phases: an optional ERC-20
//! approval awaited to inclusion, then the primary action. An approval
//! failure aborts the sequence before the action is ever sent; an action
//! failure leaves the approval in place (allowances are reusable on-chain
//! state, so nothing needs rolling back). Failed writes surface to the
//! caller and are never retried automatically.

mod wallet;

pub use wallet::WalletSession;

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_sol_types::SolCall;
use chrono::Utc;
use std::future::Future;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::chain::abi::{IPancakeRouter, IStaking, IERC20};
use crate::chain::units::{parse_display, parse_units};
use crate::chain::ChainReader;
use crate::config::Config;
use crate::error::ClientError;
use crate::referral::parse_referrer;
use crate::tokens::{all_pools, pool_by_pid, token_by_symbol, Token, ROUTER_ADDRESS};

/// Await the approval phase (when present) to inclusion, then the action.
///
/// The action future is constructed lazily by the caller and is never polled
/// if the approval fails, so an aborted sequence has no partial side effects
/// beyond the approval itself.
pub async fn approve_then_act<FA, FB>(
    approval: Option<FA>,
    action: FB,
) -> Result<B256, ClientError>
where
    FA: Future<Output = Result<B256, ClientError>>,
    FB: Future<Output = Result<B256, ClientError>>,
{
    if let Some(approve) = approval {
        let hash = approve.await?;
        info!("approval confirmed: {:?}", hash);
    }
    action.await
}

pub struct TransactionSubmitter {
    config: Config,
    staking: Address,
    reader: ChainReader,
    wallet: Option<Mutex<WalletSession>>,
}

impl TransactionSubmitter {
    pub fn new(config: Config, staking: Address, wallet: Option<WalletSession>) -> Self {
        let reader = ChainReader::new(config.rpc_url.clone(), staking);
        Self {
            config,
            staking,
            reader,
            wallet: wallet.map(Mutex::new),
        }
    }

    fn ensure_wallet(&self) -> Result<(), ClientError> {
        if self.wallet.is_none() {
            return Err(ClientError::WalletNotConnected);
        }
        Ok(())
    }

    /// Connected wallet address, if a session exists.
    pub async fn wallet_address(&self) -> Option<Address> {
        match &self.wallet {
            Some(wallet) => Some(wallet.lock().await.address()),
            None => None,
        }
    }

    /// Resync the wallet nonce before a write sequence.
    async fn sync_nonce(&self) -> Result<(), ClientError> {
        let wallet = self.wallet.as_ref().ok_or(ClientError::WalletNotConnected)?;
        wallet
            .lock()
            .await
            .update_nonce(&self.config.rpc_url)
            .await
            .map_err(ClientError::write)
    }

    /// Sign, submit, and await inclusion of one transaction. Waits as long
    /// as the network takes; there is no client-side confirmation timeout.
    async fn send_and_confirm(
        &self,
        to: Address,
        calldata: Vec<u8>,
        value: U256,
    ) -> Result<B256, ClientError> {
        let wallet = self.wallet.as_ref().ok_or(ClientError::WalletNotConnected)?;

        let provider = ProviderBuilder::new()
            .connect_http(self.config.rpc_url.parse().map_err(ClientError::write)?);
        let gas_price = provider.get_gas_price().await.map_err(ClientError::write)?;

        let raw = wallet
            .lock()
            .await
            .sign_legacy(
                to,
                Bytes::from(calldata),
                value,
                self.config.tx_gas_limit,
                gas_price,
            )
            .await
            .map_err(ClientError::write)?;

        let pending = provider
            .send_raw_transaction(&raw)
            .await
            .map_err(ClientError::write)?;
        let receipt = pending.get_receipt().await.map_err(ClientError::write)?;

        if !receipt.status() {
            return Err(ClientError::WriteFailure(format!(
                "transaction {:?} reverted",
                receipt.transaction_hash
            )));
        }
        Ok(receipt.transaction_hash)
    }

    fn deadline(&self) -> U256 {
        U256::from(Utc::now().timestamp() as u64 + self.config.tx_deadline_secs)
    }

    // ============================================
    // STAKING WRITES
    // ============================================

    /// Approve the LP token to the staking contract, then stake.
    pub async fn stake_lp(
        &self,
        pid: u64,
        amount_lp: &str,
        plan_id: u64,
        referrer: Option<&str>,
    ) -> Result<B256, ClientError> {
        let pool = pool_by_pid(pid)
            .ok_or_else(|| ClientError::UnsupportedAsset(format!("pool {}", pid)))?;
        self.ensure_wallet()?;
        self.sync_nonce().await?;

        let amount = parse_units(amount_lp, 18).map_err(ClientError::write)?;
        let referrer = parse_referrer(referrer);

        let approve = IERC20::approveCall {
            spender: self.staking,
            amount,
        }
        .abi_encode();
        let stake = IStaking::stakeCall {
            pid: U256::from(pid),
            amount,
            planId: U256::from(plan_id),
            referrer,
        }
        .abi_encode();

        let hash = approve_then_act(
            Some(self.send_and_confirm(pool.lp_pair, approve, U256::ZERO)),
            self.send_and_confirm(self.staking, stake, U256::ZERO),
        )
        .await?;
        info!("staked {} LP into pool {}: {:?}", amount_lp, pid, hash);
        Ok(hash)
    }

    pub async fn claim(&self, position_id: u64) -> Result<B256, ClientError> {
        self.ensure_wallet()?;
        self.sync_nonce().await?;

        let calldata = IStaking::claimCall {
            positionId: U256::from(position_id),
        }
        .abi_encode();
        let hash = self
            .send_and_confirm(self.staking, calldata, U256::ZERO)
            .await?;
        info!("claimed position {}: {:?}", position_id, hash);
        Ok(hash)
    }

    pub async fn unstake(&self, position_id: u64) -> Result<B256, ClientError> {
        self.ensure_wallet()?;
        self.sync_nonce().await?;

        let calldata = IStaking::unstakeCall {
            positionId: U256::from(position_id),
        }
        .abi_encode();
        let hash = self
            .send_and_confirm(self.staking, calldata, U256::ZERO)
            .await?;
        info!("unstaked position {}: {:?}", position_id, hash);
        Ok(hash)
    }

    // ============================================
    // SWAP & LIQUIDITY
    // ============================================

    fn resolve_pair(&self, from: &str, to: &str) -> Result<(Token, Token), ClientError> {
        let from = token_by_symbol(from)
            .ok_or_else(|| ClientError::UnsupportedAsset(from.to_string()))?;
        let to =
            token_by_symbol(to).ok_or_else(|| ClientError::UnsupportedAsset(to.to_string()))?;
        if from == to {
            return Err(ClientError::UnsupportedAsset(format!(
                "{} -> {}",
                from.symbol, to.symbol
            )));
        }
        Ok((from, to))
    }

    /// Slippage-bounded minimum output from the live quote. A failed quote
    /// degrades to zero minimum rather than blocking the swap.
    async fn min_out(&self, from: Token, to: Token, amount_in: &str) -> U256 {
        let quote = self.reader.quote(from, to, amount_in).await;
        if quote <= 0.0 {
            warn!("quote unavailable; submitting swap without a minimum");
            return U256::ZERO;
        }
        let min = quote * (1.0 - self.config.max_slippage);
        parse_display(min, to.decimals).unwrap_or(U256::ZERO)
    }

    /// Swap an exact input between two supported tokens. Native-coin input
    /// goes through the payable router entrypoint and needs no approval.
    pub async fn swap(&self, from: &str, to: &str, amount_in: &str) -> Result<B256, ClientError> {
        let (from, to) = self.resolve_pair(from, to)?;
        self.ensure_wallet()?;
        self.sync_nonce().await?;

        let owner = self
            .wallet_address()
            .await
            .ok_or(ClientError::WalletNotConnected)?;
        let amount = parse_units(amount_in, from.decimals).map_err(ClientError::write)?;
        let min_out = self.min_out(from, to, amount_in).await;
        let path = vec![from.address, to.address];
        let deadline = self.deadline();

        let hash = if from.is_native {
            let calldata = IPancakeRouter::swapExactETHForTokensCall {
                amountOutMin: min_out,
                path,
                to: owner,
                deadline,
            }
            .abi_encode();
            approve_then_act(
                None::<std::future::Ready<Result<B256, ClientError>>>,
                self.send_and_confirm(ROUTER_ADDRESS, calldata, amount),
            )
            .await?
        } else {
            let approve = IERC20::approveCall {
                spender: ROUTER_ADDRESS,
                amount,
            }
            .abi_encode();
            let calldata = IPancakeRouter::swapExactTokensForTokensCall {
                amountIn: amount,
                amountOutMin: min_out,
                path,
                to: owner,
                deadline,
            }
            .abi_encode();
            approve_then_act(
                Some(self.send_and_confirm(from.address, approve, U256::ZERO)),
                self.send_and_confirm(ROUTER_ADDRESS, calldata, U256::ZERO),
            )
            .await?
        };

        info!("swapped {} {} -> {}: {:?}", amount_in, from.symbol, to.symbol, hash);
        Ok(hash)
    }

    /// Add liquidity for KIND or HUG, deriving the BNB side from the current
    /// pool ratio so the deposit matches the pair exactly.
    pub async fn add_liquidity(
        &self,
        token_symbol: &str,
        token_amount: &str,
    ) -> Result<B256, ClientError> {
        let token = token_by_symbol(token_symbol)
            .ok_or_else(|| ClientError::UnsupportedAsset(token_symbol.to_string()))?;
        let pool = all_pools()
            .into_iter()
            .find(|p| p.token == token.address)
            .ok_or_else(|| {
                ClientError::UnsupportedAsset(format!("{} has no staking pool", token.symbol))
            })?;
        self.ensure_wallet()?;
        self.sync_nonce().await?;

        let owner = self
            .wallet_address()
            .await
            .ok_or(ClientError::WalletNotConnected)?;
        let amount = parse_units(token_amount, token.decimals).map_err(ClientError::write)?;
        let amount_display: f64 = token_amount
            .parse()
            .map_err(|_| ClientError::WriteFailure(format!("invalid amount {}", token_amount)))?;

        // Pool-ratio derivation needs live reserves; no sane default exists.
        let reserves = self
            .reader
            .pair_reserves(pool.lp_pair)
            .await
            .ok_or_else(|| ClientError::ReadFailure("pair reserves unavailable".into()))?;
        let (token_reserve, bnb_reserve) = if reserves.token0 == token.address {
            (reserves.reserve0, reserves.reserve1)
        } else {
            (reserves.reserve1, reserves.reserve0)
        };
        if token_reserve <= 0.0 || bnb_reserve <= 0.0 {
            return Err(ClientError::ReadFailure("pair has empty reserves".into()));
        }

        let bnb_optimal = amount_display * bnb_reserve / token_reserve;
        let bnb_units = parse_display(bnb_optimal, 18).map_err(ClientError::write)?;

        let approve = IERC20::approveCall {
            spender: ROUTER_ADDRESS,
            amount,
        }
        .abi_encode();
        let calldata = IPancakeRouter::addLiquidityETHCall {
            token: token.address,
            amountTokenDesired: amount,
            amountTokenMin: amount,
            amountETHMin: bnb_units,
            to: owner,
            deadline: self.deadline(),
        }
        .abi_encode();

        let hash = approve_then_act(
            Some(self.send_and_confirm(token.address, approve, U256::ZERO)),
            self.send_and_confirm(ROUTER_ADDRESS, calldata, bnb_units),
        )
        .await?;
        info!(
            "added liquidity: {} {} + {:.6} BNB: {:?}",
            token_amount, token.symbol, bnb_optimal, hash
        );
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_approval_failure_skips_action() {
        let action_calls = Arc::new(AtomicUsize::new(0));
        let calls = Arc::clone(&action_calls);

        let approval = async { Err::<B256, _>(ClientError::WriteFailure("rejected".into())) };
        let action = async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(B256::ZERO)
        };

        let result = approve_then_act(Some(approval), action).await;
        assert!(matches!(result, Err(ClientError::WriteFailure(_))));
        assert_eq!(action_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_action_runs_after_approval() {
        let approval = async { Ok(B256::ZERO) };
        let action = async { Ok(B256::with_last_byte(7)) };

        let hash = approve_then_act(Some(approval), action).await.unwrap();
        assert_eq!(hash, B256::with_last_byte(7));
    }

    #[tokio::test]
    async fn test_no_approval_phase() {
        let action = async { Ok(B256::with_last_byte(9)) };
        let hash = approve_then_act(
            None::<std::future::Ready<Result<B256, ClientError>>>,
            action,
        )
        .await
        .unwrap();
        assert_eq!(hash, B256::with_last_byte(9));
    }

    fn offline_submitter() -> TransactionSubmitter {
        TransactionSubmitter::new(Config::default(), Address::ZERO, None)
    }

    #[tokio::test]
    async fn test_writes_require_wallet() {
        let submitter = offline_submitter();
        assert!(matches!(
            submitter.stake_lp(0, "1.0", 0, None).await,
            Err(ClientError::WalletNotConnected)
        ));
        assert!(matches!(
            submitter.claim(1).await,
            Err(ClientError::WalletNotConnected)
        ));
        assert!(matches!(
            submitter.unstake(1).await,
            Err(ClientError::WalletNotConnected)
        ));
    }

    #[tokio::test]
    async fn test_unsupported_assets_rejected_before_wallet_check() {
        let submitter = offline_submitter();
        assert!(matches!(
            submitter.swap("DOGE", "KIND", "1").await,
            Err(ClientError::UnsupportedAsset(_))
        ));
        assert!(matches!(
            submitter.swap("KIND", "KIND", "1").await,
            Err(ClientError::UnsupportedAsset(_))
        ));
        assert!(matches!(
            submitter.add_liquidity("BNB", "1").await,
            Err(ClientError::UnsupportedAsset(_))
        ));
        assert!(matches!(
            submitter.stake_lp(9, "1.0", 0, None).await,
            Err(ClientError::UnsupportedAsset(_))
        ));
    }
}
