//! Wallet session for transaction signing.
//!
//! Never log or expose private keys. The key comes from the environment; the
//! console runs read-only without one.

use alloy_consensus::{SignableTransaction, TxLegacy};
use alloy_primitives::{Address, Bytes, U256};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use eyre::{eyre, Result};
use std::str::FromStr;
use tracing::{debug, info};

/// A connected wallet: a local signer plus chain id and nonce tracking.
pub struct WalletSession {
    signer: PrivateKeySigner,
    chain_id: u64,
    current_nonce: u64,
}

impl WalletSession {
    /// Load from the WALLET_PRIVATE_KEY environment variable, if set.
    pub fn from_env(chain_id: u64) -> Option<Self> {
        let key = std::env::var("WALLET_PRIVATE_KEY").ok()?;
        match Self::new(&key, chain_id) {
            Ok(session) => {
                info!("wallet session loaded: {:?}", session.address());
                Some(session)
            }
            Err(e) => {
                tracing::warn!("failed to parse WALLET_PRIVATE_KEY: {}", e);
                None
            }
        }
    }

    pub fn new(private_key: &str, chain_id: u64) -> Result<Self> {
        let key = private_key.trim().trim_start_matches("0x");
        let signer = PrivateKeySigner::from_str(key)
            .map_err(|e| eyre!("invalid private key: {}", e))?;
        Ok(Self {
            signer,
            chain_id,
            current_nonce: 0,
        })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Sync the nonce with the network before a write sequence.
    pub async fn update_nonce(&mut self, rpc_url: &str) -> Result<()> {
        use alloy_provider::{Provider, ProviderBuilder};

        let provider = ProviderBuilder::new().connect_http(rpc_url.parse()?);
        self.current_nonce = provider.get_transaction_count(self.address()).await?;
        debug!("nonce synced to {}", self.current_nonce);
        Ok(())
    }

    fn next_nonce(&mut self) -> u64 {
        let nonce = self.current_nonce;
        self.current_nonce += 1;
        nonce
    }

    /// Sign a legacy transaction (the norm on the BNB chain) and return the
    /// raw RLP bytes ready for eth_sendRawTransaction.
    pub async fn sign_legacy(
        &mut self,
        to: Address,
        calldata: Bytes,
        value: U256,
        gas_limit: u64,
        gas_price: u128,
    ) -> Result<Bytes> {
        let nonce = self.next_nonce();

        let tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce,
            gas_price,
            gas_limit,
            to: alloy_primitives::TxKind::Call(to),
            value,
            input: calldata,
        };

        let sig_hash = tx.signature_hash();
        let signature = self
            .signer
            .sign_hash(&sig_hash)
            .await
            .map_err(|e| eyre!("failed to sign transaction: {}", e))?;

        let envelope = alloy_consensus::TxEnvelope::Legacy(tx.into_signed(signature));

        let mut encoded = Vec::new();
        alloy_rlp::Encodable::encode(&envelope, &mut encoded);

        debug!(
            "signed legacy transaction: to={:?}, nonce={}, gas_limit={}",
            to, nonce, gas_limit
        );

        Ok(Bytes::from(encoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known test key (hardhat account 0); never funded on mainnet.
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_session_from_key() {
        let session = WalletSession::new(TEST_KEY, 56).unwrap();
        assert_eq!(
            format!("{:?}", session.address()).to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_bad_key_rejected() {
        assert!(WalletSession::new("0xnothex", 56).is_err());
    }

    #[tokio::test]
    async fn test_sign_legacy_produces_rlp() {
        let mut session = WalletSession::new(TEST_KEY, 56).unwrap();
        let raw = session
            .sign_legacy(
                Address::ZERO,
                Bytes::new(),
                U256::ZERO,
                21_000,
                5_000_000_000,
            )
            .await
            .unwrap();
        assert!(!raw.is_empty());
        // Nonce advances per signature.
        let raw2 = session
            .sign_legacy(
                Address::ZERO,
                Bytes::new(),
                U256::ZERO,
                21_000,
                5_000_000_000,
            )
            .await
            .unwrap();
        assert_ne!(raw, raw2);
    }
}
