//! Error taxonomy for the console.
//!
//! Read-path failures never reach this enum: they are caught at the
//! `ChainReader`/`PriceOracle` boundary, logged, and degraded to a zero or
//! default value so a render always has a consistent dataset. Only write-path
//! conditions and user mistakes surface to the caller.

use std::fmt;

#[derive(Debug)]
pub enum ClientError {
    /// A write was attempted without a configured wallet session.
    WalletNotConnected,

    /// Swap or liquidity requested for a token outside the supported set.
    UnsupportedAsset(String),

    /// An external read failed before it could be absorbed into a default.
    /// Only produced on paths where no sane default exists (e.g. pair
    /// reserves needed to size a liquidity transaction).
    ReadFailure(String),

    /// A submitted transaction reverted or failed to confirm. Never retried
    /// automatically; resubmitting is the user's decision.
    WriteFailure(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::WalletNotConnected => write!(f, "wallet not connected"),
            ClientError::UnsupportedAsset(sym) => write!(f, "unsupported asset: {}", sym),
            ClientError::ReadFailure(msg) => write!(f, "read failed: {}", msg),
            ClientError::WriteFailure(msg) => write!(f, "transaction failed: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

impl ClientError {
    /// Wrap any transport/signing error as a write failure.
    pub fn write<E: fmt::Display>(err: E) -> Self {
        ClientError::WriteFailure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            ClientError::WalletNotConnected.to_string(),
            "wallet not connected"
        );
        assert_eq!(
            ClientError::UnsupportedAsset("DOGE".into()).to_string(),
            "unsupported asset: DOGE"
        );
    }
}
