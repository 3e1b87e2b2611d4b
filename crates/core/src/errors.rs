//! Error types

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Key vault errors
///
/// Messages never carry key material, passphrases or derived keys.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Vault not configured: {0}")]
    Config(String),

    #[error("Malformed encrypted payload: {0}")]
    MalformedPayload(String),

    #[error("Decryption failed: wrong passphrase or tampered payload")]
    Decryption,
}

/// Node / transport errors
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    #[error("RPC error: {0}")]
    Node(String),

    #[error("RPC timeout after {0:?}")]
    Timeout(Duration),

    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),
}

/// Why a node refused a raw transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    NonceTooLow,
    NonceTooHigh,
    InsufficientFunds,
    Underpriced,
    InvalidSignature,
    AlreadyKnown,
    Timeout,
    Other,
}

impl RejectionKind {
    /// Classify a node error message.
    ///
    /// Geth, Erigon and BSC nodes all use lowercase fragments like these.
    pub fn classify(message: &str) -> Self {
        let msg = message.to_ascii_lowercase();
        if msg.contains("nonce too low") {
            RejectionKind::NonceTooLow
        } else if msg.contains("nonce too high") {
            RejectionKind::NonceTooHigh
        } else if msg.contains("insufficient funds") {
            RejectionKind::InsufficientFunds
        } else if msg.contains("underpriced") || msg.contains("fee too low") {
            RejectionKind::Underpriced
        } else if msg.contains("invalid sender") || msg.contains("invalid signature") {
            RejectionKind::InvalidSignature
        } else if msg.contains("already known") {
            RejectionKind::AlreadyKnown
        } else {
            RejectionKind::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionKind::NonceTooLow => "nonce too low",
            RejectionKind::NonceTooHigh => "nonce too high",
            RejectionKind::InsufficientFunds => "insufficient funds",
            RejectionKind::Underpriced => "underpriced",
            RejectionKind::InvalidSignature => "invalid signature",
            RejectionKind::AlreadyKnown => "already known",
            RejectionKind::Timeout => "timeout",
            RejectionKind::Other => "rejected",
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Swap pipeline errors
///
/// Every variant is terminal for the request that produced it.
#[derive(Debug, Error)]
pub enum SwapError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("No wallet registered for account {0}")]
    NoWallet(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("Quote failed: {0}")]
    Quote(String),

    #[error("Transaction build failed: {0}")]
    Build(String),

    #[error("Broadcast rejected ({kind}): {message}")]
    Broadcast { kind: RejectionKind, message: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Transaction {tx_hash} was broadcast but could not be recorded: {reason}")]
    BroadcastNotRecorded { tx_hash: String, reason: String },
}

impl SwapError {
    /// True when funds may already have moved on-chain.
    pub fn funds_moved(&self) -> bool {
        matches!(self, SwapError::BroadcastNotRecorded { .. })
    }

    /// Short guidance for whoever renders the error.
    pub fn hint(&self) -> &'static str {
        match self {
            SwapError::Config(_) => "check the bot configuration (passphrase, slippage bounds)",
            SwapError::NoWallet(_) => "register a key first with setkey",
            SwapError::InvalidAmount(_) => "use a positive decimal amount",
            SwapError::InvalidKey(_) => "provide a 0x-prefixed 32-byte hex private key",
            SwapError::Vault(VaultError::Config(_)) => "set PRIVATE_KEY_PASSPHRASE",
            SwapError::Vault(VaultError::MalformedPayload(_)) => "re-register the key with setkey",
            SwapError::Vault(VaultError::Decryption) => "re-enter the passphrase or re-register the key",
            SwapError::Quote(_) => "the token may have no liquidity pool; retry later",
            SwapError::Build(_) => "the swap would revert; lower the amount or raise slippage",
            SwapError::Broadcast { .. } => "nothing was sent; re-quote and retry",
            SwapError::Persistence(_) => "storage unavailable; retry later",
            SwapError::BroadcastNotRecorded { .. } => {
                "funds moved on-chain; reconcile this transaction hash manually"
            }
        }
    }
}

/// Result type alias
pub type VaultResult<T> = Result<T, VaultError>;
pub type RpcResult<T> = Result<T, RpcError>;
pub type SwapResult<T> = Result<T, SwapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_classification() {
        assert_eq!(RejectionKind::classify("nonce too low: next nonce 5, tx nonce 4"), RejectionKind::NonceTooLow);
        assert_eq!(RejectionKind::classify("Nonce too high"), RejectionKind::NonceTooHigh);
        assert_eq!(
            RejectionKind::classify("insufficient funds for gas * price + value"),
            RejectionKind::InsufficientFunds
        );
        assert_eq!(RejectionKind::classify("replacement transaction underpriced"), RejectionKind::Underpriced);
        assert_eq!(RejectionKind::classify("something else"), RejectionKind::Other);
    }

    #[test]
    fn test_broadcast_not_recorded_is_distinct() {
        let orphan = SwapError::BroadcastNotRecorded {
            tx_hash: "0xabc".to_string(),
            reason: "disk full".to_string(),
        };
        let rejected = SwapError::Broadcast {
            kind: RejectionKind::NonceTooLow,
            message: "nonce too low".to_string(),
        };

        assert!(orphan.funds_moved());
        assert!(!rejected.funds_moved());
        assert_ne!(orphan.hint(), rejected.hint());
        assert!(orphan.to_string().contains("0xabc"));
    }
}
