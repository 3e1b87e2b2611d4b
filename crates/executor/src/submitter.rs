//! Signing with transient key material and raw broadcast

use std::str::FromStr;
use std::sync::Arc;

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use tracing::{info, warn};
use zeroize::Zeroizing;

use swap_core::{RejectionKind, RpcError, SwapError, SwapResult};

use crate::budget::RequestBudget;
use crate::builder::UnsignedSwap;
use crate::client::ChainClient;

/// Derive the account address for a 0x-prefixed hex private key.
pub fn address_of(key_material: &str) -> SwapResult<Address> {
    Ok(parse_signer(key_material)?.address())
}

fn parse_signer(key_material: &str) -> SwapResult<PrivateKeySigner> {
    let hex = key_material
        .trim()
        .strip_prefix("0x")
        .ok_or_else(|| SwapError::InvalidKey("private key must start with 0x".to_string()))?;

    PrivateKeySigner::from_str(hex)
        .map_err(|_| SwapError::InvalidKey("not a valid secp256k1 private key".to_string()))
}

/// Transaction submitter
pub struct TransactionSubmitter {
    client: Arc<dyn ChainClient>,
}

impl TransactionSubmitter {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self { client }
    }

    /// Sign `tx` and submit it to the public mempool.
    ///
    /// `key_material` is consumed; it and the signer are wiped before the
    /// broadcast is awaited. The returned hash only means the node accepted
    /// the transaction, not that it was mined.
    pub async fn sign_and_send(
        &self,
        key_material: Zeroizing<String>,
        tx: &UnsignedSwap,
        budget: &RequestBudget,
    ) -> SwapResult<String> {
        let raw = {
            let signer = parse_signer(&key_material)?;
            drop(key_material);

            if signer.address() != tx.from {
                return Err(SwapError::Build(format!(
                    "transaction sender {} does not match the signing key",
                    tx.from
                )));
            }

            let wallet = EthereumWallet::from(signer);
            let envelope = tx
                .to_request()
                .build(&wallet)
                .await
                .map_err(|e| SwapError::Build(format!("signing failed: {}", e)))?;
            envelope.encoded_2718()
        };

        info!(from = %tx.from, nonce = tx.nonce, "Submitting to public mempool");

        let hash = budget
            .run(self.client.send_raw_transaction(&raw))
            .await
            .map_err(|e| {
                let err = broadcast_error(e);
                warn!(from = %tx.from, nonce = tx.nonce, "Broadcast rejected: {}", err);
                err
            })?;

        let tx_hash = hash.to_string();
        info!(%tx_hash, nonce = tx.nonce, "Transaction accepted by node");
        Ok(tx_hash)
    }
}

fn broadcast_error(err: RpcError) -> SwapError {
    match err {
        RpcError::Timeout(after) => SwapError::Broadcast {
            kind: RejectionKind::Timeout,
            message: format!(
                "no answer from node after {:?}; the transaction may still be in the mempool",
                after
            ),
        },
        RpcError::Node(message) | RpcError::InvalidResponse(message) => SwapError::Broadcast {
            kind: RejectionKind::classify(&message),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChain;
    use alloy::consensus::Transaction as _;
    use alloy::primitives::{Bytes, U256};

    // Well-known test vector key, never funded on a real chain
    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn unsigned(from: Address, nonce: u64) -> UnsignedSwap {
        UnsignedSwap {
            chain_id: MockChain::CHAIN_ID,
            from,
            to: MockChain::ROUTER,
            value: U256::from(1_000u64),
            data: Bytes::from(vec![0xde, 0xad]),
            nonce,
            gas_price: MockChain::GAS_PRICE,
            gas_limit: MockChain::GAS_ESTIMATE,
            deadline: 0,
            amount_out_min: U256::ZERO,
        }
    }

    #[test]
    fn test_address_of() {
        let address = address_of(KEY).unwrap();
        assert_eq!(
            address,
            Address::from_str("0x2c7536E3605D9C16a7a3D7b1898e529396a65c23").unwrap()
        );
        assert!(matches!(address_of(&KEY[2..]), Err(SwapError::InvalidKey(_))));
        assert!(matches!(address_of("0x1234"), Err(SwapError::InvalidKey(_))));
    }

    #[test]
    fn test_invalid_key_error_hides_key() {
        let bad = "0xzz0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
        let err = address_of(bad).unwrap_err();
        assert!(!err.to_string().contains("0883a691"));
    }

    #[tokio::test]
    async fn test_sign_and_send() {
        let mock = Arc::new(MockChain::new());
        let from = address_of(KEY).unwrap();
        let submitter = TransactionSubmitter::new(mock.clone());

        let hash = submitter
            .sign_and_send(Zeroizing::new(KEY.to_string()), &unsigned(from, 0), &RequestBudget::default())
            .await
            .unwrap();

        assert!(hash.starts_with("0x"));
        assert_eq!(hash.len(), 66);

        let sent = mock.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].nonce(), 0);
        assert_eq!(sent[0].value(), U256::from(1_000u64));
        assert_eq!(sent[0].chain_id(), Some(MockChain::CHAIN_ID));
        assert_eq!(sent[0].tx_hash().to_string(), hash);
    }

    #[tokio::test]
    async fn test_node_rejection_is_classified() {
        let mock = Arc::new(MockChain::new());
        let from = address_of(KEY).unwrap();
        mock.set_nonce(from, 5);
        let submitter = TransactionSubmitter::new(mock.clone());

        // stale nonce
        let err = submitter
            .sign_and_send(Zeroizing::new(KEY.to_string()), &unsigned(from, 4), &RequestBudget::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::Broadcast { kind: RejectionKind::NonceTooLow, .. }));
        assert!(mock.sent().is_empty());
    }

    #[tokio::test]
    async fn test_sender_mismatch_is_rejected_before_broadcast() {
        let mock = Arc::new(MockChain::new());
        let submitter = TransactionSubmitter::new(mock.clone());

        let err = submitter
            .sign_and_send(
                Zeroizing::new(KEY.to_string()),
                &unsigned(Address::repeat_byte(9), 0),
                &RequestBudget::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::Build(_)));
        assert_eq!(mock.network_calls(), 0);
    }
}
