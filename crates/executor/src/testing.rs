//! In-process mock node for tests
//!
//! Behaves like a single router deployment: quotes come from a configurable
//! amount, nonces only advance when a raw transaction is accepted, and every
//! accepted transaction is kept for inspection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use alloy::consensus::{Transaction as _, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{address, Address, Bytes, B256, U256};
use alloy::rpc::types::eth::TransactionRequest;
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use parking_lot::Mutex;

use swap_core::{RpcError, RpcResult};

use crate::client::ChainClient;
use crate::router::{IUniswapV2Router02, IERC20};

pub struct MockChain {
    quote: Mutex<Option<U256>>,
    gas_estimate: Mutex<Result<u64, String>>,
    nonces: Mutex<HashMap<Address, u64>>,
    observed_nonces: Mutex<Vec<u64>>,
    sent: Mutex<Vec<TxEnvelope>>,
    broadcast_error: Mutex<Option<String>>,
    nonce_delay: Mutex<Duration>,
    calls: AtomicUsize,
}

impl MockChain {
    pub const CHAIN_ID: u64 = 97;
    pub const ROUTER: Address = address!("9ac64cc6e4415144c455bd8e4837fea55603e5c3");
    pub const WETH: Address = address!("ae13d989dac2f0debff460ac112a837c89baa7cd");
    pub const GAS_PRICE: u128 = 10_000_000_000;
    pub const GAS_ESTIMATE: u64 = 180_000;
    pub const TOKEN_SYMBOL: &'static str = "MOCK";

    pub fn new() -> Self {
        Self {
            quote: Mutex::new(Some(U256::from(1_000_000u64))),
            gas_estimate: Mutex::new(Ok(Self::GAS_ESTIMATE)),
            nonces: Mutex::new(HashMap::new()),
            observed_nonces: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            broadcast_error: Mutex::new(None),
            nonce_delay: Mutex::new(Duration::ZERO),
            calls: AtomicUsize::new(0),
        }
    }

    /// Output of the last hop for any quote; `None` means no pool
    pub fn set_quote(&self, amount_out: Option<U256>) {
        *self.quote.lock() = amount_out;
    }

    pub fn set_gas_estimate(&self, estimate: Result<u64, String>) {
        *self.gas_estimate.lock() = estimate;
    }

    pub fn set_nonce(&self, account: Address, nonce: u64) {
        self.nonces.lock().insert(account, nonce);
    }

    /// Reject every broadcast with this node message
    pub fn set_broadcast_error(&self, message: Option<&str>) {
        *self.broadcast_error.lock() = message.map(str::to_string);
    }

    /// Delay after answering a nonce read, widening the read-then-use window
    pub fn set_nonce_delay(&self, delay: Duration) {
        *self.nonce_delay.lock() = delay;
    }

    pub fn network_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Nonces handed out by `transaction_count`, in order
    pub fn observed_nonces(&self) -> Vec<u64> {
        self.observed_nonces.lock().clone()
    }

    pub fn sent(&self) -> Vec<TxEnvelope> {
        self.sent.lock().clone()
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn answer_call(&self, input: &[u8]) -> RpcResult<Bytes> {
        let selector: [u8; 4] = input
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| RpcError::Node("execution reverted".to_string()))?;

        let encoded = if selector == IUniswapV2Router02::WETHCall::SELECTOR {
            Self::WETH.abi_encode()
        } else if selector == IUniswapV2Router02::getAmountsOutCall::SELECTOR {
            let call = IUniswapV2Router02::getAmountsOutCall::abi_decode(input, true)
                .map_err(|e| RpcError::Node(e.to_string()))?;
            let out = (*self.quote.lock()).ok_or_else(|| {
                RpcError::Node("execution reverted: UniswapV2Library: INSUFFICIENT_LIQUIDITY".to_string())
            })?;
            let mut amounts = vec![call.amountIn];
            amounts.resize(call.path.len().saturating_sub(1), call.amountIn);
            amounts.push(out);
            amounts.abi_encode()
        } else if selector == IERC20::nameCall::SELECTOR {
            "Mock Token".to_string().abi_encode()
        } else if selector == IERC20::symbolCall::SELECTOR {
            Self::TOKEN_SYMBOL.to_string().abi_encode()
        } else if selector == IERC20::decimalsCall::SELECTOR {
            U256::from(18u8).abi_encode()
        } else {
            return Err(RpcError::Node("execution reverted".to_string()));
        };
        Ok(Bytes::from(encoded))
    }
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn chain_id(&self) -> RpcResult<u64> {
        self.touch();
        Ok(Self::CHAIN_ID)
    }

    async fn transaction_count(&self, address: Address) -> RpcResult<u64> {
        self.touch();
        let nonce = self.nonces.lock().get(&address).copied().unwrap_or(0);
        self.observed_nonces.lock().push(nonce);

        let delay = *self.nonce_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(nonce)
    }

    async fn gas_price(&self) -> RpcResult<u128> {
        self.touch();
        Ok(Self::GAS_PRICE)
    }

    async fn estimate_gas(&self, _tx: &TransactionRequest) -> RpcResult<u64> {
        self.touch();
        self.gas_estimate.lock().clone().map_err(RpcError::Node)
    }

    async fn call(&self, tx: &TransactionRequest) -> RpcResult<Bytes> {
        self.touch();
        let input = tx.input.input().cloned().unwrap_or_default();
        self.answer_call(&input)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> RpcResult<B256> {
        self.touch();
        if let Some(message) = self.broadcast_error.lock().clone() {
            return Err(RpcError::Node(message));
        }

        let envelope = TxEnvelope::decode_2718(&mut &raw[..])
            .map_err(|e| RpcError::Node(format!("rlp: {}", e)))?;
        let sender = envelope
            .recover_signer()
            .map_err(|_| RpcError::Node("invalid sender".to_string()))?;

        let mut nonces = self.nonces.lock();
        let expected = nonces.get(&sender).copied().unwrap_or(0);
        if envelope.nonce() < expected {
            return Err(RpcError::Node(format!(
                "nonce too low: next nonce {}, tx nonce {}",
                expected,
                envelope.nonce()
            )));
        }
        if envelope.nonce() > expected {
            return Err(RpcError::Node(format!(
                "nonce too high: next nonce {}, tx nonce {}",
                expected,
                envelope.nonce()
            )));
        }
        nonces.insert(sender, expected + 1);
        drop(nonces);

        let hash = *envelope.tx_hash();
        self.sent.lock().push(envelope);
        Ok(hash)
    }
}
