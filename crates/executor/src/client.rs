//! Node access used by the swap pipeline

use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::eth::TransactionRequest;
use alloy::transports::http::Http;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use swap_core::{RpcError, RpcResult};

/// The JSON-RPC surface the engine needs from a node.
///
/// Every method is a single read or a single broadcast; callers decide on
/// deadlines and never retry.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> RpcResult<u64>;

    /// `eth_getTransactionCount` at the pending tag
    async fn transaction_count(&self, address: Address) -> RpcResult<u64>;

    async fn gas_price(&self) -> RpcResult<u128>;

    /// `eth_estimateGas`; a revert surfaces as an error
    async fn estimate_gas(&self, tx: &TransactionRequest) -> RpcResult<u64>;

    /// `eth_call` against latest state
    async fn call(&self, tx: &TransactionRequest) -> RpcResult<Bytes>;

    /// `eth_sendRawTransaction`; returns the hash once the mempool accepts it
    async fn send_raw_transaction(&self, raw: &[u8]) -> RpcResult<B256>;
}

/// HTTP JSON-RPC client backed by alloy
pub struct AlloyChainClient {
    provider: RootProvider<Http<Client>>,
    timeout: Duration,
}

impl AlloyChainClient {
    /// Connect over HTTP with a per-request timeout.
    pub fn connect(rpc_url: &str, timeout: Duration) -> RpcResult<Self> {
        let url: reqwest::Url = rpc_url
            .parse()
            .map_err(|e| RpcError::Node(format!("invalid RPC URL: {}", e)))?;

        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Node(format!("HTTP client setup failed: {}", e)))?;

        let transport = Http::with_client(http_client, url);
        let is_local = transport.guess_local();
        let provider = ProviderBuilder::new().on_client(RpcClient::new(transport, is_local));

        debug!("RPC client ready (timeout {:?})", timeout);

        Ok(Self { provider, timeout })
    }

    async fn bounded<T, F>(&self, fut: F) -> RpcResult<T>
    where
        F: std::future::Future<Output = Result<T, alloy::transports::TransportError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|e| RpcError::Node(e.to_string())),
            Err(_) => Err(RpcError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    async fn chain_id(&self) -> RpcResult<u64> {
        self.bounded(async { self.provider.get_chain_id().await }).await
    }

    async fn transaction_count(&self, address: Address) -> RpcResult<u64> {
        self.bounded(async { self.provider.get_transaction_count(address).pending().await })
            .await
    }

    async fn gas_price(&self) -> RpcResult<u128> {
        self.bounded(async { self.provider.get_gas_price().await }).await
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> RpcResult<u64> {
        self.bounded(async { self.provider.estimate_gas(tx).await }).await
    }

    async fn call(&self, tx: &TransactionRequest) -> RpcResult<Bytes> {
        self.bounded(async { self.provider.call(tx).await }).await
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> RpcResult<B256> {
        self.bounded(async {
            let pending = self.provider.send_raw_transaction(raw).await?;
            Ok(*pending.tx_hash())
        })
        .await
    }
}
