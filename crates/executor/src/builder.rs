//! Transaction builder for router swaps

use std::sync::Arc;

use alloy::network::TransactionBuilder as _;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::eth::TransactionRequest;
use alloy::sol_types::SolCall;
use tracing::{debug, info};

use swap_core::{min_amount_out, SwapError, SwapPath, SwapResult};

use crate::budget::RequestBudget;
use crate::client::ChainClient;
use crate::router::{IUniswapV2Router02, IERC20};
use crate::simulator::SwapSimulator;

/// Seconds a swap stays executable after it is built
pub const DEFAULT_DEADLINE_SECONDS: u64 = 300;

/// Fully populated, unsigned transaction ready for signing
#[derive(Debug, Clone)]
pub struct UnsignedSwap {
    pub chain_id: u64,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    /// Unix seconds; zero for calls without a deadline (approvals)
    pub deadline: u64,
    pub amount_out_min: U256,
}

impl UnsignedSwap {
    /// Legacy (gasPrice) transaction request
    pub fn to_request(&self) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(self.from)
            .with_to(self.to)
            .with_value(self.value)
            .with_input(self.data.clone())
            .with_nonce(self.nonce)
            .with_chain_id(self.chain_id)
            .with_gas_price(self.gas_price)
            .with_gas_limit(self.gas_limit)
    }
}

/// Transaction builder
pub struct TransactionBuilder {
    client: Arc<dyn ChainClient>,
    simulator: SwapSimulator,
    chain_id: u64,
    router_address: Address,
    deadline_seconds: u64,
    gas_price: Option<u128>,
}

impl TransactionBuilder {
    pub fn new(client: Arc<dyn ChainClient>, chain_id: u64, router_address: Address) -> Self {
        Self {
            simulator: SwapSimulator::new(Arc::clone(&client)),
            client,
            chain_id,
            router_address,
            deadline_seconds: DEFAULT_DEADLINE_SECONDS,
            gas_price: None,
        }
    }

    pub fn with_deadline_seconds(mut self, seconds: u64) -> Self {
        self.deadline_seconds = seconds;
        self
    }

    /// Fixed gas price instead of the node's suggestion
    pub fn with_gas_price(mut self, gas_price: Option<u128>) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub fn deadline_from(&self, now_secs: u64) -> u64 {
        now_secs.saturating_add(self.deadline_seconds)
    }

    /// Build `swapExactETHForTokens` paying `value_in` native
    pub async fn build_buy(
        &self,
        expected_out: U256,
        slippage_bps: i64,
        path: &SwapPath,
        from: Address,
        value_in: U256,
        budget: &RequestBudget,
    ) -> SwapResult<UnsignedSwap> {
        let amount_out_min = min_amount_out(expected_out, slippage_bps)?;
        let deadline = self.deadline_from(now_secs());

        let calldata = IUniswapV2Router02::swapExactETHForTokensCall {
            amountOutMin: amount_out_min,
            path: path.to_vec(),
            to: from,
            deadline: U256::from(deadline),
        }
        .abi_encode();

        info!(
            %from,
            %expected_out,
            %amount_out_min,
            slippage_bps,
            "Building buy swap"
        );

        self.finalize(from, self.router_address, value_in, calldata.into(), deadline, amount_out_min, budget)
            .await
    }

    /// Build `swapExactTokensForETH` selling `amount_in` tokens
    pub async fn build_sell(
        &self,
        amount_in: U256,
        expected_out: U256,
        slippage_bps: i64,
        path: &SwapPath,
        from: Address,
        budget: &RequestBudget,
    ) -> SwapResult<UnsignedSwap> {
        let amount_out_min = min_amount_out(expected_out, slippage_bps)?;
        let deadline = self.deadline_from(now_secs());

        let calldata = IUniswapV2Router02::swapExactTokensForETHCall {
            amountIn: amount_in,
            amountOutMin: amount_out_min,
            path: path.to_vec(),
            to: from,
            deadline: U256::from(deadline),
        }
        .abi_encode();

        info!(%from, %amount_in, %amount_out_min, slippage_bps, "Building sell swap");

        self.finalize(from, self.router_address, U256::ZERO, calldata.into(), deadline, amount_out_min, budget)
            .await
    }

    /// Build an ERC20 `approve` letting the router spend `amount` of `token`
    pub async fn build_approval(
        &self,
        token: Address,
        amount: U256,
        from: Address,
        budget: &RequestBudget,
    ) -> SwapResult<UnsignedSwap> {
        let calldata = IERC20::approveCall {
            spender: self.router_address,
            amount,
        }
        .abi_encode();

        info!(%from, %token, %amount, "Building router approval");

        self.finalize(from, token, U256::ZERO, calldata.into(), 0, U256::ZERO, budget)
            .await
    }

    /// Fetch nonce and gas price, then simulate to get the gas limit.
    #[allow(clippy::too_many_arguments)]
    async fn finalize(
        &self,
        from: Address,
        to: Address,
        value: U256,
        data: Bytes,
        deadline: u64,
        amount_out_min: U256,
        budget: &RequestBudget,
    ) -> SwapResult<UnsignedSwap> {
        let nonce = budget
            .run(self.client.transaction_count(from))
            .await
            .map_err(|e| SwapError::Build(format!("nonce unavailable: {}", e)))?;

        let gas_price = match self.gas_price {
            Some(price) => price,
            None => budget
                .run(self.client.gas_price())
                .await
                .map_err(|e| SwapError::Build(format!("gas price unavailable: {}", e)))?,
        };

        let request = TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_value(value)
            .with_input(data.clone())
            .with_nonce(nonce)
            .with_chain_id(self.chain_id)
            .with_gas_price(gas_price);

        let simulation = self.simulator.simulate(&request, budget).await?;

        debug!(nonce, gas_price, gas_limit = simulation.gas_limit, "Transaction built");

        Ok(UnsignedSwap {
            chain_id: self.chain_id,
            from,
            to,
            value,
            data,
            nonce,
            gas_price,
            gas_limit: simulation.gas_limit,
            deadline,
            amount_out_min,
        })
    }
}

fn now_secs() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
