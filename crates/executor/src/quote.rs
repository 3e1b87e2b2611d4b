//! Router quotes

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use swap_core::{to_decimal, Quote, SwapError, SwapPath, SwapResult, NATIVE_DECIMALS};

use crate::budget::RequestBudget;
use crate::client::ChainClient;
use crate::router::{call_view, IUniswapV2Router02};

/// Reads expected swap output from the router's on-chain view functions.
///
/// Never caches and never retries; every failure is a `SwapError::Quote`.
pub struct QuoteEngine {
    client: Arc<dyn ChainClient>,
    router: Address,
}

impl QuoteEngine {
    pub fn new(client: Arc<dyn ChainClient>, router: Address) -> Self {
        Self { client, router }
    }

    /// Wrapped native token address exposed by the router
    pub async fn wrapped_native(&self, budget: &RequestBudget) -> SwapResult<Address> {
        let weth = call_view(
            self.client.as_ref(),
            self.router,
            &IUniswapV2Router02::WETHCall {},
            budget,
        )
        .await
        .map_err(|e| SwapError::Quote(format!("router did not return a wrapped native address: {}", e)))?
        ._0;

        if weth.is_zero() {
            return Err(SwapError::Quote(
                "router returned the zero address as wrapped native".to_string(),
            ));
        }
        Ok(weth)
    }

    pub async fn buy_path(&self, token: Address, budget: &RequestBudget) -> SwapResult<SwapPath> {
        let weth = self.wrapped_native(budget).await?;
        Ok(SwapPath::pair(weth, token))
    }

    pub async fn sell_path(&self, token: Address, budget: &RequestBudget) -> SwapResult<SwapPath> {
        let weth = self.wrapped_native(budget).await?;
        Ok(SwapPath::pair(token, weth))
    }

    /// Hop-by-hop amounts for `amount_in` along `path`
    pub async fn quote(
        &self,
        amount_in: U256,
        path: &SwapPath,
        budget: &RequestBudget,
    ) -> SwapResult<Quote> {
        let call = IUniswapV2Router02::getAmountsOutCall {
            amountIn: amount_in,
            path: path.to_vec(),
        };

        let amounts = call_view(self.client.as_ref(), self.router, &call, budget)
            .await
            .map_err(|e| {
                warn!(hops = path.hop_count(), "getAmountsOut failed: {}", e);
                SwapError::Quote(e.to_string())
            })?
            .amounts;

        if amounts.len() != path.tokens().len() {
            return Err(SwapError::Quote(format!(
                "router returned {} amounts for a {}-token path",
                amounts.len(),
                path.tokens().len()
            )));
        }

        let quote = Quote {
            path: path.clone(),
            amount_in,
            amounts,
        };

        if quote.amount_out().is_zero() {
            return Err(SwapError::Quote("router quoted zero output".to_string()));
        }

        debug!(
            token_in = %path.token_in(),
            token_out = %path.token_out(),
            %amount_in,
            amount_out = %quote.amount_out(),
            "router quote"
        );
        Ok(quote)
    }

    /// Expected output of the final hop
    pub async fn estimate_output(
        &self,
        amount_in: U256,
        path: &SwapPath,
        budget: &RequestBudget,
    ) -> SwapResult<U256> {
        Ok(self.quote(amount_in, path, budget).await?.amount_out())
    }

    /// Native value of one whole token, for display
    pub async fn native_per_token(
        &self,
        token: Address,
        decimals: u8,
        budget: &RequestBudget,
    ) -> SwapResult<Decimal> {
        let one_token = U256::from(10u8).pow(U256::from(decimals));
        let path = self.sell_path(token, budget).await?;
        let native = self.estimate_output(one_token, &path, budget).await?;
        to_decimal(native, NATIVE_DECIMALS)
            .ok_or_else(|| SwapError::Quote(format!("native amount {} out of range", native)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChain;
    use std::str::FromStr;

    fn engine(mock: Arc<MockChain>) -> QuoteEngine {
        QuoteEngine::new(mock, MockChain::ROUTER)
    }

    #[tokio::test]
    async fn test_estimate_output_returns_last_hop() {
        let mock = Arc::new(MockChain::new());
        mock.set_quote(Some(U256::from(500u64)));
        let quotes = engine(mock.clone());
        let budget = RequestBudget::default();

        let path = quotes.buy_path(Address::repeat_byte(0xaa), &budget).await.unwrap();
        assert_eq!(path.token_in(), MockChain::WETH);

        let out = quotes
            .estimate_output(U256::from(1_000u64), &path, &budget)
            .await
            .unwrap();
        assert_eq!(out, U256::from(500u64));
    }

    #[tokio::test]
    async fn test_missing_pool_is_quote_error() {
        let mock = Arc::new(MockChain::new());
        mock.set_quote(None);
        let quotes = engine(mock);
        let budget = RequestBudget::default();
        let path = SwapPath::pair(MockChain::WETH, Address::repeat_byte(0xaa));

        let err = quotes
            .estimate_output(U256::from(1_000u64), &path, &budget)
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::Quote(_)));
    }

    #[tokio::test]
    async fn test_native_per_token() {
        let mock = Arc::new(MockChain::new());
        // one whole token sells for 0.02 native
        mock.set_quote(Some(U256::from(20_000_000_000_000_000u64)));
        let quotes = engine(mock);

        let price = quotes
            .native_per_token(Address::repeat_byte(0xaa), 18, &RequestBudget::default())
            .await
            .unwrap();
        assert_eq!(price, Decimal::from_str("0.02").unwrap());
    }
}
