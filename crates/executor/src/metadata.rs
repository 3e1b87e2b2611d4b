//! ERC20 metadata lookup for callers that render token details

use alloy::primitives::Address;
use serde_json::json;

use swap_core::{SwapError, SwapResult};

use crate::budget::RequestBudget;
use crate::client::ChainClient;
use crate::router::{call_view, IERC20};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl TokenMetadata {
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "address": self.address.to_string(),
            "name": self.name,
            "symbol": self.symbol,
            "decimals": self.decimals,
        })
    }
}

pub async fn token_metadata(
    client: &dyn ChainClient,
    token: Address,
    budget: &RequestBudget,
) -> SwapResult<TokenMetadata> {
    let read_err = |field: &str, e: swap_core::RpcError| {
        SwapError::Quote(format!("could not read {} of {}: {}", field, token, e))
    };

    let name = call_view(client, token, &IERC20::nameCall {}, budget)
        .await
        .map_err(|e| read_err("name", e))?
        ._0;
    let symbol = call_view(client, token, &IERC20::symbolCall {}, budget)
        .await
        .map_err(|e| read_err("symbol", e))?
        ._0;
    let decimals = call_view(client, token, &IERC20::decimalsCall {}, budget)
        .await
        .map_err(|e| read_err("decimals", e))?
        ._0;

    Ok(TokenMetadata {
        address: token,
        name,
        symbol,
        decimals,
    })
}

/// Decimals of `token`, needed to turn a human amount into base units
pub async fn token_decimals(
    client: &dyn ChainClient,
    token: Address,
    budget: &RequestBudget,
) -> SwapResult<u8> {
    call_view(client, token, &IERC20::decimalsCall {}, budget)
        .await
        .map(|ret| ret._0)
        .map_err(|e| SwapError::Quote(format!("could not read decimals of {}: {}", token, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChain;

    #[tokio::test]
    async fn test_token_metadata() {
        let mock = MockChain::new();
        let meta = token_metadata(&mock, Address::repeat_byte(0xaa), &RequestBudget::default())
            .await
            .unwrap();
        assert_eq!(meta.symbol, MockChain::TOKEN_SYMBOL);
        assert_eq!(meta.decimals, 18);
        assert_eq!(meta.to_json()["symbol"], MockChain::TOKEN_SYMBOL);
    }
}
