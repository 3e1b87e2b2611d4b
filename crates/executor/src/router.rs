//! Router and token ABI bindings

use alloy::network::TransactionBuilder;
use alloy::primitives::Address;
use alloy::rpc::types::eth::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;

use swap_core::{RpcError, RpcResult};

use crate::budget::RequestBudget;
use crate::client::ChainClient;

sol! {
    interface IUniswapV2Router02 {
        function WETH() external pure returns (address);

        function getAmountsOut(uint256 amountIn, address[] calldata path)
            external view returns (uint256[] memory amounts);

        function swapExactETHForTokens(
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external payable returns (uint256[] memory amounts);

        function swapExactTokensForETH(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external returns (uint256[] memory amounts);
    }

    interface IERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

/// Execute a read-only contract call and decode its return values.
pub async fn call_view<C>(
    client: &dyn ChainClient,
    to: Address,
    call: &C,
    budget: &RequestBudget,
) -> RpcResult<C::Return>
where
    C: SolCall,
{
    let tx = TransactionRequest::default()
        .with_to(to)
        .with_input(call.abi_encode());
    let output = budget.run(client.call(&tx)).await?;
    C::abi_decode_returns(&output, true).map_err(|e| {
        RpcError::InvalidResponse(format!("{} returned undecodable data: {}", C::SIGNATURE, e))
    })
}
