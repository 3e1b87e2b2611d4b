//! Node-side simulation of a transaction before it is signed

use std::sync::Arc;

use alloy::rpc::types::eth::TransactionRequest;
use tracing::{debug, warn};

use swap_core::{SwapError, SwapResult};

use crate::budget::RequestBudget;
use crate::client::ChainClient;

/// Simulation result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationResult {
    /// Gas reported by the node for the call against current state
    pub gas_used: u64,
    /// Gas limit to put on the transaction
    pub gas_limit: u64,
}

/// Runs `eth_estimateGas` for a fully populated call.
///
/// A revert (or any node failure) means no transaction may be produced.
pub struct SwapSimulator {
    client: Arc<dyn ChainClient>,
}

impl SwapSimulator {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self { client }
    }

    pub async fn simulate(
        &self,
        request: &TransactionRequest,
        budget: &RequestBudget,
    ) -> SwapResult<SimulationResult> {
        let gas_used = budget
            .run(self.client.estimate_gas(request))
            .await
            .map_err(|e| {
                warn!("Simulation failed: {}", e);
                SwapError::Build(format!("simulation failed: {}", e))
            })?;

        if gas_used == 0 {
            return Err(SwapError::Build("node estimated zero gas".to_string()));
        }

        let gas_limit = gas_used;
        debug!(gas_used, gas_limit, "simulation ok");

        Ok(SimulationResult { gas_used, gas_limit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChain;

    #[tokio::test]
    async fn test_gas_limit_is_estimate() {
        let mock = Arc::new(MockChain::new());
        mock.set_gas_estimate(Ok(100_000));
        let simulator = SwapSimulator::new(mock);

        let result = simulator
            .simulate(&TransactionRequest::default(), &RequestBudget::default())
            .await
            .unwrap();
        assert_eq!(result.gas_used, 100_000);
        assert_eq!(result.gas_limit, 100_000);
    }

    #[tokio::test]
    async fn test_revert_is_build_error() {
        let mock = Arc::new(MockChain::new());
        mock.set_gas_estimate(Err("execution reverted: UniswapV2Router: EXPIRED".to_string()));
        let simulator = SwapSimulator::new(mock);

        let err = simulator
            .simulate(&TransactionRequest::default(), &RequestBudget::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::Build(ref m) if m.contains("EXPIRED")));
    }
}
