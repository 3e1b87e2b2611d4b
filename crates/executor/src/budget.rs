//! Shared deadline for all node calls of one request

use std::future::Future;
use std::time::{Duration, Instant};

use swap_core::{ExecutionConfig, RpcError, RpcResult};

/// Each call gets at most `per_call`, and never more than what is left of
/// the request's overall deadline.
#[derive(Debug, Clone, Copy)]
pub struct RequestBudget {
    deadline: Instant,
    per_call: Duration,
}

impl RequestBudget {
    pub fn new(per_call: Duration, total: Duration) -> Self {
        Self {
            deadline: Instant::now() + total,
            per_call,
        }
    }

    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self::new(config.rpc_timeout, config.request_timeout)
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Run one node call under the budget.
    pub async fn run<T, F>(&self, fut: F) -> RpcResult<T>
    where
        F: Future<Output = RpcResult<T>>,
    {
        let limit = self.per_call.min(self.remaining());
        if limit.is_zero() {
            return Err(RpcError::Timeout(Duration::ZERO));
        }
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(RpcError::Timeout(limit)),
        }
    }
}

impl Default for RequestBudget {
    fn default() -> Self {
        Self::from_config(&ExecutionConfig::default())
    }
}
