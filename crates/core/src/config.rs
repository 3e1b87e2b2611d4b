//! Configuration types

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use alloy_primitives::Address;
use serde::{Deserialize, Deserializer, Serialize};
use zeroize::Zeroizing;

use crate::{SlippageBps, SwapResult};

/// Process-wide key vault passphrase, read-only after startup.
///
/// Zeroized on drop and redacted from `Debug`.
#[derive(Clone)]
pub struct Passphrase(Zeroizing<String>);

impl Passphrase {
    /// `None` for an empty passphrase
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = Zeroizing::new(value.into());
        if value.is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}

fn deserialize_passphrase<'de, D>(deserializer: D) -> Result<Option<Passphrase>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(Passphrase::new))
}

/// Execution parameters for the swap pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub slippage_bps: u16,
    pub deadline_seconds: u64,
    /// Bound on each individual node call
    pub rpc_timeout: Duration,
    /// Bound on a whole request, across all of its node calls
    pub request_timeout: Duration,
    /// Fixed gas price; the node's suggestion is used when absent
    pub gas_price_wei: Option<u128>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            slippage_bps: 300,
            deadline_seconds: 300,
            rpc_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
            gas_price_wei: None,
        }
    }
}

/// Complete bot configuration, as loaded from the environment
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub dex_router_address: Address,
    #[serde(
        default,
        rename = "private_key_passphrase",
        deserialize_with = "deserialize_passphrase"
    )]
    pub passphrase: Option<Passphrase>,
    pub database_file: PathBuf,
    pub default_slippage_bps: i64,
    pub rpc_timeout_secs: u64,
    #[serde(default)]
    pub gas_price_wei: Option<u64>,
}

impl AppConfig {
    /// Validated execution parameters
    pub fn execution(&self) -> SwapResult<ExecutionConfig> {
        let slippage = SlippageBps::new(self.default_slippage_bps)?;
        let rpc_timeout = Duration::from_secs(self.rpc_timeout_secs.max(1));
        let defaults = ExecutionConfig::default();

        Ok(ExecutionConfig {
            slippage_bps: slippage.bps(),
            rpc_timeout,
            request_timeout: defaults.request_timeout.max(rpc_timeout),
            gas_price_wei: self.gas_price_wei.map(u128::from),
            ..defaults
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passphrase_redacted() {
        let pass = Passphrase::new("hunter2").unwrap();
        assert_eq!(pass.expose(), "hunter2");
        assert!(!format!("{:?}", pass).contains("hunter2"));
        assert!(Passphrase::new("").is_none());
    }

    #[test]
    fn test_execution_defaults() {
        let config = ExecutionConfig::default();
        assert_eq!(config.slippage_bps, 300);
        assert_eq!(config.deadline_seconds, 300);
        assert_eq!(config.rpc_timeout, Duration::from_secs(30));
    }
}
