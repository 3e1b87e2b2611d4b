//! Swap path, quote and slippage types

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{SwapError, SwapResult};

/// 10000 bps = 100%
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Ordered token path for a router swap (first = input, last = output)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapPath(Vec<Address>);

impl SwapPath {
    pub fn pair(token_in: Address, token_out: Address) -> Self {
        Self(vec![token_in, token_out])
    }

    pub fn token_in(&self) -> Address {
        self.0[0]
    }

    pub fn token_out(&self) -> Address {
        self.0[self.0.len() - 1]
    }

    pub fn hop_count(&self) -> usize {
        self.0.len() - 1
    }

    pub fn tokens(&self) -> &[Address] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<Address> {
        self.0.clone()
    }
}

/// Router quote for one input amount along a path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub path: SwapPath,
    pub amount_in: U256,
    /// Hop-by-hop amounts as returned by the router, first = amount_in
    pub amounts: Vec<U256>,
}

impl Quote {
    /// Output of the final hop
    pub fn amount_out(&self) -> U256 {
        self.amounts.last().copied().unwrap_or(U256::ZERO)
    }
}

/// Slippage tolerance in basis points, always in `[0, 10000)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlippageBps(u16);

impl SlippageBps {
    pub fn new(bps: i64) -> SwapResult<Self> {
        if !(0..BPS_DENOMINATOR as i64).contains(&bps) {
            return Err(SwapError::Config(format!(
                "slippage must be in [0, {}) bps, got {}",
                BPS_DENOMINATOR, bps
            )));
        }
        Ok(Self(bps as u16))
    }

    pub fn bps(&self) -> u16 {
        self.0
    }

    /// floor(expected * (10000 - bps) / 10000)
    ///
    /// Split as expected = q * 10000 + r so the product never overflows U256.
    pub fn min_amount_out(&self, expected_out: U256) -> U256 {
        let denominator = U256::from(BPS_DENOMINATOR);
        let keep = U256::from(BPS_DENOMINATOR - self.0 as u64);
        let q = expected_out / denominator;
        let r = expected_out % denominator;
        q * keep + (r * keep) / denominator
    }
}

/// Minimum acceptable output for `expected_out` under `slippage_bps`.
pub fn min_amount_out(expected_out: U256, slippage_bps: i64) -> SwapResult<U256> {
    Ok(SlippageBps::new(slippage_bps)?.min_amount_out(expected_out))
}
