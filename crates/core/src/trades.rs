//! Trade record types

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{format_units, NATIVE_DECIMALS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "buy" => Some(Self::Buy),
            "sell" => Some(Self::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of a trade record. Only `Pending` is ever written here;
/// confirmation tracking happens outside this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Pending,
}

impl TradeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeStatus::Pending => "pending",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            _ => None,
        }
    }
}

/// A trade about to be appended to the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrade {
    pub user_id: i64,
    pub tx_hash: String,
    pub token: Address,
    /// Native side of the swap, as supplied (buy) or quoted (sell)
    pub amount_in_native: Decimal,
    /// Token side of the swap in smallest units
    pub amount_token: U256,
    pub profit_target_percent: Option<u32>,
    pub side: TradeSide,
}

impl NewTrade {
    /// Native per whole token, display only. Assumes an 18-decimal token.
    pub fn implied_price(&self) -> f64 {
        implied_price(self.amount_in_native, self.amount_token)
    }
}

/// Native units paid per whole token; 0.0 when no tokens are involved.
pub fn implied_price(amount_native: Decimal, amount_token: U256) -> f64 {
    if amount_token.is_zero() {
        return 0.0;
    }
    let tokens = Decimal::from_str(&format_units(amount_token, NATIVE_DECIMALS))
        .ok()
        .and_then(|t| t.to_f64())
        .unwrap_or_else(|| {
            let raw: f64 = amount_token.to_string().parse().unwrap_or(0.0);
            raw / 1e18
        });
    if tokens == 0.0 {
        return 0.0;
    }
    amount_native.to_f64().unwrap_or(0.0) / tokens
}

/// Persisted trade record (append-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: i64,
    pub user_id: i64,
    pub tx_hash: String,
    pub token: Address,
    pub amount_in_native: Decimal,
    pub amount_token: U256,
    pub price_native_per_token: f64,
    pub profit_target_percent: Option<u32>,
    pub side: TradeSide,
    pub status: TradeStatus,
    pub created_at: DateTime<Utc>,
}
