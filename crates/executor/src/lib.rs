//! Swap execution against a Uniswap-V2-style router
//!
//! Features:
//! - Router quotes via `getAmountsOut`
//! - Slippage-bounded transaction building with fresh nonce and gas
//! - Node-side simulation (gas estimation) before signing
//! - Signing with transient key material and raw broadcast
//! - Per-account serialization of nonce use

pub mod budget;
pub mod builder;
pub mod client;
pub mod metadata;
pub mod nonce;
pub mod quote;
pub mod router;
pub mod simulator;
pub mod submitter;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use budget::RequestBudget;
pub use builder::{TransactionBuilder, UnsignedSwap};
pub use client::{AlloyChainClient, ChainClient};
pub use metadata::{token_decimals, token_metadata, TokenMetadata};
pub use nonce::AccountLocks;
pub use quote::QuoteEngine;
pub use simulator::SwapSimulator;
pub use submitter::{address_of, TransactionSubmitter};
