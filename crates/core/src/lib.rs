//! Core types and utilities for the swap engine
//!
//! This crate provides shared types used across all components:
//! - Native and token amount handling
//! - Swap paths, quotes and slippage bounds
//! - Trade records
//! - Runtime configuration
//! - Error taxonomy

pub mod types;
pub mod quotes;
pub mod trades;
pub mod config;
pub mod errors;

pub use types::*;
pub use quotes::*;
pub use trades::*;
pub use config::*;
pub use errors::*;
