//! Swap engine
//!
//! Wires the key vault, the router pipeline and the trade ledger into one
//! service, and exposes it through the `swapbot` command line.

pub mod cli;
pub mod service;
pub mod settings;

pub use service::{BuyRequest, SellRequest, SwapService};
pub use settings::{load_config, load_config_from};
