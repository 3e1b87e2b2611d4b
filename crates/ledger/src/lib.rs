//! Append-only trade ledger and wallet store on SQLite

pub mod error;
pub mod schema;
pub mod store;

pub use error::{LedgerError, LedgerResult};
pub use store::TradeLedger;
