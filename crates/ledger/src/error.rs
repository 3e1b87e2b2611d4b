use thiserror::Error;

use swap_core::SwapError;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cannot prepare database location: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt {column} value in row {id}: {value:?}")]
    CorruptRow {
        id: i64,
        column: &'static str,
        value: String,
    },
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<LedgerError> for SwapError {
    fn from(err: LedgerError) -> Self {
        SwapError::Persistence(err.to_string())
    }
}
