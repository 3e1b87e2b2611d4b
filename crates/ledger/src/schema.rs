//! Table definitions

pub const CREATE_USERS: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    external_id TEXT UNIQUE,
    encrypted_wallet TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
)";

pub const CREATE_TRADES: &str = "
CREATE TABLE IF NOT EXISTS trades (
    id INTEGER PRIMARY KEY,
    user_id INTEGER,
    tx_hash TEXT,
    token_address TEXT,
    amount_in_native TEXT,
    amount_token TEXT,
    buy_price_native_per_token REAL,
    profit_target_percent INTEGER,
    side TEXT,
    status TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
)";

pub const CREATE_TRADES_USER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_trades_user ON trades(user_id)";

pub const TRADE_COLUMNS: &str = "id, user_id, tx_hash, token_address, amount_in_native, \
     amount_token, buy_price_native_per_token, profit_target_percent, side, status, created_at";
