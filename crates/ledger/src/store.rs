//! SQLite-backed ledger handle

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use tracing::{debug, info};

use swap_core::{NewTrade, TradeRecord, TradeSide, TradeStatus, UserWallet};

use crate::error::{LedgerError, LedgerResult};
use crate::schema;

/// Owned handle on the bot database.
///
/// Cheap to clone; every clone shares one connection. Each method is a
/// single statement, so callers never observe half-written rows.
#[derive(Clone)]
pub struct TradeLedger {
    conn: Arc<Mutex<Connection>>,
}

impl TradeLedger {
    /// Open (or create) the database file, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        info!("Ledger opened at {}", path.display());
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> LedgerResult<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Create missing tables. Safe to run on every start.
    pub fn migrate(&self) -> LedgerResult<()> {
        let conn = self.conn.lock();
        conn.execute_batch(&format!(
            "{};\n{};\n{};",
            schema::CREATE_USERS,
            schema::CREATE_TRADES,
            schema::CREATE_TRADES_USER_INDEX
        ))?;
        debug!("Ledger schema ready");
        Ok(())
    }

    /// Store `payload` for `external_id`, replacing any previous wallet.
    ///
    /// The user id survives a replacement, so earlier trades stay attached.
    pub fn upsert_wallet(&self, external_id: &str, payload: &str) -> LedgerResult<i64> {
        let conn = self.conn.lock();
        let user_id = conn.query_row(
            "INSERT INTO users (external_id, encrypted_wallet) VALUES (?1, ?2)
             ON CONFLICT(external_id) DO UPDATE SET encrypted_wallet = excluded.encrypted_wallet
             RETURNING id",
            params![external_id, payload],
            |row| row.get(0),
        )?;
        debug!(user_id, "Wallet stored");
        Ok(user_id)
    }

    pub fn find_wallet(&self, external_id: &str) -> LedgerResult<Option<UserWallet>> {
        let conn = self.conn.lock();
        let wallet = conn
            .query_row(
                "SELECT id, external_id, encrypted_wallet FROM users WHERE external_id = ?1",
                params![external_id],
                |row| {
                    Ok(UserWallet {
                        user_id: row.get(0)?,
                        external_id: row.get(1)?,
                        encrypted_wallet: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(wallet)
    }

    /// Append a trade with status `pending` and return its id.
    pub fn record(&self, trade: &NewTrade) -> LedgerResult<i64> {
        let created_at = Utc::now();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO trades (user_id, tx_hash, token_address, amount_in_native, amount_token,
                buy_price_native_per_token, profit_target_percent, side, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                trade.user_id,
                trade.tx_hash,
                trade.token.to_string(),
                trade.amount_in_native.to_string(),
                trade.amount_token.to_string(),
                trade.implied_price(),
                trade.profit_target_percent,
                trade.side.as_str(),
                TradeStatus::Pending.as_str(),
                created_at,
            ],
        )?;
        let id = conn.last_insert_rowid();
        info!(record_id = id, tx_hash = %trade.tx_hash, side = %trade.side, "Trade recorded");
        Ok(id)
    }

    pub fn get(&self, record_id: i64) -> LedgerResult<Option<TradeRecord>> {
        let conn = self.conn.lock();
        let raw = conn
            .query_row(
                &format!("SELECT {} FROM trades WHERE id = ?1", schema::TRADE_COLUMNS),
                params![record_id],
                RawTrade::from_row,
            )
            .optional()?;
        raw.map(RawTrade::into_record).transpose()
    }

    /// Trades of one user, newest first
    pub fn trades_for_user(&self, user_id: i64) -> LedgerResult<Vec<TradeRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM trades WHERE user_id = ?1 ORDER BY id DESC",
            schema::TRADE_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![user_id], RawTrade::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawTrade::into_record).collect()
    }
}

/// Row as stored, before text columns are parsed
struct RawTrade {
    id: i64,
    user_id: i64,
    tx_hash: String,
    token: String,
    amount_in_native: String,
    amount_token: String,
    price: f64,
    profit_target_percent: Option<u32>,
    side: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl RawTrade {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            tx_hash: row.get(2)?,
            token: row.get(3)?,
            amount_in_native: row.get(4)?,
            amount_token: row.get(5)?,
            price: row.get(6)?,
            profit_target_percent: row.get(7)?,
            side: row.get(8)?,
            status: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    fn into_record(self) -> LedgerResult<TradeRecord> {
        let id = self.id;
        let corrupt = |column: &'static str, value: &str| LedgerError::CorruptRow {
            id,
            column,
            value: value.to_string(),
        };

        let token = Address::from_str(&self.token).map_err(|_| corrupt("token_address", &self.token))?;
        let amount_in_native = Decimal::from_str(&self.amount_in_native)
            .map_err(|_| corrupt("amount_in_native", &self.amount_in_native))?;
        let amount_token = U256::from_str(&self.amount_token)
            .map_err(|_| corrupt("amount_token", &self.amount_token))?;
        let side = TradeSide::from_db(&self.side).ok_or_else(|| corrupt("side", &self.side))?;
        let status = TradeStatus::from_db(&self.status).ok_or_else(|| corrupt("status", &self.status))?;

        Ok(TradeRecord {
            id,
            user_id: self.user_id,
            tx_hash: self.tx_hash,
            token,
            amount_in_native,
            amount_token,
            price_native_per_token: self.price,
            profit_target_percent: self.profit_target_percent,
            side,
            status,
            created_at: self.created_at,
        })
    }
}
