//! Configuration loading

use config::{Config, ConfigError, Environment, Map};

use swap_core::{AppConfig, Passphrase, SwapError, SwapResult};

pub const DEFAULT_CHAIN_ID: i64 = 97;
pub const DEFAULT_DATABASE_FILE: &str = "./data/db.sqlite";
pub const DEFAULT_SLIPPAGE_BPS: i64 = 300;
pub const DEFAULT_RPC_TIMEOUT_SECS: i64 = 30;

const PASSPHRASE_KEY: &str = "private_key_passphrase";

/// Load configuration from the process environment (after `.env`).
pub fn load_config() -> SwapResult<AppConfig> {
    load_config_from(None)
}

/// Load configuration from `vars` instead of the process environment.
///
/// Keys are the variable names as they would appear in the environment,
/// e.g. `RPC_URL`.
pub fn load_config_from(vars: Option<Map<String, String>>) -> SwapResult<AppConfig> {
    let settings = Config::builder()
        .set_default("chain_id", DEFAULT_CHAIN_ID)
        .and_then(|b| b.set_default("database_file", DEFAULT_DATABASE_FILE))
        .and_then(|b| b.set_default("default_slippage_bps", DEFAULT_SLIPPAGE_BPS))
        .and_then(|b| b.set_default("rpc_timeout_secs", DEFAULT_RPC_TIMEOUT_SECS))
        .map_err(|e| SwapError::Config(e.to_string()))?
        .add_source(
            Environment::default()
                .try_parsing(true)
                .ignore_empty(true)
                .source(vars.clone()),
        )
        .build()
        .map_err(|e| SwapError::Config(format!("failed to read configuration: {}", e)))?;

    let mut config: AppConfig = settings
        .try_deserialize()
        .map_err(|e| SwapError::Config(format!("invalid configuration: {}", e)))?;

    // Key derivation must see the passphrase byte for byte
    config.passphrase = raw_passphrase(vars)?;

    // Fail on bad slippage at startup rather than on the first swap
    config.execution()?;
    Ok(config)
}

/// `PRIVATE_KEY_PASSPHRASE` exactly as set, without numeric or bool coercion
fn raw_passphrase(vars: Option<Map<String, String>>) -> SwapResult<Option<Passphrase>> {
    let raw = Config::builder()
        .add_source(Environment::default().try_parsing(false).source(vars))
        .build()
        .map_err(|e| SwapError::Config(format!("failed to read configuration: {}", e)))?;

    match raw.get_string(PASSPHRASE_KEY) {
        Ok(value) => Ok(Passphrase::new(value)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(SwapError::Config(format!("invalid {}: {}", PASSPHRASE_KEY, e))),
    }
}
