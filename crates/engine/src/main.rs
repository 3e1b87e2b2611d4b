//! Swap bot - custodial router swaps
//!
//! Main entry point for the command line

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use swap_engine::cli::{self, Cli};
use swap_engine::{load_config, SwapService};
use swap_executor::{AlloyChainClient, ChainClient};
use swap_ledger::TradeLedger;
use swap_vault::KeyVault;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize logging on stderr so command output stays parseable
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();

    info!("Starting swapbot v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config().context("Failed to load configuration")?;
    let execution = config.execution()?;

    let vault = KeyVault::from_config(config.passphrase.as_ref())?;

    let ledger = TradeLedger::open(&config.database_file)
        .with_context(|| format!("Failed to open {}", config.database_file.display()))?;
    ledger.migrate().context("Failed to prepare database schema")?;

    let client = AlloyChainClient::connect(&config.rpc_url, execution.rpc_timeout)
        .context("Failed to set up RPC client")?;
    let client: Arc<dyn ChainClient> = Arc::new(client);

    match client.chain_id().await {
        Ok(id) if id != config.chain_id => {
            anyhow::bail!("RPC node is on chain {}, configured for {}", id, config.chain_id);
        }
        Ok(_) => {}
        Err(e) => warn!("Could not verify chain id: {}", e),
    }

    let service = SwapService::new(
        client,
        vault,
        ledger,
        config.chain_id,
        config.dex_router_address,
        execution,
    );

    match cli::execute(args.command, &service, args.json).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("{}", cli::render_error(&e, args.json));
            Ok(ExitCode::FAILURE)
        }
    }
}
