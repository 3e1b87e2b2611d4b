//! Command line surface of `swapbot`

use std::io::{self, BufRead};

use alloy_primitives::Address;
use clap::{Parser, Subcommand};
use serde_json::json;
use zeroize::Zeroizing;

use swap_core::{SwapError, SwapReceipt, SwapResult, TokenAmount, TradeRecord};
use swap_executor::token_metadata;

use crate::service::{BuyRequest, SellRequest, SwapService};

/// Custodial swap bot for Uniswap-V2-style routers
#[derive(Parser)]
#[command(name = "swapbot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store an encrypted private key for an account
    Setkey {
        /// Account identifier on the calling side
        external_id: String,

        /// 0x-prefixed hex key; read from stdin when omitted
        #[arg(long, env = "SWAPBOT_PRIVATE_KEY", hide_env_values = true)]
        private_key: Option<String>,
    },

    /// Buy a token with native currency
    Buy {
        external_id: String,

        /// Token address
        token: Address,

        /// Native amount, e.g. 0.01
        amount: String,

        /// Stored with the trade; no automatic selling
        #[arg(long)]
        profit_target: Option<u32>,

        /// Slippage tolerance in basis points
        #[arg(long)]
        slippage_bps: Option<i64>,
    },

    /// Sell a token for native currency
    Sell {
        external_id: String,

        token: Address,

        /// Token amount in whole tokens
        amount: String,

        #[arg(long)]
        slippage_bps: Option<i64>,
    },

    /// Approve the router to spend a token
    Approve {
        external_id: String,

        token: Address,

        /// Whole tokens; unlimited when omitted
        #[arg(long)]
        amount: Option<String>,
    },

    /// List recorded trades, newest first
    Trades { external_id: String },

    /// Show token details and its current native price
    Check { token: Address },
}

/// Run one command against `service`, printing its result.
pub async fn execute(command: Command, service: &SwapService, json_output: bool) -> SwapResult<()> {
    match command {
        Command::Setkey {
            external_id,
            private_key,
        } => {
            let key = match private_key {
                Some(key) => Zeroizing::new(key),
                None => read_key()?,
            };
            let address = service.register_wallet(&external_id, key)?;
            if json_output {
                println!("{}", json!({ "external_id": external_id, "address": address.to_string() }));
            } else {
                println!("Wallet {} stored for {}", address, external_id);
            }
        }

        Command::Buy {
            external_id,
            token,
            amount,
            profit_target,
            slippage_bps,
        } => {
            let receipt = service
                .buy(BuyRequest {
                    external_id,
                    token,
                    amount_native: amount,
                    profit_target_percent: profit_target,
                    slippage_bps,
                })
                .await?;
            print_receipt(&receipt, json_output);
        }

        Command::Sell {
            external_id,
            token,
            amount,
            slippage_bps,
        } => {
            let receipt = service
                .sell(SellRequest {
                    external_id,
                    token,
                    amount_tokens: amount,
                    slippage_bps,
                })
                .await?;
            print_receipt(&receipt, json_output);
        }

        Command::Approve {
            external_id,
            token,
            amount,
        } => {
            let tx_hash = service.approve(&external_id, token, amount.as_deref()).await?;
            if json_output {
                println!("{}", json!({ "tx_hash": tx_hash, "token": token.to_string() }));
            } else {
                println!("Approval sent: {}", tx_hash);
            }
        }

        Command::Trades { external_id } => {
            let trades = service.trades(&external_id)?;
            if json_output {
                println!("{}", to_json(&trades)?);
            } else if trades.is_empty() {
                println!("No trades recorded for {}", external_id);
            } else {
                for trade in &trades {
                    println!("{}", trade_line(trade));
                }
            }
        }

        Command::Check { token } => {
            let budget = service.budget();
            let client = service.client();
            let meta = token_metadata(client.as_ref(), token, &budget).await?;
            let price = service
                .quotes()
                .native_per_token(token, meta.decimals, &budget)
                .await?;

            if json_output {
                let mut value = meta.to_json();
                value["native_per_token"] = json!(price.to_string());
                println!("{}", value);
            } else {
                println!("{} ({}) {}", meta.name, meta.symbol, meta.address);
                println!("  decimals: {}", meta.decimals);
                println!("  price:    {} native per token", price.normalize());
            }
        }
    }
    Ok(())
}

/// Error text for the terminal, with a hint on what to do next
pub fn render_error(err: &SwapError, json_output: bool) -> String {
    if json_output {
        let mut value = json!({
            "error": err.to_string(),
            "hint": err.hint(),
            "funds_moved": err.funds_moved(),
        });
        if let SwapError::BroadcastNotRecorded { tx_hash, .. } = err {
            value["tx_hash"] = json!(tx_hash);
        }
        value.to_string()
    } else {
        format!("error: {}\nhint: {}", err, err.hint())
    }
}

fn print_receipt(receipt: &SwapReceipt, json_output: bool) {
    if json_output {
        match serde_json::to_string(receipt) {
            Ok(line) => println!("{}", line),
            Err(_) => println!("{}", json!({ "tx_hash": receipt.tx_hash })),
        }
        return;
    }

    println!("{} sent: {}", receipt.side, receipt.tx_hash);
    println!("  from:          {}", receipt.from);
    println!("  nonce:         {}", receipt.nonce);
    println!("  expected out:  {}", receipt.expected_out);
    println!("  minimum out:   {}", receipt.amount_out_min);
    if receipt.deadline > 0 {
        println!("  deadline:      {}", receipt.deadline);
    }
    println!("  record:        #{}", receipt.record_id);
}

fn trade_line(trade: &TradeRecord) -> String {
    format!(
        "#{} {} {} {} native / {} tokens @ {:.8} [{}] {} {}",
        trade.id,
        trade.created_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        trade.side,
        trade.amount_in_native.normalize(),
        TokenAmount::native(trade.amount_token),
        trade.price_native_per_token,
        trade.status.as_str(),
        trade.token,
        trade.tx_hash,
    )
}

fn to_json(trades: &[TradeRecord]) -> SwapResult<String> {
    serde_json::to_string(trades).map_err(|e| SwapError::Persistence(e.to_string()))
}

fn read_key() -> SwapResult<Zeroizing<String>> {
    eprintln!("Private key (0x...):");
    let mut line = Zeroizing::new(String::new());
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| SwapError::InvalidKey(format!("could not read key from stdin: {}", e)))?;
    Ok(Zeroizing::new(line.trim().to_string()))
}
