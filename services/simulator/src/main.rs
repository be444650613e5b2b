//! DEX simulator binary
//!
//! Seeds the market and prints it, compares venue quotes for one trade, or
//! executes a trade through the router.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dex_config::{ExchangeConfig, LoggingConfig};
use dex_simulator::{execute_trade, log_config, log_error, quote_report, seed_market};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "dex-simulator")]
#[command(about = "In-memory multi-generation DEX simulator")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed the market and print every token and venue
    Seed,
    /// Compare every venue's output for one trade
    Quote {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Human amount of `from` to sell
        #[arg(long)]
        amount: Decimal,
    },
    /// Execute one trade through the router
    Swap {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: Decimal,
        /// Accepted shortfall against the best quote, in basis points
        #[arg(long, default_value_t = 50)]
        slippage_bps: u32,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = ExchangeConfig::load(args.config.as_deref()).context("Failed to load exchange configuration")?;
    init_logging(&config.logging, args.json_logs)?;
    log_config!(
        "V1 fee {} bps, V2 fee {} bps, {} fee tiers, max {} hops",
        config.fees.v1_fee_bps,
        config.fees.v2_fee_bps,
        config.fee_tiers.len(),
        config.router.max_hops
    );

    run(args.command, &config).inspect_err(|e| log_error!("{:#}", e))
}

fn run(command: Command, config: &ExchangeConfig) -> Result<()> {
    let mut market = seed_market(config)?;
    match command {
        Command::Seed => print_json(&market.summary),
        Command::Quote { from, to, amount } => print_json(&quote_report(&market, &from, &to, amount)?),
        Command::Swap {
            from,
            to,
            amount,
            slippage_bps,
        } => print_json(&execute_trade(&mut market, &from, &to, amount, slippage_bps)?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{rendered}");
    Ok(())
}

fn init_logging(config: &LoggingConfig, json_logs: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Invalid log filter")?;
    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json || json_logs {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init()
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).try_init()
    };
    result.context("Failed to initialize logging")
}
