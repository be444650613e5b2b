//! # DEX Market Simulator
//!
//! ## Purpose
//!
//! Stands up a complete in-memory market (tokens, V1 exchanges, V2 pairs and
//! V3 pools seeded at reference prices) and drives the universal router
//! against it, so quotes across the three generations can be compared from
//! the command line.
//!
//! ## Integration Points
//!
//! - **Configuration**: [`dex_config::ExchangeConfig`] (fees, enabled tiers, router limits, logging)
//! - **Venues**: [`pools::PoolRegistry`] over a [`tokens::InMemoryLedger`]
//! - **Output**: JSON summaries on stdout, emoji-tagged tracing on stderr

pub mod logging;
pub mod report;
pub mod seed;
pub mod units;

pub use report::{execute_trade, quote_report, CandidateReport, QuoteReport, SwapReport};
pub use seed::{seed_market, Market, MarketSummary, TokenSpec, VenueSummary, TOKEN_PLAN, V3_PLAN};
