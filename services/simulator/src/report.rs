//! Quote comparison and trade execution against a seeded market

use crate::seed::{Market, GENESIS_TIMESTAMP, WRAPPED_NATIVE};
use crate::units::to_base_units;
use crate::{log_success, log_swap};
use anyhow::{Context, Result};
use router::{ExactInput, Quote, Venue};
use rust_decimal::Decimal;
use serde::Serialize;
use tokens::TokenLedger;
use types::{derive_address, CallContext, ProtocolVersion, BPS_DENOMINATOR, U256};

/// Seconds a simulated trade stays valid
const TRADE_DEADLINE_SECS: u64 = 60;

/// One venue's answer to a trade
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateReport {
    pub version: ProtocolVersion,
    pub version_id: u8,
    pub venue: Venue,
    pub amount_out: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteReport {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: Decimal,
    pub candidates: Vec<CandidateReport>,
    pub best: Option<CandidateReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapReport {
    pub quote: QuoteReport,
    pub min_amount_out: Decimal,
    pub amount_out: Decimal,
}

/// Every venue's quote for selling `amount` of `from` into `to`
pub fn quote_report(market: &Market, from: &str, to: &str, amount: Decimal) -> Result<QuoteReport> {
    let (token_in, decimals_in) = market.token(from)?;
    let (token_out, _) = market.token(to)?;
    let amount_in = to_base_units(amount, decimals_in)?;

    let quotes = market
        .router
        .quote_all(token_in, token_out, amount_in)
        .with_context(|| format!("Failed to quote {from} -> {to}"))?;
    let best = market.router.get_best_quote(token_in, token_out, amount_in)?;

    let candidates = quotes
        .iter()
        .map(|quote| candidate(market, to, quote))
        .collect::<Result<Vec<_>>>()?;
    for entry in &candidates {
        log_swap!("{} {} {} -> {} {} via {:?}", entry.version, amount, from, entry.amount_out, to, entry.venue);
    }

    Ok(QuoteReport {
        token_in: from.to_string(),
        token_out: to.to_string(),
        amount_in: amount,
        candidates,
        best: best.map(|quote| candidate(market, to, &quote)).transpose()?,
    })
}

/// Fund a fresh trader with `amount` of `from` and sell it through the router
///
/// The minimum output is the best quote less `slippage_bps`.
pub fn execute_trade(
    market: &mut Market,
    from: &str,
    to: &str,
    amount: Decimal,
    slippage_bps: u32,
) -> Result<SwapReport> {
    let report = quote_report(market, from, to, amount)?;
    let (token_in, decimals_in) = market.token(from)?;
    let (token_out, _) = market.token(to)?;
    let amount_in = to_base_units(amount, decimals_in)?;
    let best = market
        .router
        .get_best_quote(token_in, token_out, amount_in)?
        .with_context(|| format!("No venue can fill {from} -> {to}"))?;
    let min_amount_out = best.amount_out * U256::from(BPS_DENOMINATOR.saturating_sub(slippage_bps))
        / U256::from(BPS_DENOMINATOR);

    let trader = derive_address(b"dex-trader", &[]);
    if from == WRAPPED_NATIVE {
        market.ledger.mint_native(trader, amount_in)?;
        market.ledger.wrap_native(trader, amount_in)?;
    } else {
        market.ledger.mint(token_in, trader, amount_in)?;
    }
    let router_address = market.router.address();
    market.ledger.approve(token_in, trader, router_address, amount_in)?;

    let ctx = CallContext::new(trader, GENESIS_TIMESTAMP);
    let params = ExactInput {
        token_in,
        token_out,
        amount_in,
        min_amount_out,
        recipient: trader,
        deadline: GENESIS_TIMESTAMP + TRADE_DEADLINE_SECS,
        version: None,
    };
    let amount_out = market
        .router
        .swap_exact_in(&mut market.ledger, &ctx, &params)
        .with_context(|| format!("Swap {from} -> {to} failed"))?;

    let amount_out = market.display_amount(to, amount_out)?;
    log_success!("Sold {} {} for {} {} on {}", amount, from, amount_out, to, best.version);
    Ok(SwapReport {
        quote: report,
        min_amount_out: market.display_amount(to, min_amount_out)?,
        amount_out,
    })
}

fn candidate(market: &Market, to: &str, quote: &Quote) -> Result<CandidateReport> {
    Ok(CandidateReport {
        version: quote.version,
        version_id: quote.version_id(),
        venue: quote.venue,
        amount_out: market.display_amount(to, quote.amount_out)?,
    })
}
