//! Read-only quoting across the three generations

use crate::quote::{Quote, Venue};
use amm::AmmPool;
use dex_config::RouterConfig;
use pools::PoolRegistry;
use std::sync::Arc;
use tracing::debug;
use types::{sort_tokens, Address, DexError, DexResult, ProtocolVersion, U256};

/// Stateless router over one registry
///
/// Holds no balances between calls; during an execution it briefly holds
/// the tokens in flight at its own address.
pub struct UniversalRouter {
    pub(crate) registry: Arc<PoolRegistry>,
    pub(crate) address: Address,
    pub(crate) wrapped_native: Address,
    pub(crate) max_hops: usize,
}

impl UniversalRouter {
    pub fn new(
        registry: Arc<PoolRegistry>,
        address: Address,
        wrapped_native: Address,
        config: &RouterConfig,
    ) -> Self {
        Self {
            registry,
            address,
            wrapped_native,
            max_hops: config.max_hops,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn wrapped_native(&self) -> Address {
        self.wrapped_native
    }

    pub fn registry(&self) -> &PoolRegistry {
        &self.registry
    }

    /// Best output over every version and V3 fee tier
    ///
    /// Raw output amounts are compared as-is; on a tie the earlier
    /// candidate (V1, then V2, then V3 by ascending fee) is kept. Returns
    /// `None` when no venue can fill the trade.
    pub fn get_best_quote(&self, token_in: Address, token_out: Address, amount_in: U256) -> DexResult<Option<Quote>> {
        Ok(best(self.quote_all(token_in, token_out, amount_in)?))
    }

    /// Best output on a single version
    pub fn quote_version(
        &self,
        version: ProtocolVersion,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> DexResult<Option<Quote>> {
        validate(token_in, token_out, amount_in)?;
        Ok(best(self.candidates(version, token_in, token_out, amount_in)?))
    }

    /// Every venue able to fill the trade, in comparison order
    pub fn quote_all(&self, token_in: Address, token_out: Address, amount_in: U256) -> DexResult<Vec<Quote>> {
        validate(token_in, token_out, amount_in)?;
        let mut quotes = Vec::new();
        for version in ProtocolVersion::ALL {
            quotes.extend(self.candidates(version, token_in, token_out, amount_in)?);
        }
        Ok(quotes)
    }

    /// Best venue for each hop of `path`, feeding each output into the next hop
    ///
    /// `None` when any hop has no venue.
    pub fn quote_path(&self, path: &[Address], amount_in: U256) -> DexResult<Option<Vec<Quote>>> {
        self.check_path(path)?;
        let mut hops = Vec::with_capacity(path.len() - 1);
        let mut amount = amount_in;
        for window in path.windows(2) {
            match self.get_best_quote(window[0], window[1], amount)? {
                Some(quote) => {
                    amount = quote.amount_out;
                    hops.push(quote);
                }
                None => return Ok(None),
            }
        }
        Ok(Some(hops))
    }

    pub(crate) fn check_path(&self, path: &[Address]) -> DexResult<()> {
        if path.len() < 2 {
            return Err(DexError::InvalidInput("path needs at least two tokens"));
        }
        let hops = path.len() - 1;
        if hops > self.max_hops {
            return Err(DexError::PathTooLong {
                hops,
                max: self.max_hops,
            });
        }
        Ok(())
    }

    fn candidates(
        &self,
        version: ProtocolVersion,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> DexResult<Vec<Quote>> {
        let found: Vec<(Venue, U256)> = match version {
            ProtocolVersion::V1 => self.v1_candidate(token_in, token_out, amount_in)?.into_iter().collect(),
            ProtocolVersion::V2 => self.v2_candidate(token_in, token_out, amount_in)?.into_iter().collect(),
            ProtocolVersion::V3 => self.v3_candidates(token_in, token_out, amount_in)?,
        };
        Ok(found
            .into_iter()
            .map(|(venue, amount_out)| Quote {
                version,
                token_in,
                token_out,
                amount_in,
                amount_out,
                venue,
            })
            .collect())
    }

    /// V1 treats the wrapped native token as the native coin
    fn v1_candidate(&self, token_in: Address, token_out: Address, amount_in: U256) -> DexResult<Option<(Venue, U256)>> {
        let registry = &self.registry;
        if token_in == self.wrapped_native {
            let Some(cell) = registry.exchange_cell(token_out) else {
                return Ok(None);
            };
            let venue = Venue::V1NativeToToken {
                exchange: cell.address(),
            };
            let out = cell.read().native_to_token_input_price(amount_in);
            return usable(venue, out);
        }

        if token_out == self.wrapped_native {
            let Some(cell) = registry.exchange_cell(token_in) else {
                return Ok(None);
            };
            let venue = Venue::V1TokenToNative {
                exchange: cell.address(),
            };
            let out = cell.read().token_to_native_input_price(amount_in);
            return usable(venue, out);
        }

        let (Some(sell), Some(buy)) = (registry.exchange_cell(token_in), registry.exchange_cell(token_out)) else {
            return Ok(None);
        };
        let venue = Venue::V1TokenToToken {
            sell: sell.address(),
            buy: buy.address(),
        };
        let out = sell
            .read()
            .token_to_native_input_price(amount_in)
            .and_then(|native| buy.read().native_to_token_input_price(native));
        usable(venue, out)
    }

    fn v2_candidate(&self, token_in: Address, token_out: Address, amount_in: U256) -> DexResult<Option<(Venue, U256)>> {
        let Some(cell) = self.registry.pair_cell(token_in, token_out) else {
            return Ok(None);
        };
        let venue = Venue::V2Pair { pair: cell.address() };
        let out = cell.read().quote_exact_in(token_in, amount_in);
        usable(venue, out)
    }

    fn v3_candidates(&self, token_in: Address, token_out: Address, amount_in: U256) -> DexResult<Vec<(Venue, U256)>> {
        let mut found = Vec::new();
        for (fee, _) in self.registry.fee_tiers() {
            let Some(cell) = self.registry.pool_cell(token_in, token_out, fee) else {
                continue;
            };
            let venue = Venue::V3Pool {
                pool: cell.address(),
                fee,
            };
            let out = cell.read().quote_exact_in(token_in, amount_in);
            found.extend(usable(venue, out)?);
        }
        Ok(found)
    }
}

fn validate(token_in: Address, token_out: Address, amount_in: U256) -> DexResult<()> {
    sort_tokens(token_in, token_out)?;
    if amount_in.is_zero() {
        return Err(DexError::InvalidInput("zero amount"));
    }
    Ok(())
}

/// Skip venues that exist but cannot fill the trade
fn usable(venue: Venue, out: DexResult<U256>) -> DexResult<Option<(Venue, U256)>> {
    match out {
        Ok(amount_out) if amount_out.is_zero() => Ok(None),
        Ok(amount_out) => {
            debug!(?venue, %amount_out, "candidate quote");
            Ok(Some((venue, amount_out)))
        }
        Err(e) if e.is_liquidity_shortfall() => {
            debug!(?venue, error = %e, "venue skipped");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Strictly greater output wins
fn best(quotes: Vec<Quote>) -> Option<Quote> {
    quotes.into_iter().fold(None, |best, quote| match best {
        Some(current) if current.amount_out >= quote.amount_out => Some(current),
        _ => Some(quote),
    })
}
