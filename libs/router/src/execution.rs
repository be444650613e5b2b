//! Atomic swap execution
//!
//! The router pulls the caller's input to its own address, runs each hop
//! with itself as trader, and pays the final output to the recipient. The
//! whole call runs inside one ledger checkpoint; every pool it touches is
//! snapshotted first and restored if any step fails, so a failing hop
//! undoes the hops before it.

use crate::quote::{ExactInput, ExactInputPath, Quote, Venue};
use crate::router::UniversalRouter;
use pools::{PayFromBalance, PoolHandle, SwapAmount};
use tokens::{atomically, TokenLedger};
use tracing::{info, warn};
use types::{Address, CallContext, DexError, DexResult, U256};

impl UniversalRouter {
    /// Swap exactly `amount_in` for at least `min_amount_out`
    ///
    /// The venue is chosen by a fresh quote at execution time, restricted
    /// to `params.version` when set. The caller must have approved the
    /// router for `amount_in` of `token_in`.
    pub fn swap_exact_in(
        &self,
        ledger: &mut dyn TokenLedger,
        ctx: &CallContext,
        params: &ExactInput,
    ) -> DexResult<U256> {
        check_deadline(ctx, params.deadline)?;
        let quote = match params.version {
            Some(version) => self.quote_version(version, params.token_in, params.token_out, params.amount_in)?,
            None => self.get_best_quote(params.token_in, params.token_out, params.amount_in)?,
        }
        .ok_or(DexError::NoRoute)?;

        let amount_out = self.settle(ledger, ctx, &[quote], params.amount_in, params.min_amount_out, params.recipient)?;
        info!(
            sender = ?ctx.sender,
            version = %quote.version,
            venue = ?quote.venue,
            amount_in = %params.amount_in,
            %amount_out,
            "router swap"
        );
        Ok(amount_out)
    }

    /// Swap along `params.path`, best venue per hop, all hops or none
    pub fn swap_exact_in_path(
        &self,
        ledger: &mut dyn TokenLedger,
        ctx: &CallContext,
        params: &ExactInputPath,
    ) -> DexResult<U256> {
        check_deadline(ctx, params.deadline)?;
        let hops = self
            .quote_path(&params.path, params.amount_in)?
            .ok_or(DexError::NoRoute)?;

        let amount_out = self.settle(ledger, ctx, &hops, params.amount_in, params.min_amount_out, params.recipient)?;
        info!(
            sender = ?ctx.sender,
            hops = hops.len(),
            amount_in = %params.amount_in,
            %amount_out,
            "router path swap"
        );
        Ok(amount_out)
    }

    fn settle(
        &self,
        ledger: &mut dyn TokenLedger,
        ctx: &CallContext,
        hops: &[Quote],
        amount_in: U256,
        min_amount_out: U256,
        recipient: Address,
    ) -> DexResult<U256> {
        let (Some(first), Some(last)) = (hops.first(), hops.last()) else {
            return Err(DexError::NoRoute);
        };
        let (token_in, token_out) = (first.token_in, last.token_out);

        let handles = self.touched_pools(hops)?;
        let snapshots = handles
            .iter()
            .map(PoolHandle::snapshot)
            .collect::<DexResult<Vec<_>>>()?;

        let router = self.address;
        let result = atomically(ledger, |l| -> DexResult<U256> {
            l.transfer_from(token_in, router, ctx.sender, router, amount_in)?;
            let mut amount = amount_in;
            for hop in hops {
                amount = self.execute_hop(l, ctx, hop, amount)?;
            }
            if amount < min_amount_out {
                warn!(amount_out = %amount, minimum = %min_amount_out, "router slippage exceeded");
                return Err(DexError::SlippageExceeded {
                    amount_out: amount,
                    minimum: min_amount_out,
                });
            }
            l.transfer(token_out, router, recipient, amount)?;
            Ok(amount)
        });

        if result.is_err() {
            for (handle, snapshot) in handles.iter().zip(snapshots) {
                handle.restore(snapshot)?;
            }
        }
        result
    }

    fn execute_hop(
        &self,
        ledger: &mut dyn TokenLedger,
        ctx: &CallContext,
        hop: &Quote,
        amount_in: U256,
    ) -> DexResult<U256> {
        let router = self.address;
        let as_router = ctx.with_sender(router);
        let deadline = ctx.timestamp;
        let store = self.registry.store();

        match hop.venue {
            Venue::V1NativeToToken { exchange } => {
                let cell = store.exchange(&exchange).ok_or(DexError::PoolNotFound(exchange))?;
                let mut exchange = cell.lock()?;
                ledger.unwrap_native(router, amount_in)?;
                exchange.native_to_token_swap_input(ledger, &as_router, amount_in, U256::one(), deadline, router)
            }
            Venue::V1TokenToNative { exchange } => {
                let cell = store.exchange(&exchange).ok_or(DexError::PoolNotFound(exchange))?;
                let mut exchange = cell.lock()?;
                ledger.approve(hop.token_in, router, cell.address(), amount_in)?;
                let native = exchange.token_to_native_swap_input(ledger, &as_router, amount_in, U256::one(), deadline, router)?;
                ledger.wrap_native(router, native)?;
                Ok(native)
            }
            Venue::V1TokenToToken { sell, buy } => {
                let sell_cell = store.exchange(&sell).ok_or(DexError::PoolNotFound(sell))?;
                let buy_cell = store.exchange(&buy).ok_or(DexError::PoolNotFound(buy))?;
                ledger.approve(hop.token_in, router, sell, amount_in)?;
                let native = sell_cell.lock()?.token_to_native_swap_input(
                    ledger,
                    &as_router,
                    amount_in,
                    U256::one(),
                    deadline,
                    router,
                )?;
                let bought = buy_cell
                    .lock()?
                    .native_to_token_swap_input(ledger, &as_router, native, U256::one(), deadline, router);
                bought
            }
            Venue::V2Pair { pair } => {
                let cell = store.pair(&pair).ok_or(DexError::PoolNotFound(pair))?;
                let mut market = cell.lock()?;
                let amount_out = market.get_amount_out(hop.token_in, amount_in)?;
                ledger.transfer(hop.token_in, router, pair, amount_in)?;
                let (amount0_out, amount1_out) = if hop.token_in == market.token0() {
                    (U256::zero(), amount_out)
                } else {
                    (amount_out, U256::zero())
                };
                market.swap(ledger, &as_router, amount0_out, amount1_out, router, None)?;
                Ok(amount_out)
            }
            Venue::V3Pool { pool, .. } => {
                let cell = store.pool(&pool).ok_or(DexError::PoolNotFound(pool))?;
                let mut market = cell.lock()?;
                let zero_for_one = hop.token_in == market.token0();
                let mut payer = PayFromBalance { payer: router };
                let outcome = market.swap(
                    ledger,
                    &as_router,
                    router,
                    zero_for_one,
                    SwapAmount::ExactIn(amount_in),
                    None,
                    &mut payer,
                )?;
                if !outcome.amount_remaining.is_zero() {
                    return Err(DexError::InsufficientLiquidity);
                }
                Ok(outcome.amount_out)
            }
        }
    }

    /// Handles of every distinct pool the hops touch
    fn touched_pools(&self, hops: &[Quote]) -> DexResult<Vec<PoolHandle>> {
        let mut seen: Vec<Address> = Vec::new();
        let mut handles = Vec::new();
        for address in hops.iter().flat_map(|hop| hop.venue.pools()) {
            if seen.contains(&address) {
                continue;
            }
            let handle = self
                .registry
                .handle(&address)
                .ok_or(DexError::PoolNotFound(address))?;
            seen.push(address);
            handles.push(handle);
        }
        Ok(handles)
    }
}

fn check_deadline(ctx: &CallContext, deadline: u64) -> DexResult<()> {
    ctx.ensure_deadline(deadline).inspect_err(|_| {
        warn!(deadline, now = ctx.timestamp, "router call past deadline");
    })
}
