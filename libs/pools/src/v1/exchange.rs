//! Bonding-curve exchange between the native coin and one token
//!
//! Reserves are tracked by the exchange itself and move only together with
//! the matching ledger transfers. Every operation computes its full result
//! first, settles through the ledger inside a checkpoint, and writes the new
//! reserves last, so a failed transfer leaves the exchange untouched.

use crate::shares::ShareLedger;
use amm::{AmmPool, ReservePair, V2Math};
use tokens::{atomically, TokenLedger};
use tracing::{debug, info};
use types::{
    Address, CallContext, DexError, DexResult, ProtocolVersion, U256, NATIVE_COIN,
};

/// Result of a liquidity deposit or withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityChange {
    pub shares: U256,
    pub native_amount: U256,
    pub token_amount: U256,
}

/// One V1 exchange (native coin ⇄ `token`)
#[derive(Debug, Clone)]
pub struct BondingExchange {
    address: Address,
    token: Address,
    native_reserve: U256,
    token_reserve: U256,
    shares: ShareLedger,
    fee_bps: u32,
}

impl BondingExchange {
    pub fn new(address: Address, token: Address, fee_bps: u32) -> Self {
        Self {
            address,
            token,
            native_reserve: U256::zero(),
            token_reserve: U256::zero(),
            shares: ShareLedger::default(),
            fee_bps,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn fee_bps(&self) -> u32 {
        self.fee_bps
    }

    /// `(native_reserve, token_reserve)`
    pub fn reserves(&self) -> (U256, U256) {
        (self.native_reserve, self.token_reserve)
    }

    /// No liquidity has been provided (or all of it was withdrawn)
    pub fn is_empty(&self) -> bool {
        self.shares.total_supply().is_zero()
    }

    pub fn shares_of(&self, owner: Address) -> U256 {
        self.shares.balance_of(owner)
    }

    pub fn total_shares(&self) -> U256 {
        self.shares.total_supply()
    }

    /// Pricing view with the native coin as token0
    pub fn pricing(&self) -> ReservePair {
        ReservePair {
            version: ProtocolVersion::V1,
            token0: NATIVE_COIN,
            token1: self.token,
            reserve0: self.native_reserve,
            reserve1: self.token_reserve,
            fee_bps: self.fee_bps,
        }
    }

    // ---- price queries ----

    /// Tokens received for selling `native_sold`
    pub fn native_to_token_input_price(&self, native_sold: U256) -> DexResult<U256> {
        self.ensure_active()?;
        ensure_nonzero(native_sold)?;
        V2Math::get_amount_out(native_sold, self.native_reserve, self.token_reserve, self.fee_bps)
    }

    /// Native coin required to buy exactly `tokens_bought`
    pub fn native_to_token_output_price(&self, tokens_bought: U256) -> DexResult<U256> {
        self.ensure_active()?;
        ensure_nonzero(tokens_bought)?;
        V2Math::get_amount_in(tokens_bought, self.native_reserve, self.token_reserve, self.fee_bps)
    }

    /// Native coin received for selling `tokens_sold`
    pub fn token_to_native_input_price(&self, tokens_sold: U256) -> DexResult<U256> {
        self.ensure_active()?;
        ensure_nonzero(tokens_sold)?;
        V2Math::get_amount_out(tokens_sold, self.token_reserve, self.native_reserve, self.fee_bps)
    }

    /// Tokens required to buy exactly `native_bought`
    pub fn token_to_native_output_price(&self, native_bought: U256) -> DexResult<U256> {
        self.ensure_active()?;
        ensure_nonzero(native_bought)?;
        V2Math::get_amount_in(native_bought, self.token_reserve, self.native_reserve, self.fee_bps)
    }

    // ---- liquidity ----

    /// Deposit native coin and tokens from `ctx.sender`
    ///
    /// The first deposit sets the price and mints shares equal to the native
    /// amount. Later deposits take `native * token_reserve / native_reserve + 1`
    /// tokens, which must not exceed `max_tokens`.
    pub fn add_liquidity(
        &mut self,
        ledger: &mut dyn TokenLedger,
        ctx: &CallContext,
        native_amount: U256,
        max_tokens: U256,
        min_shares: U256,
        deadline: u64,
    ) -> DexResult<LiquidityChange> {
        ctx.ensure_deadline(deadline)?;
        ensure_nonzero(native_amount)?;
        ensure_nonzero(max_tokens)?;

        let total = self.shares.total_supply();
        let (token_amount, minted) = if total.is_zero() {
            (max_tokens, native_amount)
        } else {
            let token_amount = amm::FullMath::mul_div(native_amount, self.token_reserve, self.native_reserve)?
                .checked_add(U256::one())
                .ok_or(DexError::ArithmeticOverflow)?;
            if token_amount > max_tokens {
                return Err(DexError::ExcessiveInputAmount {
                    required: token_amount,
                    maximum: max_tokens,
                });
            }
            let minted = amm::FullMath::mul_div(native_amount, total, self.native_reserve)?;
            (token_amount, minted)
        };
        if minted.is_zero() || minted < min_shares {
            return Err(DexError::InsufficientLiquidityMinted);
        }

        let native_reserve = checked_add(self.native_reserve, native_amount)?;
        let token_reserve = checked_add(self.token_reserve, token_amount)?;

        let (exchange, token) = (self.address, self.token);
        atomically(ledger, |l| -> DexResult<()> {
            l.transfer_native(ctx.sender, exchange, native_amount)?;
            l.transfer_from(token, exchange, ctx.sender, exchange, token_amount)?;
            Ok(())
        })?;

        self.shares.mint(ctx.sender, minted)?;
        self.native_reserve = native_reserve;
        self.token_reserve = token_reserve;

        info!(
            exchange = ?self.address,
            provider = ?ctx.sender,
            %native_amount,
            %token_amount,
            shares = %minted,
            "V1 liquidity added"
        );
        Ok(LiquidityChange {
            shares: minted,
            native_amount,
            token_amount,
        })
    }

    /// Burn `shares` of `ctx.sender` for a proportional slice of both reserves
    pub fn remove_liquidity(
        &mut self,
        ledger: &mut dyn TokenLedger,
        ctx: &CallContext,
        shares: U256,
        min_native: U256,
        min_tokens: U256,
        deadline: u64,
    ) -> DexResult<LiquidityChange> {
        ctx.ensure_deadline(deadline)?;
        ensure_nonzero(shares)?;
        self.ensure_active()?;
        self.shares.ensure_balance(ctx.sender, shares)?;

        let total = self.shares.total_supply();
        let native_amount = amm::FullMath::mul_div(shares, self.native_reserve, total)?;
        let token_amount = amm::FullMath::mul_div(shares, self.token_reserve, total)?;
        ensure_minimum(native_amount, min_native)?;
        ensure_minimum(token_amount, min_tokens)?;

        let (exchange, token) = (self.address, self.token);
        atomically(ledger, |l| -> DexResult<()> {
            l.transfer_native(exchange, ctx.sender, native_amount)?;
            l.transfer(token, exchange, ctx.sender, token_amount)?;
            Ok(())
        })?;

        self.shares.burn(ctx.sender, shares)?;
        self.native_reserve -= native_amount;
        self.token_reserve -= token_amount;

        info!(
            exchange = ?self.address,
            provider = ?ctx.sender,
            %native_amount,
            %token_amount,
            %shares,
            "V1 liquidity removed"
        );
        Ok(LiquidityChange {
            shares,
            native_amount,
            token_amount,
        })
    }

    // ---- swaps ----

    /// Sell exactly `native_sold` of `ctx.sender`'s native coin, tokens to `recipient`
    pub fn native_to_token_swap_input(
        &mut self,
        ledger: &mut dyn TokenLedger,
        ctx: &CallContext,
        native_sold: U256,
        min_tokens: U256,
        deadline: u64,
        recipient: Address,
    ) -> DexResult<U256> {
        ctx.ensure_deadline(deadline)?;
        let tokens_bought = self.native_to_token_input_price(native_sold)?;
        ensure_minimum(tokens_bought, min_tokens)?;
        self.settle_native_to_token(ledger, ctx, native_sold, tokens_bought, recipient)?;
        Ok(tokens_bought)
    }

    /// Buy exactly `tokens_bought`, spending at most `max_native`; returns native sold
    pub fn native_to_token_swap_output(
        &mut self,
        ledger: &mut dyn TokenLedger,
        ctx: &CallContext,
        tokens_bought: U256,
        max_native: U256,
        deadline: u64,
        recipient: Address,
    ) -> DexResult<U256> {
        ctx.ensure_deadline(deadline)?;
        let native_sold = self.native_to_token_output_price(tokens_bought)?;
        ensure_maximum(native_sold, max_native)?;
        self.settle_native_to_token(ledger, ctx, native_sold, tokens_bought, recipient)?;
        Ok(native_sold)
    }

    /// Sell exactly `tokens_sold` of `ctx.sender`'s tokens, native coin to `recipient`
    pub fn token_to_native_swap_input(
        &mut self,
        ledger: &mut dyn TokenLedger,
        ctx: &CallContext,
        tokens_sold: U256,
        min_native: U256,
        deadline: u64,
        recipient: Address,
    ) -> DexResult<U256> {
        ctx.ensure_deadline(deadline)?;
        let native_bought = self.token_to_native_input_price(tokens_sold)?;
        ensure_minimum(native_bought, min_native)?;
        self.settle_token_to_native(ledger, ctx, tokens_sold, native_bought, recipient)?;
        Ok(native_bought)
    }

    /// Buy exactly `native_bought`, spending at most `max_tokens`; returns tokens sold
    pub fn token_to_native_swap_output(
        &mut self,
        ledger: &mut dyn TokenLedger,
        ctx: &CallContext,
        native_bought: U256,
        max_tokens: U256,
        deadline: u64,
        recipient: Address,
    ) -> DexResult<U256> {
        ctx.ensure_deadline(deadline)?;
        let tokens_sold = self.token_to_native_output_price(native_bought)?;
        ensure_maximum(tokens_sold, max_tokens)?;
        self.settle_token_to_native(ledger, ctx, tokens_sold, native_bought, recipient)?;
        Ok(tokens_sold)
    }

    fn settle_native_to_token(
        &mut self,
        ledger: &mut dyn TokenLedger,
        ctx: &CallContext,
        native_in: U256,
        tokens_out: U256,
        recipient: Address,
    ) -> DexResult<()> {
        let native_reserve = checked_add(self.native_reserve, native_in)?;
        let token_reserve = self.token_reserve - tokens_out;
        ensure_product_not_decreased(
            (self.native_reserve, self.token_reserve),
            (native_reserve, token_reserve),
        )?;

        let (exchange, token) = (self.address, self.token);
        atomically(ledger, |l| -> DexResult<()> {
            l.transfer_native(ctx.sender, exchange, native_in)?;
            l.transfer(token, exchange, recipient, tokens_out)?;
            Ok(())
        })?;

        self.native_reserve = native_reserve;
        self.token_reserve = token_reserve;
        debug!(exchange = ?self.address, %native_in, %tokens_out, "V1 native -> token");
        Ok(())
    }

    fn settle_token_to_native(
        &mut self,
        ledger: &mut dyn TokenLedger,
        ctx: &CallContext,
        tokens_in: U256,
        native_out: U256,
        recipient: Address,
    ) -> DexResult<()> {
        let token_reserve = checked_add(self.token_reserve, tokens_in)?;
        let native_reserve = self.native_reserve - native_out;
        ensure_product_not_decreased(
            (self.native_reserve, self.token_reserve),
            (native_reserve, token_reserve),
        )?;

        let (exchange, token) = (self.address, self.token);
        atomically(ledger, |l| -> DexResult<()> {
            l.transfer_from(token, exchange, ctx.sender, exchange, tokens_in)?;
            l.transfer_native(exchange, recipient, native_out)?;
            Ok(())
        })?;

        self.native_reserve = native_reserve;
        self.token_reserve = token_reserve;
        debug!(exchange = ?self.address, %tokens_in, %native_out, "V1 token -> native");
        Ok(())
    }

    fn ensure_active(&self) -> DexResult<()> {
        if self.is_empty() || self.native_reserve.is_zero() || self.token_reserve.is_zero() {
            return Err(DexError::InsufficientLiquidity);
        }
        Ok(())
    }
}

impl AmmPool for BondingExchange {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V1
    }

    fn quote_exact_in(&self, token_in: Address, amount_in: U256) -> DexResult<U256> {
        if token_in == NATIVE_COIN {
            self.native_to_token_input_price(amount_in)
        } else if token_in == self.token {
            self.token_to_native_input_price(amount_in)
        } else {
            Err(DexError::InvalidInput("token is not part of this exchange"))
        }
    }

    fn quote_exact_out(&self, token_out: Address, amount_out: U256) -> DexResult<U256> {
        if token_out == self.token {
            self.native_to_token_output_price(amount_out)
        } else if token_out == NATIVE_COIN {
            self.token_to_native_output_price(amount_out)
        } else {
            Err(DexError::InvalidInput("token is not part of this exchange"))
        }
    }

    fn fee_pips(&self) -> u32 {
        self.pricing().fee_pips()
    }
}

fn ensure_nonzero(amount: U256) -> DexResult<()> {
    if amount.is_zero() {
        return Err(DexError::InvalidInput("zero amount"));
    }
    Ok(())
}

fn ensure_minimum(amount: U256, minimum: U256) -> DexResult<()> {
    if amount < minimum {
        return Err(DexError::InsufficientOutputAmount { amount, minimum });
    }
    Ok(())
}

fn ensure_maximum(required: U256, maximum: U256) -> DexResult<()> {
    if required > maximum {
        return Err(DexError::ExcessiveInputAmount { required, maximum });
    }
    Ok(())
}

fn checked_add(a: U256, b: U256) -> DexResult<U256> {
    a.checked_add(b).ok_or(DexError::ArithmeticOverflow)
}

fn ensure_product_not_decreased(before: (U256, U256), after: (U256, U256)) -> DexResult<()> {
    if after.0.full_mul(after.1) < before.0.full_mul(before.1) {
        return Err(DexError::InvariantViolation("V1 reserve product decreased"));
    }
    Ok(())
}
