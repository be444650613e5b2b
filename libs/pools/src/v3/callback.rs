//! How a caller pays a concentrated pool
//!
//! `mint` and `swap` compute what is owed, hand control to a
//! [`PaymentCallback`], and then check the pool's own balances. Whatever
//! the callback does is irrelevant as long as the balance increased by at
//! least the owed amount.

use tokens::TokenLedger;
use types::{Address, DexError, DexResult, U256};

pub trait PaymentCallback {
    /// Deliver `amount` of `token` to `pool`
    fn pay(&mut self, ledger: &mut dyn TokenLedger, pool: Address, token: Address, amount: U256) -> DexResult<()>;
}

/// Pays from `payer`'s own balance; for accounts that act for themselves
/// (the router settling hops with tokens it already holds)
#[derive(Debug, Clone, Copy)]
pub struct PayFromBalance {
    pub payer: Address,
}

impl PaymentCallback for PayFromBalance {
    fn pay(&mut self, ledger: &mut dyn TokenLedger, pool: Address, token: Address, amount: U256) -> DexResult<()> {
        ledger.transfer(token, self.payer, pool, amount)?;
        Ok(())
    }
}

/// Pulls from `payer` using the allowance `payer` granted to the pool
#[derive(Debug, Clone, Copy)]
pub struct PayFromAllowance {
    pub payer: Address,
}

impl PaymentCallback for PayFromAllowance {
    fn pay(&mut self, ledger: &mut dyn TokenLedger, pool: Address, token: Address, amount: U256) -> DexResult<()> {
        ledger.transfer_from(token, pool, self.payer, pool, amount)?;
        Ok(())
    }
}

/// Run `payer` and verify that `pool`'s balance of `token` grew by `owed`
pub(super) fn collect_payment(
    ledger: &mut dyn TokenLedger,
    payer: &mut dyn PaymentCallback,
    pool: Address,
    token: Address,
    owed: U256,
) -> DexResult<()> {
    if owed.is_zero() {
        return Ok(());
    }
    let before = ledger.balance_of(token, pool);
    payer.pay(ledger, pool, token, owed)?;
    let received = ledger.balance_of(token, pool).saturating_sub(before);
    if received < owed {
        return Err(DexError::InsufficientPayment {
            token,
            owed,
            received,
        });
    }
    Ok(())
}
