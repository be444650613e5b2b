//! Liquidity-share bookkeeping of a single pool

use std::collections::HashMap;
use types::{Address, DexError, DexResult, U256};

/// Fungible claim on a pool's reserves
#[derive(Debug, Clone, Default)]
pub struct ShareLedger {
    balances: HashMap<Address, U256>,
    total_supply: U256,
}

impl ShareLedger {
    pub fn balance_of(&self, owner: Address) -> U256 {
        self.balances.get(&owner).copied().unwrap_or_default()
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    /// Fails without side effects if `owner` holds fewer than `amount`
    pub fn ensure_balance(&self, owner: Address, amount: U256) -> DexResult<()> {
        let available = self.balance_of(owner);
        if available < amount {
            return Err(DexError::InsufficientShares {
                owner,
                needed: amount,
                available,
            });
        }
        Ok(())
    }

    pub fn mint(&mut self, to: Address, amount: U256) -> DexResult<()> {
        let total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(DexError::ArithmeticOverflow)?;
        self.total_supply = total_supply;
        *self.balances.entry(to).or_default() += amount;
        Ok(())
    }

    pub fn burn(&mut self, from: Address, amount: U256) -> DexResult<()> {
        self.ensure_balance(from, amount)?;
        self.debit(from, amount);
        self.total_supply -= amount;
        Ok(())
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> DexResult<()> {
        self.ensure_balance(from, amount)?;
        self.debit(from, amount);
        *self.balances.entry(to).or_default() += amount;
        Ok(())
    }

    fn debit(&mut self, from: Address, amount: U256) {
        let remaining = self.balance_of(from) - amount;
        if remaining.is_zero() {
            self.balances.remove(&from);
        } else {
            self.balances.insert(from, remaining);
        }
    }
}
