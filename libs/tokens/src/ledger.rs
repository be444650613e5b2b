//! Token collaborator contract

use types::{Address, TokenError, U256};

/// Position in a ledger's undo journal
///
/// Returned by [`TokenLedger::checkpoint`] and consumed exactly once by
/// either [`TokenLedger::commit`] or [`TokenLedger::rollback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Checkpoint {
    pub(crate) journal_len: usize,
    pub(crate) depth: usize,
}

/// Balances, allowances and transfers of every token plus the native coin
pub trait TokenLedger {
    /// Balance of `owner`; unknown tokens report zero
    fn balance_of(&self, token: Address, owner: Address) -> U256;

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256;

    fn total_supply(&self, token: Address) -> U256;

    fn native_balance_of(&self, owner: Address) -> U256;

    /// Move `amount` of `token` from `from` to `to`
    fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError>;

    /// Move `amount` on behalf of `from`, spending `spender`'s allowance
    fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError>;

    fn approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), TokenError>;

    fn transfer_native(&mut self, from: Address, to: Address, amount: U256)
        -> Result<(), TokenError>;

    /// Address of the wrapped native token
    fn wrapped_native(&self) -> Result<Address, TokenError>;

    /// Deposit native coin from `owner` and credit the same amount of wrapped token
    fn wrap_native(&mut self, owner: Address, amount: U256) -> Result<(), TokenError>;

    /// Burn wrapped token from `owner` and release the same amount of native coin
    fn unwrap_native(&mut self, owner: Address, amount: U256) -> Result<(), TokenError>;

    /// Open a (possibly nested) all-or-nothing scope
    fn checkpoint(&mut self) -> Checkpoint;

    /// Keep every change made since `checkpoint`
    fn commit(&mut self, checkpoint: Checkpoint);

    /// Undo every change made since `checkpoint`
    fn rollback(&mut self, checkpoint: Checkpoint);
}

/// Run `f` inside a checkpoint: commit on `Ok`, roll back on `Err`
pub fn atomically<T, E, F>(ledger: &mut dyn TokenLedger, f: F) -> Result<T, E>
where
    F: FnOnce(&mut dyn TokenLedger) -> Result<T, E>,
{
    let checkpoint = ledger.checkpoint();
    match f(ledger) {
        Ok(value) => {
            ledger.commit(checkpoint);
            Ok(value)
        }
        Err(err) => {
            ledger.rollback(checkpoint);
            Err(err)
        }
    }
}
