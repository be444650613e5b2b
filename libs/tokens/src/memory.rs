//! In-memory ledger with an undo journal
//!
//! Changes are journaled only while at least one checkpoint is open; the
//! journal is discarded when the outermost checkpoint commits.

use crate::ledger::{Checkpoint, TokenLedger};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};
use types::{derive_address, Address, TokenError, U256};

/// Descriptive fields of a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone)]
struct TokenState {
    metadata: TokenMetadata,
    total_supply: U256,
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
}

#[derive(Debug, Clone)]
enum JournalEntry {
    Balance {
        token: Address,
        owner: Address,
        previous: U256,
    },
    Allowance {
        token: Address,
        owner: Address,
        spender: Address,
        previous: U256,
    },
    Supply {
        token: Address,
        previous: U256,
    },
    Native {
        owner: Address,
        previous: U256,
    },
}

/// Reference token ledger used by tests and the simulator
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    tokens: HashMap<Address, TokenState>,
    symbols: HashMap<String, Address>,
    native: HashMap<Address, U256>,
    wrapped_native: Option<Address>,
    journal: Vec<JournalEntry>,
    depth: usize,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token at the address derived from its symbol
    pub fn create_token(
        &mut self,
        name: &str,
        symbol: &str,
        decimals: u8,
    ) -> Result<Address, TokenError> {
        let address = derive_address(b"token", &[symbol.as_bytes()]);
        self.register_token(
            address,
            TokenMetadata {
                name: name.to_string(),
                symbol: symbol.to_string(),
                decimals,
            },
        )?;
        Ok(address)
    }

    /// Register a token at a caller-chosen address
    pub fn register_token(
        &mut self,
        address: Address,
        metadata: TokenMetadata,
    ) -> Result<(), TokenError> {
        if address.is_zero() {
            return Err(TokenError::ZeroTokenAddress);
        }
        if self.tokens.contains_key(&address) {
            return Err(TokenError::AlreadyRegistered(address));
        }
        debug!(token = ?address, symbol = %metadata.symbol, decimals = metadata.decimals, "token registered");
        self.symbols.insert(metadata.symbol.clone(), address);
        self.tokens.insert(
            address,
            TokenState {
                metadata,
                total_supply: U256::zero(),
                balances: HashMap::new(),
                allowances: HashMap::new(),
            },
        );
        Ok(())
    }

    /// Register the wrapped native token (18 decimals, like the native coin)
    pub fn create_wrapped_native(&mut self, name: &str, symbol: &str) -> Result<Address, TokenError> {
        let address = self.create_token(name, symbol, 18)?;
        self.wrapped_native = Some(address);
        Ok(address)
    }

    pub fn metadata(&self, token: Address) -> Option<&TokenMetadata> {
        self.tokens.get(&token).map(|state| &state.metadata)
    }

    pub fn token_by_symbol(&self, symbol: &str) -> Option<Address> {
        self.symbols.get(symbol).copied()
    }

    /// Faucet: create `amount` of `token` out of thin air
    pub fn mint(&mut self, token: Address, to: Address, amount: U256) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::TransferToZero);
        }
        let supply = self.token(token)?.total_supply;
        let new_supply = supply
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow(token))?;
        let balance = self.balance_of(token, to);
        self.set_supply(token, new_supply);
        self.set_balance(token, to, balance + amount);
        Ok(())
    }

    /// Faucet for the native coin
    pub fn mint_native(&mut self, to: Address, amount: U256) -> Result<(), TokenError> {
        let balance = self.native_balance_of(to);
        let new_balance = balance
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow(to))?;
        self.set_native(to, new_balance);
        Ok(())
    }

    /// Number of entries that a rollback would currently undo
    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    fn token(&self, token: Address) -> Result<&TokenState, TokenError> {
        self.tokens.get(&token).ok_or(TokenError::UnknownToken(token))
    }

    fn token_mut(&mut self, token: Address) -> Result<&mut TokenState, TokenError> {
        self.tokens.get_mut(&token).ok_or(TokenError::UnknownToken(token))
    }

    fn record(&mut self, entry: JournalEntry) {
        if self.depth > 0 {
            self.journal.push(entry);
        }
    }

    // setters assume the token exists; callers check first
    fn set_balance(&mut self, token: Address, owner: Address, value: U256) {
        let previous = self.balance_of(token, owner);
        self.record(JournalEntry::Balance {
            token,
            owner,
            previous,
        });
        if let Some(state) = self.tokens.get_mut(&token) {
            state.balances.insert(owner, value);
        }
    }

    fn set_allowance(&mut self, token: Address, owner: Address, spender: Address, value: U256) {
        let previous = self.allowance(token, owner, spender);
        self.record(JournalEntry::Allowance {
            token,
            owner,
            spender,
            previous,
        });
        if let Some(state) = self.tokens.get_mut(&token) {
            state.allowances.insert((owner, spender), value);
        }
    }

    fn set_supply(&mut self, token: Address, value: U256) {
        let previous = self.total_supply(token);
        self.record(JournalEntry::Supply { token, previous });
        if let Some(state) = self.tokens.get_mut(&token) {
            state.total_supply = value;
        }
    }

    fn set_native(&mut self, owner: Address, value: U256) {
        let previous = self.native_balance_of(owner);
        self.record(JournalEntry::Native { owner, previous });
        self.native.insert(owner, value);
    }

    fn debit(&mut self, token: Address, owner: Address, amount: U256) -> Result<(), TokenError> {
        let available = self.token(token)?.balances.get(&owner).copied().unwrap_or_default();
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                token,
                owner,
                needed: amount,
                available,
            });
        }
        self.set_balance(token, owner, available - amount);
        Ok(())
    }

    fn credit(&mut self, token: Address, owner: Address, amount: U256) -> Result<(), TokenError> {
        let balance = self.token(token)?.balances.get(&owner).copied().unwrap_or_default();
        // bounded by total supply, which already fits in U256
        self.set_balance(token, owner, balance + amount);
        Ok(())
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::Balance {
                token,
                owner,
                previous,
            } => {
                if let Ok(state) = self.token_mut(token) {
                    state.balances.insert(owner, previous);
                }
            }
            JournalEntry::Allowance {
                token,
                owner,
                spender,
                previous,
            } => {
                if let Ok(state) = self.token_mut(token) {
                    state.allowances.insert((owner, spender), previous);
                }
            }
            JournalEntry::Supply { token, previous } => {
                if let Ok(state) = self.token_mut(token) {
                    state.total_supply = previous;
                }
            }
            JournalEntry::Native { owner, previous } => {
                self.native.insert(owner, previous);
            }
        }
    }
}

impl TokenLedger for InMemoryLedger {
    fn balance_of(&self, token: Address, owner: Address) -> U256 {
        self.tokens
            .get(&token)
            .and_then(|state| state.balances.get(&owner))
            .copied()
            .unwrap_or_default()
    }

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.tokens
            .get(&token)
            .and_then(|state| state.allowances.get(&(owner, spender)))
            .copied()
            .unwrap_or_default()
    }

    fn total_supply(&self, token: Address) -> U256 {
        self.tokens
            .get(&token)
            .map(|state| state.total_supply)
            .unwrap_or_default()
    }

    fn native_balance_of(&self, owner: Address) -> U256 {
        self.native.get(&owner).copied().unwrap_or_default()
    }

    fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::TransferToZero);
        }
        self.debit(token, from, amount)?;
        self.credit(token, to, amount)?;
        trace!(token = ?token, from = ?from, to = ?to, %amount, "transfer");
        Ok(())
    }

    fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError> {
        self.token(token)?;
        let allowed = self.allowance(token, from, spender);
        if allowed < amount {
            return Err(TokenError::InsufficientAllowance {
                token,
                owner: from,
                spender,
                needed: amount,
                allowed,
            });
        }
        self.transfer(token, from, to, amount)?;
        // an unlimited approval is never decremented
        if allowed != U256::MAX {
            self.set_allowance(token, from, spender, allowed - amount);
        }
        Ok(())
    }

    fn approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), TokenError> {
        self.token(token)?;
        self.set_allowance(token, owner, spender, amount);
        Ok(())
    }

    fn transfer_native(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::TransferToZero);
        }
        let available = self.native_balance_of(from);
        if available < amount {
            return Err(TokenError::InsufficientNative {
                owner: from,
                needed: amount,
                available,
            });
        }
        self.set_native(from, available - amount);
        let balance = self.native_balance_of(to);
        self.set_native(to, balance + amount);
        trace!(from = ?from, to = ?to, %amount, "native transfer");
        Ok(())
    }

    fn wrapped_native(&self) -> Result<Address, TokenError> {
        self.wrapped_native.ok_or(TokenError::NoWrappedNative)
    }

    fn wrap_native(&mut self, owner: Address, amount: U256) -> Result<(), TokenError> {
        let wrapped = self.wrapped_native()?;
        self.transfer_native(owner, wrapped, amount)?;
        self.mint(wrapped, owner, amount)
    }

    fn unwrap_native(&mut self, owner: Address, amount: U256) -> Result<(), TokenError> {
        let wrapped = self.wrapped_native()?;
        self.debit(wrapped, owner, amount)?;
        let supply = self.total_supply(wrapped);
        self.set_supply(wrapped, supply - amount);
        self.transfer_native(wrapped, owner, amount)
    }

    fn checkpoint(&mut self) -> Checkpoint {
        let checkpoint = Checkpoint {
            journal_len: self.journal.len(),
            depth: self.depth,
        };
        self.depth += 1;
        checkpoint
    }

    fn commit(&mut self, checkpoint: Checkpoint) {
        self.depth = checkpoint.depth;
        if self.depth == 0 {
            self.journal.clear();
        }
    }

    fn rollback(&mut self, checkpoint: Checkpoint) {
        while self.journal.len() > checkpoint.journal_len {
            if let Some(entry) = self.journal.pop() {
                self.undo(entry);
            }
        }
        self.depth = checkpoint.depth;
        if self.depth == 0 {
            self.journal.clear();
        }
    }
}
