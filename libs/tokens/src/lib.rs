//! # Token Ledger
//!
//! The token collaborator the engines settle through: ERC20-style balances,
//! allowances and transfers, the native coin, and the wrapped-native token
//! (WDEX) that lets the router treat the native coin like any other token.
//!
//! Transfers are fallible. Every state-changing call made between
//! [`TokenLedger::checkpoint`] and [`TokenLedger::rollback`] is undone on
//! rollback, which is how an engine or the router reverts a failed
//! operation without leaving partial transfers behind.
//!
//! ```rust
//! use tokens::{atomically, InMemoryLedger, TokenLedger};
//! use types::{Address, TokenError, U256};
//!
//! let mut ledger = InMemoryLedger::new();
//! let usdc = ledger.create_token("USD Coin", "USDC", 6).unwrap();
//! let alice = Address::from_low_u64_be(1);
//! let bob = Address::from_low_u64_be(2);
//! ledger.mint(usdc, alice, U256::from(100u64)).unwrap();
//!
//! let failed: Result<(), TokenError> = atomically(&mut ledger, |l| {
//!     l.transfer(usdc, alice, bob, U256::from(60u64))?;
//!     l.transfer(usdc, alice, bob, U256::from(60u64))
//! });
//! assert!(failed.is_err());
//! assert_eq!(ledger.balance_of(usdc, alice), U256::from(100u64));
//! ```

pub mod ledger;
pub mod memory;

pub use ledger::{atomically, Checkpoint, TokenLedger};
pub use memory::{InMemoryLedger, TokenMetadata};
