//! # Pools - The Three Exchange Engines
//!
//! ## Purpose
//!
//! Stateful AMM engines for each protocol generation, plus the registry
//! that creates them and the store that owns their state:
//!
//! - **V1** [`BondingExchange`]: one token against the native coin, with tradable shares
//! - **V2** [`PairMarket`]: constant-product pair, price oracle, flash swaps, protocol fee
//! - **V3** [`ConcentratedPool`]: liquidity over tick ranges, per-position fee accounting
//!
//! ## Execution Model
//!
//! Every state-changing operation computes its full result against the
//! committed state, then settles through the [`tokens::TokenLedger`] inside
//! a checkpoint, and writes the new pool state only when settlement
//! succeeded. A failed operation leaves both the pool and the ledger as
//! they were.
//!
//! Pools live behind a [`PoolCell`]. Taking the cell's write lock is the
//! reentrancy guard: a callback that tries to enter the same pool again
//! gets [`types::DexError::Locked`]. Quotes read the cell's last committed
//! state and never wait on that lock.
//!
//! ## Integration Points
//!
//! - **Math**: `amm` for all pricing and tick arithmetic
//! - **Configuration**: `dex-config` for fees, tiers and step limits
//! - **Consumers**: the `router` crate and the simulator service

pub mod cell;
pub mod registry;
pub mod shares;
pub mod store;
pub mod v1;
pub mod v2;
pub mod v3;

pub use cell::{PoolCell, PoolGuard};
pub use registry::PoolRegistry;
pub use shares::ShareLedger;
pub use store::{PoolHandle, PoolSnapshot, PoolStore, StoreStats};
pub use v1::{BondingExchange, LiquidityChange};
pub use v2::{Deposit, FeeSwitch, FlashCallback, PairMarket};
pub use v3::{
    ConcentratedPool, PayFromAllowance, PayFromBalance, PaymentCallback, PositionInfo,
    PositionKey, Slot, SwapAmount, SwapOutcome, TickCrossing,
};
