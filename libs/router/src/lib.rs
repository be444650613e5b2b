//! # Universal Router
//!
//! ## Purpose
//!
//! Compares what every protocol generation would pay for a trade and
//! executes the winner. Quotes come from each engine's own read-only
//! pricing; execution re-quotes, enforces deadline and slippage bounds, and
//! runs single or multi-hop swaps all-or-nothing.
//!
//! ## Integration Points
//!
//! - **Input Sources**: [`pools::PoolRegistry`] for venue discovery, pool cells for state
//! - **Settlement**: any [`tokens::TokenLedger`]; the caller approves the router first
//! - **Configuration**: [`dex_config::RouterConfig`] (hop limit)
//!
//! ## Architecture Role
//!
//! ```text
//! get_best_quote ─→ [V1 exchange(s)] ─┐
//!                ─→ [V2 pair]        ─┼─→ largest raw output wins
//!                ─→ [V3 pool per tier]┘
//!
//! swap_exact_in ─→ deadline ─→ re-quote ─→ snapshot pools ─→ hops ─→ slippage ─→ pay out
//!                                              ↑                                  │
//!                                              └────────── restore on error ──────┘
//! ```
//!
//! The native coin takes part only through V1: the router treats the
//! wrapped native token as the native coin on that generation and wraps or
//! unwraps at the exchange boundary.

pub mod execution;
pub mod quote;
pub mod router;

pub use quote::{ExactInput, ExactInputPath, Quote, Venue};
pub use router::UniversalRouter;
