//! V3: concentrated liquidity over tick ranges, one pool per fee tier

mod callback;
mod pool;
mod position;
mod swap;
mod tick;
mod tick_bitmap;

pub use callback::{PayFromAllowance, PayFromBalance, PaymentCallback};
pub use pool::{ConcentratedPool, Slot};
pub use position::{PositionInfo, PositionKey};
pub use swap::{SwapAmount, SwapOutcome, TickCrossing};
pub use tick::{fee_growth_inside, FeeGrowth, TickInfo, TickTable};
pub use tick_bitmap::TickBitmap;
