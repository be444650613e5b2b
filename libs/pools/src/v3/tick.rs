//! Per-tick liquidity and fee-growth bookkeeping

use amm::liquidity_math::add_delta;
use std::collections::BTreeMap;
use types::{DexError, DexResult, U256};

/// State kept for every initialized tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInfo {
    /// Total liquidity of all positions using this tick as a bound
    pub liquidity_gross: u128,
    /// Liquidity added when the price crosses this tick left to right
    pub liquidity_net: i128,
    /// Fee growth per unit of liquidity on the side away from the current tick
    pub fee_growth_outside0_x128: U256,
    pub fee_growth_outside1_x128: U256,
    pub initialized: bool,
}

/// Fee growth snapshot of the pool at some moment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeGrowth {
    pub global0_x128: U256,
    pub global1_x128: U256,
}

impl TickInfo {
    /// The tick after adding `liquidity_delta` to a position bounded by it
    ///
    /// Returns the new info and whether the tick flipped between
    /// initialized and uninitialized. A newly initialized tick at or below
    /// the current tick assumes all fee growth so far happened below it.
    pub fn updated(
        &self,
        tick: i32,
        tick_current: i32,
        liquidity_delta: i128,
        growth: FeeGrowth,
        upper: bool,
        max_liquidity: u128,
    ) -> DexResult<(TickInfo, bool)> {
        let gross_before = self.liquidity_gross;
        let gross_after = add_delta(gross_before, liquidity_delta)?;
        if gross_after > max_liquidity {
            return Err(DexError::LiquidityOverflow(tick));
        }
        let flipped = (gross_after == 0) != (gross_before == 0);

        let mut next = *self;
        if gross_before == 0 {
            if tick <= tick_current {
                next.fee_growth_outside0_x128 = growth.global0_x128;
                next.fee_growth_outside1_x128 = growth.global1_x128;
            }
            next.initialized = true;
        }
        next.liquidity_gross = gross_after;
        next.liquidity_net = if upper {
            self.liquidity_net.checked_sub(liquidity_delta)
        } else {
            self.liquidity_net.checked_add(liquidity_delta)
        }
        .ok_or(DexError::LiquidityOverflow(tick))?;
        Ok((next, flipped))
    }

    /// Outside fee growth after the price crosses this tick
    pub fn crossed(&self, growth: FeeGrowth) -> (U256, U256) {
        (
            growth.global0_x128.overflowing_sub(self.fee_growth_outside0_x128).0,
            growth.global1_x128.overflowing_sub(self.fee_growth_outside1_x128).0,
        )
    }
}

/// Fee growth per unit of liquidity inside `[lower, upper)`
///
/// Accumulators are modular: only differences between two readings are
/// meaningful.
pub fn fee_growth_inside(
    lower: (&TickInfo, i32),
    upper: (&TickInfo, i32),
    tick_current: i32,
    growth: FeeGrowth,
) -> (U256, U256) {
    let (lower_info, tick_lower) = lower;
    let (upper_info, tick_upper) = upper;

    let (below0, below1) = if tick_current >= tick_lower {
        (lower_info.fee_growth_outside0_x128, lower_info.fee_growth_outside1_x128)
    } else {
        lower_info.crossed(growth)
    };
    let (above0, above1) = if tick_current < tick_upper {
        (upper_info.fee_growth_outside0_x128, upper_info.fee_growth_outside1_x128)
    } else {
        upper_info.crossed(growth)
    };

    (
        growth
            .global0_x128
            .overflowing_sub(below0)
            .0
            .overflowing_sub(above0)
            .0,
        growth
            .global1_x128
            .overflowing_sub(below1)
            .0
            .overflowing_sub(above1)
            .0,
    )
}

/// Initialized ticks of one pool
#[derive(Debug, Clone, Default)]
pub struct TickTable {
    ticks: BTreeMap<i32, TickInfo>,
}

impl TickTable {
    /// Info of `tick`; uninitialized ticks read as all-zero
    pub fn get(&self, tick: i32) -> TickInfo {
        self.ticks.get(&tick).copied().unwrap_or_default()
    }

    pub fn set(&mut self, tick: i32, info: TickInfo) {
        self.ticks.insert(tick, info);
    }

    pub fn clear(&mut self, tick: i32) {
        self.ticks.remove(&tick);
    }

    /// Record a crossing; returns the tick's net liquidity
    pub fn cross(&mut self, tick: i32, outside0: U256, outside1: U256) -> i128 {
        let info = self.ticks.entry(tick).or_default();
        info.fee_growth_outside0_x128 = outside0;
        info.fee_growth_outside1_x128 = outside1;
        info.liquidity_net
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Initialized ticks in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (i32, &TickInfo)> {
        self.ticks.iter().map(|(tick, info)| (*tick, info))
    }

    /// Sum of `liquidity_net` over every tick; zero whenever all
    /// positions are well formed
    pub fn net_liquidity_sum(&self) -> i128 {
        self.ticks.values().map(|info| info.liquidity_net).sum()
    }
}
