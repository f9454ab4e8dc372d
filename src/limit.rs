//! Daily price-limit band for the next session
//!
//! The exchange caps a session's move at a fixed percentage of the previous
//! close, rounded to the tick grid. The tick is looked up from the raw scaled
//! price, not from the previous close: crossing a price tier changes the
//! rounding unit. Limit-up rounds down and limit-down rounds up, so the band
//! never exceeds the nominal percentage. Below the smallest tick the grid has
//! no point between the reference and its limit; the limit is then the
//! reference itself.

use crate::{AnalysisError, Result};

/// Tolerance when snapping a tick count to an integer
const TICK_SNAP: f64 = 1e-9;

/// One tier of a tick schedule: prices strictly below `below` use `tick`
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TickTier {
    pub below: f64,
    pub tick: f64,
}

impl TickTier {
    pub const fn new(below: f64, tick: f64) -> Self {
        Self { below, tick }
    }
}

/// Price → minimum increment table
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TickSchedule {
    tiers: Vec<TickTier>,
    /// Tick for prices at or above the last tier bound
    top_tick: f64,
}

impl Default for TickSchedule {
    fn default() -> Self {
        Self::standard()
    }
}

impl TickSchedule {
    /// Build a schedule, validating tiers are ascending with positive ticks.
    pub fn new(tiers: Vec<TickTier>, top_tick: f64) -> Result<Self> {
        let schedule = Self { tiers, top_tick };
        schedule.validate()?;
        Ok(schedule)
    }

    /// `<10→0.01, <50→0.05, <100→0.1, <500→0.5, <1000→1, ≥1000→5`
    pub fn standard() -> Self {
        Self {
            tiers: vec![
                TickTier::new(10.0, 0.01),
                TickTier::new(50.0, 0.05),
                TickTier::new(100.0, 0.1),
                TickTier::new(500.0, 0.5),
                TickTier::new(1000.0, 1.0),
            ],
            top_tick: 5.0,
        }
    }

    /// Variant with a single `≥500→1` top tier
    pub fn collapsed_top() -> Self {
        Self {
            tiers: vec![
                TickTier::new(10.0, 0.01),
                TickTier::new(50.0, 0.05),
                TickTier::new(100.0, 0.1),
                TickTier::new(500.0, 0.5),
            ],
            top_tick: 1.0,
        }
    }

    pub fn tiers(&self) -> &[TickTier] {
        &self.tiers
    }

    pub fn top_tick(&self) -> f64 {
        self.top_tick
    }

    /// Tick size at `price`
    pub fn tick_for(&self, price: f64) -> f64 {
        self.tiers
            .iter()
            .find(|t| price < t.below)
            .map_or(self.top_tick, |t| t.tick)
    }

    pub fn validate(&self) -> Result<()> {
        let valid_tick = |t: f64| t.is_finite() && t > 0.0;
        if !valid_tick(self.top_tick) {
            return Err(AnalysisError::InvalidConfig(format!(
                "top tick must be positive, got {}",
                self.top_tick
            )));
        }
        let mut last_bound = 0.0;
        for tier in &self.tiers {
            if !valid_tick(tier.tick) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "tick below {} must be positive, got {}",
                    tier.below, tier.tick
                )));
            }
            if !tier.below.is_finite() || tier.below <= last_bound {
                return Err(AnalysisError::InvalidConfig(format!(
                    "tier bounds must be ascending, got {} after {}",
                    tier.below, last_bound
                )));
            }
            last_bound = tier.below;
        }
        Ok(())
    }
}

/// Number of decimals needed to print `tick` exactly (ticks are 10^-k multiples)
fn tick_decimals(tick: f64) -> i32 {
    let mut decimals = 0;
    let mut scaled = tick;
    while decimals < 8 && (scaled - scaled.round()).abs() > TICK_SNAP {
        scaled *= 10.0;
        decimals += 1;
    }
    decimals
}

fn round_to_decimals(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Largest tick multiple not above `raw`
fn floor_to_tick(raw: f64, tick: f64) -> f64 {
    let units = (raw / tick + TICK_SNAP).floor();
    round_to_decimals(units * tick, tick_decimals(tick))
}

/// Smallest tick multiple not below `raw`
fn ceil_to_tick(raw: f64, tick: f64) -> f64 {
    let units = (raw / tick - TICK_SNAP).ceil();
    round_to_decimals(units * tick, tick_decimals(tick))
}

/// Limit band for the session following `reference`
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PriceLimitBand {
    /// Close the band is derived from
    pub reference: f64,
    pub limit_up: f64,
    pub limit_down: f64,
}

#[derive(Debug, Clone)]
pub struct LimitStage {
    pub schedule: TickSchedule,
    /// Maximum daily move as a fraction of the reference close
    pub limit_ratio: f64,
}

impl Default for LimitStage {
    fn default() -> Self {
        Self {
            schedule: TickSchedule::standard(),
            limit_ratio: 0.10,
        }
    }
}

impl LimitStage {
    pub fn compute(&self, prev_close: f64) -> Result<PriceLimitBand> {
        if !prev_close.is_finite() || prev_close <= 0.0 {
            return Err(AnalysisError::InvalidValue(
                "previous close must be positive and finite",
            ));
        }

        let raw_up = prev_close * (1.0 + self.limit_ratio);
        let raw_down = prev_close * (1.0 - self.limit_ratio);
        let limit_up = floor_to_tick(raw_up, self.schedule.tick_for(raw_up));
        let limit_down = ceil_to_tick(raw_down, self.schedule.tick_for(raw_down));

        Ok(PriceLimitBand {
            reference: prev_close,
            limit_up: limit_up.max(prev_close),
            limit_down: limit_down.min(prev_close),
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.schedule.validate()?;
        if !(self.limit_ratio > 0.0 && self.limit_ratio < 1.0) {
            return Err(AnalysisError::OutOfRange {
                field: "limit_ratio",
                value: self.limit_ratio,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(())
    }
}

// ============================================================
// TESTS
// ============================================================
