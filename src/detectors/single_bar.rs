//! Single-bar candlestick detectors: Doji, Hammer / Hanging Man

use super::helpers::{self, is_doji, is_lower_shadow_long, is_upper_shadow_short};
use super::{CandlePattern, PatternDetector};
use crate::{AnalysisError, OHLCVExt, Ratio, Result, OHLCV};

// ============================================================
// DOJI
// ============================================================

/// Doji: the body is at most `doji_ratio` of the bar's range
#[derive(Debug, Clone, Copy)]
pub struct DojiDetector {
    pub doji_ratio: Ratio,
}

impl Default for DojiDetector {
    fn default() -> Self {
        Self {
            doji_ratio: Ratio::new_const(helpers::DOJI_RATIO),
        }
    }
}

impl PatternDetector for DojiDetector {
    fn detect<T: OHLCV>(&self, _prev: &T, curr: &T) -> Option<CandlePattern> {
        is_doji(curr.body(), curr.range(), self.doji_ratio.get()).then_some(CandlePattern::Doji)
    }
}

// ============================================================
// HAMMER FAMILY
// ============================================================

/// Hammer / Hanging Man: long lower shadow, short upper shadow.
///
/// The same shape is reported as [`CandlePattern::HangingMan`] on a down bar
/// and [`CandlePattern::Hammer`] otherwise.
#[derive(Debug, Clone, Copy)]
pub struct HammerDetector {
    pub lower_shadow_factor: f64,
    pub upper_shadow_factor: f64,
}

impl Default for HammerDetector {
    fn default() -> Self {
        Self {
            lower_shadow_factor: helpers::LOWER_SHADOW_FACTOR,
            upper_shadow_factor: helpers::UPPER_SHADOW_FACTOR,
        }
    }
}

impl PatternDetector for HammerDetector {
    fn detect<T: OHLCV>(&self, _prev: &T, curr: &T) -> Option<CandlePattern> {
        let body = curr.body();
        if curr.range() <= 0.0 {
            return None;
        }
        if !is_lower_shadow_long(curr.lower_shadow(), body, self.lower_shadow_factor) {
            return None;
        }
        if !is_upper_shadow_short(curr.upper_shadow(), body, self.upper_shadow_factor) {
            return None;
        }

        Some(if curr.is_down() {
            CandlePattern::HangingMan
        } else {
            CandlePattern::Hammer
        })
    }

    fn validate_config(&self) -> Result<()> {
        for (field, value) in [
            ("lower_shadow_factor", self.lower_shadow_factor),
            ("upper_shadow_factor", self.upper_shadow_factor),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{field} must be positive and finite, got {value}"
                )));
            }
        }
        Ok(())
    }
}

// ============================================================
// TESTS
// ============================================================
