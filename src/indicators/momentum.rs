//! MACD: fast/slow EMAs, DIF, signal line and histogram
//!
//! EMAs are unadjusted and seeded with the first input:
//! `EMA[0] = x[0]`, `EMA[i] = a * x[i] + (1 - a) * EMA[i-1]`, `a = 2 / (span + 1)`.
//! The recurrences run from the first bar, but a value is only reported once
//! its span worth of history exists.

use crate::series::{Column, Series};
use crate::Period;

/// Exponential moving average with `a = 2 / (span + 1)`, seeded with `values[0]`
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut iter = values.iter();
    if let Some(&first) = iter.next() {
        out.push(first);
        iter.fold(first, |prev, &x| {
            let next = alpha * x + (1.0 - alpha) * prev;
            out.push(next);
            next
        });
    }
    out
}

/// Hide values before `first_index`
fn mask_warmup(name: &'static str, values: &[f64], first_index: usize) -> Column {
    Column::new(
        name,
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| (i >= first_index).then_some(v))
            .collect(),
    )
}

/// Histogram sign change between the last two bars
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacdTransition {
    /// Negative to non-negative
    TurnedBullish,
    /// Non-negative to negative
    TurnedBearish,
    NoTransition,
}

impl MacdTransition {
    pub fn as_str(self) -> &'static str {
        match self {
            MacdTransition::TurnedBullish => "turned bullish",
            MacdTransition::TurnedBearish => "turned bearish",
            MacdTransition::NoTransition => "no transition",
        }
    }
}

pub fn detect_transition(prev_histogram: f64, histogram: f64) -> MacdTransition {
    if prev_histogram < 0.0 && histogram >= 0.0 {
        MacdTransition::TurnedBullish
    } else if prev_histogram >= 0.0 && histogram < 0.0 {
        MacdTransition::TurnedBearish
    } else {
        MacdTransition::NoTransition
    }
}

/// MACD columns, aligned with the series.
///
/// Every column is `None` until its own warm-up completes, not only the signal
/// and histogram: the fast EMA from `fast - 1`, the slow EMA and DIF from
/// `slow - 1`, the signal and histogram from `slow + signal - 2`. With the
/// default 12/26/9 spans a 20-bar series reports `dif: None`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Macd {
    pub fast: Column,
    pub slow: Column,
    pub dif: Column,
    pub signal: Column,
    pub histogram: Column,
}

#[derive(Debug, Clone)]
pub struct MomentumStage {
    pub fast_span: Period,
    pub slow_span: Period,
    pub signal_span: Period,
}

impl Default for MomentumStage {
    fn default() -> Self {
        Self {
            fast_span: Period::new_const(12),
            slow_span: Period::new_const(26),
            signal_span: Period::new_const(9),
        }
    }
}

impl MomentumStage {
    pub fn compute(&self, series: &Series) -> Macd {
        let closes = series.closes();
        let fast_span = self.fast_span.get();
        let slow_span = self.slow_span.get();
        let signal_span = self.signal_span.get();

        let fast = ema(&closes, fast_span);
        let slow = ema(&closes, slow_span);
        let dif: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal = ema(&dif, signal_span);
        let histogram: Vec<f64> = dif.iter().zip(&signal).map(|(d, s)| d - s).collect();

        let dif_ready = fast_span.max(slow_span) - 1;
        let signal_ready = dif_ready + signal_span - 1;

        Macd {
            fast: mask_warmup("ema_fast", &fast, fast_span - 1),
            slow: mask_warmup("ema_slow", &slow, slow_span - 1),
            dif: mask_warmup("dif", &dif, dif_ready),
            signal: mask_warmup("macd_signal", &signal, signal_ready),
            histogram: mask_warmup("macd_histogram", &histogram, signal_ready),
        }
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Bar;
    use chrono::{Days, NaiveDate};

    fn series_from_closes(closes: &[f64]) -> Series {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = closes.iter().enumerate().map(|(i, &c)| {
            Bar::new(start + Days::new(i as u64), c, c + 1.0, c - 1.0, c, 100)
        });
        Series::prepare(bars).unwrap()
    }

    #[test]
    fn test_ema_seed_and_recurrence() {
        let out = ema(&[10.0, 13.0, 16.0], 2);
        // alpha = 2/3
        assert_eq!(out[0], 10.0);
        assert!((out[1] - 12.0).abs() < 1e-12);
        assert!((out[2] - 14.666_666_666_666_666).abs() < 1e-9);
        assert!(ema(&[], 12).is_empty());
    }

    #[test]
    fn test_ema_constant_input() {
        let out = ema(&[5.0; 30], 26);
        assert!(out.iter().all(|&v| (v - 5.0).abs() < 1e-12));
    }

    #[test]
    fn test_detect_transition() {
        assert_eq!(detect_transition(-0.5, 0.0), MacdTransition::TurnedBullish);
        assert_eq!(detect_transition(-0.5, 0.3), MacdTransition::TurnedBullish);
        assert_eq!(detect_transition(0.0, -0.1), MacdTransition::TurnedBearish);
        assert_eq!(detect_transition(0.2, 0.1), MacdTransition::NoTransition);
        assert_eq!(detect_transition(-0.2, -0.1), MacdTransition::NoTransition);
    }

    #[test]
    fn test_warmup_masks() {
        let closes: Vec<f64> = (0..40).map(|i| 50.0 + (i as f64 * 0.7).sin()).collect();
        let macd = MomentumStage::default().compute(&series_from_closes(&closes));

        assert_eq!(macd.fast.first_defined(), Some(11));
        assert_eq!(macd.slow.first_defined(), Some(25));
        assert_eq!(macd.dif.first_defined(), Some(25));
        assert_eq!(macd.signal.first_defined(), Some(33));
        assert_eq!(macd.histogram.first_defined(), Some(33));
    }

    #[test]
    fn test_short_series_has_no_signal() {
        let closes: Vec<f64> = (0..8).map(|i| 20.0 + i as f64).collect();
        let stage = MomentumStage::default();
        let macd = stage.compute(&series_from_closes(&closes));
        assert!(macd.signal.latest().is_none());
        assert!(macd.histogram.latest().is_none());
        assert!(macd.dif.latest().is_none());
        assert!(macd.histogram.previous().is_none());
    }

    #[test]
    fn test_dif_matches_ema_difference() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let macd = MomentumStage::default().compute(&series_from_closes(&closes));
        let fast = ema(&closes, 12);
        let slow = ema(&closes, 26);
        let last = closes.len() - 1;
        assert!((macd.dif.latest().unwrap() - (fast[last] - slow[last])).abs() < 1e-12);
        // Rising prices keep the fast EMA above the slow one
        assert!(macd.dif.latest().unwrap() > 0.0);
    }

    #[test]
    fn test_transition_after_reversal() {
        // Long decline drives the histogram negative; a strong rally flips it.
        let mut closes: Vec<f64> = (0..50).map(|i| 200.0 - i as f64).collect();
        let stage = MomentumStage::default();
        let before = stage.compute(&series_from_closes(&closes));
        assert!(before.histogram.latest().unwrap() < 0.0);

        let mut flipped = None;
        for step in 1..=30 {
            closes.push(151.0 + step as f64 * 4.0);
            let macd = stage.compute(&series_from_closes(&closes));
            let (prev, curr) = (macd.histogram.previous(), macd.histogram.latest());
            if detect_transition(prev.unwrap(), curr.unwrap()) == MacdTransition::TurnedBullish {
                flipped = Some(step);
                break;
            }
        }
        assert!(flipped.is_some());
    }
}
