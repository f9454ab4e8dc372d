//! Simple moving averages, bias ratios and MA trend alignment

use crate::series::{Column, Series};
use crate::Period;

/// Simple moving average of `values` over `window`.
///
/// Index `i` holds the arithmetic mean of `values[i + 1 - window..=i]`;
/// indices before `window - 1` are `None`.
pub fn sma(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }

    for i in (window - 1)..values.len() {
        let sum: f64 = values[i + 1 - window..=i].iter().sum();
        out[i] = Some(sum / window as f64);
    }
    out
}

/// Percentage deviation of `close` from `average`.
///
/// `None` when the average is unavailable or zero.
#[inline]
pub fn bias(close: f64, average: Option<f64>) -> Option<f64> {
    match average {
        Some(ma) if ma != 0.0 => Some((close - ma) / ma * 100.0),
        _ => None,
    }
}

// ============================================================
// TREND ALIGNMENT
// ============================================================

/// Ordering of the fast / mid / slow moving averages on the latest bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendAlignment {
    /// fast > mid > slow
    BullishAlignment,
    /// fast < mid < slow
    BearishAlignment,
    Mixed,
    /// At least one of the three averages is not yet available
    Indeterminate,
}

impl TrendAlignment {
    pub fn as_str(self) -> &'static str {
        match self {
            TrendAlignment::BullishAlignment => "bullish alignment",
            TrendAlignment::BearishAlignment => "bearish alignment",
            TrendAlignment::Mixed => "mixed",
            TrendAlignment::Indeterminate => "indeterminate",
        }
    }
}

pub fn classify_trend(fast: Option<f64>, mid: Option<f64>, slow: Option<f64>) -> TrendAlignment {
    match (fast, mid, slow) {
        (Some(f), Some(m), Some(s)) if f > m && m > s => TrendAlignment::BullishAlignment,
        (Some(f), Some(m), Some(s)) if f < m && m < s => TrendAlignment::BearishAlignment,
        (Some(_), Some(_), Some(_)) => TrendAlignment::Mixed,
        _ => TrendAlignment::Indeterminate,
    }
}

// ============================================================
// STAGE
// ============================================================

/// Moving average and bias columns for one window
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MovingAverageLine {
    pub window: usize,
    pub average: Column,
    pub bias: Column,
}

/// All configured moving average lines, in configuration order
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct MovingAverages {
    lines: Vec<MovingAverageLine>,
}

impl MovingAverages {
    #[inline]
    pub fn lines(&self) -> &[MovingAverageLine] {
        &self.lines
    }

    pub fn get(&self, window: usize) -> Option<&MovingAverageLine> {
        self.lines.iter().find(|l| l.window == window)
    }

    /// Latest value of the average over `window`
    pub fn latest(&self, window: usize) -> Option<f64> {
        self.get(window).and_then(|l| l.average.latest())
    }
}

#[derive(Debug, Clone)]
pub struct MovingAverageStage {
    pub windows: Vec<Period>,
    /// Fast, mid and slow windows used by [`MovingAverageStage::trend`]
    pub trend_windows: [Period; 3],
}

impl Default for MovingAverageStage {
    fn default() -> Self {
        Self {
            windows: vec![
                Period::new_const(5),
                Period::new_const(10),
                Period::new_const(20),
                Period::new_const(60),
            ],
            trend_windows: [
                Period::new_const(5),
                Period::new_const(20),
                Period::new_const(60),
            ],
        }
    }
}

impl MovingAverageStage {
    pub fn compute(&self, series: &Series) -> MovingAverages {
        let closes = series.closes();
        let lines = self
            .windows
            .iter()
            .map(|w| {
                let window = w.get();
                let average = sma(&closes, window);
                let bias_values = closes
                    .iter()
                    .zip(&average)
                    .map(|(&close, &ma)| bias(close, ma))
                    .collect();
                MovingAverageLine {
                    window,
                    average: Column::new("moving_average", average),
                    bias: Column::new("bias", bias_values),
                }
            })
            .collect();

        MovingAverages { lines }
    }

    /// Classify the latest bar by the configured trend windows.
    pub fn trend(&self, averages: &MovingAverages) -> TrendAlignment {
        let [fast, mid, slow] = self.trend_windows;
        classify_trend(
            averages.latest(fast.get()),
            averages.latest(mid.get()),
            averages.latest(slow.get()),
        )
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
    fn test_sma_warmup_and_values() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(out, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_sma_window_longer_than_input() {
        assert_eq!(sma(&[1.0, 2.0], 5), vec![None, None]);
        assert_eq!(sma(&[1.0, 2.0], 0), vec![None, None]);
    }

    #[test]
    fn test_bias() {
        assert_eq!(bias(110.0, Some(100.0)), Some(10.0));
        assert_eq!(bias(90.0, Some(100.0)), Some(-10.0));
        assert_eq!(bias(90.0, Some(0.0)), None);
        assert_eq!(bias(90.0, None), None);
    }

    #[test]
    fn test_classify_trend() {
        assert_eq!(
            classify_trend(Some(3.0), Some(2.0), Some(1.0)),
            TrendAlignment::BullishAlignment
        );
        assert_eq!(
            classify_trend(Some(1.0), Some(2.0), Some(3.0)),
            TrendAlignment::BearishAlignment
        );
        assert_eq!(
            classify_trend(Some(2.0), Some(3.0), Some(1.0)),
            TrendAlignment::Mixed
        );
        // Equality breaks a strict ordering
        assert_eq!(
            classify_trend(Some(2.0), Some(2.0), Some(1.0)),
            TrendAlignment::Mixed
        );
        assert_eq!(
            classify_trend(Some(3.0), Some(2.0), None),
            TrendAlignment::Indeterminate
        );
    }

    #[test]
    fn test_stage_on_uptrend() {
        let closes: Vec<f64> = (1..=70).map(|i| i as f64).collect();
        let series = series_from_closes(&closes);
        let stage = MovingAverageStage::default();
        let mas = stage.compute(&series);

        assert_eq!(mas.lines().len(), 4);
        let ma5 = mas.get(5).unwrap();
        assert_eq!(ma5.average.first_defined(), Some(4));
        assert_eq!(ma5.average.latest(), Some(68.0));
        // close 70 vs MA 68
        let expected_bias = (70.0 - 68.0) / 68.0 * 100.0;
        assert!((ma5.bias.latest().unwrap() - expected_bias).abs() < 1e-12);

        assert_eq!(mas.get(60).unwrap().average.first_defined(), Some(59));
        assert_eq!(stage.trend(&mas), TrendAlignment::BullishAlignment);
    }

    #[test]
    fn test_stage_short_series_is_indeterminate() {
        let closes: Vec<f64> = (1..=30).rev().map(|i| i as f64).collect();
        let series = series_from_closes(&closes);
        let stage = MovingAverageStage::default();
        let mas = stage.compute(&series);

        assert!(mas.latest(20).is_some());
        assert!(mas.latest(60).is_none());
        assert!(mas.get(60).unwrap().bias.latest().is_none());
        assert_eq!(stage.trend(&mas), TrendAlignment::Indeterminate);
    }
}
