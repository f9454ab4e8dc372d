//! Daily bar series and derived indicator columns
//!
//! [`Series::prepare`] is the entry point for every analysis: it orders the raw
//! provider rows by date, drops duplicate days and refuses series too short for
//! any bar-to-bar computation. Indicator stages never reorder or mutate the
//! prepared bars; they produce [`Column`]s aligned index-for-index with them.

use chrono::NaiveDate;

use crate::{AnalysisError, Result, OHLCV};

/// Minimum number of bars needed for any delta / previous-bar computation.
pub const MIN_BARS: usize = 2;

// ============================================================
// BAR
// ============================================================

/// One trading day
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for Bar {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> u64 {
        self.volume
    }
}

// ============================================================
// SERIES
// ============================================================

/// Bars ordered ascending by date, no duplicate dates, at least [`MIN_BARS`] long
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Series {
    bars: Vec<Bar>,
}

impl Series {
    /// Order bars chronologically and drop duplicate dates.
    ///
    /// When a date appears more than once the last occurrence in input order
    /// is kept. Fails with [`AnalysisError::InsufficientData`] when fewer than
    /// [`MIN_BARS`] distinct days remain.
    pub fn prepare<T, I>(bars: I) -> Result<Self>
    where
        T: OHLCV,
        I: IntoIterator<Item = T>,
    {
        let mut rows: Vec<Bar> = bars
            .into_iter()
            .map(|b| Bar::new(b.date(), b.open(), b.high(), b.low(), b.close(), b.volume()))
            .collect();

        // Stable sort keeps input order among equal dates, so the last
        // duplicate stays last within its run.
        rows.sort_by_key(|b| b.date);

        let before = rows.len();
        let mut deduped: Vec<Bar> = Vec::with_capacity(rows.len());
        for bar in rows {
            match deduped.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => deduped.push(bar),
            }
        }
        if deduped.len() < before {
            tracing::warn!(
                dropped = before - deduped.len(),
                "duplicate bar dates in input, keeping the last occurrence"
            );
        }

        if deduped.len() < MIN_BARS {
            return Err(AnalysisError::InsufficientData {
                need: MIN_BARS,
                got: deduped.len(),
            });
        }

        Ok(Self { bars: deduped })
    }

    /// Reject NaN, infinite and non-positive prices.
    ///
    /// The OHLC ordering invariant is not checked.
    pub fn validate(&self) -> Result<()> {
        for (index, bar) in self.bars.iter().enumerate() {
            let prices = [bar.open, bar.high, bar.low, bar.close];
            if prices.iter().any(|p| !p.is_finite()) {
                return Err(AnalysisError::InvalidBar {
                    index,
                    reason: "non-finite price",
                });
            }
            if prices.iter().any(|p| *p <= 0.0) {
                return Err(AnalysisError::InvalidBar {
                    index,
                    reason: "non-positive price",
                });
            }
        }
        Ok(())
    }

    #[inline]
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false for a prepared series; present for API symmetry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Most recent bar
    #[inline]
    pub fn latest(&self) -> &Bar {
        &self.bars[self.bars.len() - 1]
    }

    /// Bar before the most recent one
    #[inline]
    pub fn previous(&self) -> &Bar {
        &self.bars[self.bars.len() - 2]
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }
}

// ============================================================
// COLUMN
// ============================================================

/// A derived indicator column aligned with the series bars.
///
/// `None` marks an index where the indicator window exceeds the available
/// history.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Column {
    name: &'static str,
    values: Vec<Option<f64>>,
}

impl Column {
    pub fn new(name: &'static str, values: Vec<Option<f64>>) -> Self {
        Self { name, values }
    }

    /// Column where every index is defined
    pub fn dense(name: &'static str, values: Vec<f64>) -> Self {
        Self {
            name,
            values: values.into_iter().map(Some).collect(),
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    #[inline]
    pub fn latest(&self) -> Option<f64> {
        self.values.last().copied().flatten()
    }

    #[inline]
    pub fn previous(&self) -> Option<f64> {
        self.values
            .len()
            .checked_sub(2)
            .and_then(|i| self.get(i))
    }

    /// Value at `index`, or [`AnalysisError::IndicatorNotYetAvailable`]
    pub fn require(&self, index: usize) -> Result<f64> {
        self.get(index)
            .ok_or(AnalysisError::IndicatorNotYetAvailable {
                indicator: self.name,
                index,
            })
    }

    /// Index of the first defined value
    pub fn first_defined(&self) -> Option<usize> {
        self.values.iter().position(Option::is_some)
    }
}

// ============================================================
// TESTS
// ============================================================
