//! Stochastic oscillator (RSV, K, D) and RSI
//!
//! The K/D lines follow the smoothing used on Taiwanese brokerage charts:
//!
//! ```text
//! RSV[i] = 100 * (close[i] - lowest_low[i]) / (highest_high[i] - lowest_low[i])
//! K[i]   = 2/3 * K[i-1] + 1/3 * RSV[i]
//! D[i]   = 2/3 * D[i-1] + 1/3 * K[i]
//! ```
//!
//! Both lines are seeded with 50 at the first bar and the recurrence runs over
//! the whole series. RSV is 50 while the window is still filling and whenever
//! the window is flat, so K and D drift from the seed towards real dynamics.

use crate::series::{Column, Series};
use crate::Period;

/// Weight of the previous K/D value in the recurrence
const KD_CARRY: f64 = 2.0 / 3.0;
/// Weight of the new input in the recurrence
const KD_INPUT: f64 = 1.0 / 3.0;

/// RSV used when the window is flat or not yet available
pub const NEUTRAL_RSV: f64 = 50.0;

// ============================================================
// PRIMITIVES
// ============================================================

/// Lowest value over the trailing `window`, `None` until the window is full
pub fn rolling_min(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, f64::INFINITY, f64::min)
}

/// Highest value over the trailing `window`, `None` until the window is full
pub fn rolling_max(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, f64::NEG_INFINITY, f64::max)
}

fn rolling(values: &[f64], window: usize, init: f64, f: fn(f64, f64) -> f64) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }
    for i in (window - 1)..values.len() {
        out[i] = Some(values[i + 1 - window..=i].iter().copied().fold(init, f));
    }
    out
}

/// Raw stochastic value of `close` within `[low, high]`.
///
/// Returns [`NEUTRAL_RSV`] for a flat or unavailable window.
#[inline]
pub fn rsv(close: f64, low: Option<f64>, high: Option<f64>) -> f64 {
    match (low, high) {
        (Some(l), Some(h)) if h != l => 100.0 * (close - l) / (h - l),
        _ => NEUTRAL_RSV,
    }
}

/// Smooth an RSV sequence into the K and D lines.
///
/// A left fold carrying `(prev_k, prev_d)`; index 0 is the seed for both lines
/// whatever `rsv[0]` is.
pub fn smooth_kd(rsv: &[f64], seed: f64) -> (Vec<f64>, Vec<f64>) {
    if rsv.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let tail = rsv.iter().skip(1).scan((seed, seed), |state, &r| {
        let (prev_k, prev_d) = *state;
        let k = KD_CARRY * prev_k + KD_INPUT * r;
        let d = KD_CARRY * prev_d + KD_INPUT * k;
        *state = (k, d);
        Some((k, d))
    });

    std::iter::once((seed, seed)).chain(tail).unzip()
}

/// Simple-average RSI over `period` close-to-close deltas.
///
/// Defined from index `period`. A window without losses saturates at 100.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    // out[i] uses the deltas ending at close[i], i.e. deltas[i - period..i]
    for i in period..closes.len() {
        let window = &deltas[i - period..i];
        let (gain, loss) = window.iter().fold((0.0, 0.0), |(g, l), &d| {
            if d > 0.0 {
                (g + d, l)
            } else {
                (g, l - d)
            }
        });
        let avg_gain = gain / period as f64;
        let avg_loss = loss / period as f64;
        out[i] = Some(rsi_from_averages(avg_gain, avg_loss));
    }
    out
}

#[inline]
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

// ============================================================
// CLASSIFICATION
// ============================================================

/// K/D crossover on the latest bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KdCross {
    GoldenCross,
    DeathCross,
    NoCross,
}

impl KdCross {
    pub fn as_str(self) -> &'static str {
        match self {
            KdCross::GoldenCross => "golden cross",
            KdCross::DeathCross => "death cross",
            KdCross::NoCross => "no cross",
        }
    }
}

/// Strict crossover test; equality on either bar suppresses the signal.
pub fn detect_cross(prev_k: f64, prev_d: f64, k: f64, d: f64) -> KdCross {
    if k > d && prev_k < prev_d {
        KdCross::GoldenCross
    } else if k < d && prev_k > prev_d {
        KdCross::DeathCross
    } else {
        KdCross::NoCross
    }
}

/// Position of an oscillator relative to its thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Overbought,
    Neutral,
    Oversold,
}

impl Band {
    pub fn as_str(self) -> &'static str {
        match self {
            Band::Overbought => "overbought",
            Band::Neutral => "neutral",
            Band::Oversold => "oversold",
        }
    }
}

/// Strict upper/lower thresholds of an oscillator band
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BandThresholds {
    pub overbought: f64,
    pub oversold: f64,
}

impl BandThresholds {
    pub const KD: Self = Self {
        overbought: 80.0,
        oversold: 20.0,
    };
    pub const RSI: Self = Self {
        overbought: 70.0,
        oversold: 30.0,
    };

    pub fn classify(&self, value: f64) -> Band {
        if value > self.overbought {
            Band::Overbought
        } else if value < self.oversold {
            Band::Oversold
        } else {
            Band::Neutral
        }
    }
}

// ============================================================
// STAGE
// ============================================================

/// Stochastic columns; `rsv`, `k` and `d` are defined at every index
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Stochastic {
    pub lowest_low: Column,
    pub highest_high: Column,
    pub rsv: Column,
    pub k: Column,
    pub d: Column,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Oscillators {
    pub stochastic: Stochastic,
    pub rsi: Column,
}

#[derive(Debug, Clone)]
pub struct OscillatorStage {
    pub stochastic_period: Period,
    pub kd_seed: f64,
    pub rsi_period: Period,
    pub k_band: BandThresholds,
    pub rsi_band: BandThresholds,
}

impl Default for OscillatorStage {
    fn default() -> Self {
        Self {
            stochastic_period: Period::new_const(9),
            kd_seed: 50.0,
            rsi_period: Period::new_const(14),
            k_band: BandThresholds::KD,
            rsi_band: BandThresholds::RSI,
        }
    }
}

impl OscillatorStage {
    pub fn compute(&self, series: &Series) -> Oscillators {
        let period = self.stochastic_period.get();
        let closes = series.closes();
        let lowest_low = rolling_min(&series.lows(), period);
        let highest_high = rolling_max(&series.highs(), period);

        let rsv_values: Vec<f64> = closes
            .iter()
            .zip(lowest_low.iter().zip(&highest_high))
            .map(|(&c, (&l, &h))| rsv(c, l, h))
            .collect();
        let (k, d) = smooth_kd(&rsv_values, self.kd_seed);

        Oscillators {
            stochastic: Stochastic {
                lowest_low: Column::new("lowest_low", lowest_low),
                highest_high: Column::new("highest_high", highest_high),
                rsv: Column::dense("rsv", rsv_values),
                k: Column::dense("k", k),
                d: Column::dense("d", d),
            },
            rsi: Column::new("rsi", rsi(&closes, self.rsi_period.get())),
        }
    }
}

// ============================================================
// TESTS
// ============================================================
