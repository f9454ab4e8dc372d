//! Analysis result handed to the presentation layer

use chrono::NaiveDate;

use crate::detectors::CandlePattern;
use crate::indicators::{Band, KdCross, MacdTransition, TrendAlignment};
use crate::limit::PriceLimitBand;
use crate::score::{FlowScore, InstitutionalFlow, ValuationScore};
use crate::valuation::ValuationDiagnostics;

/// Output section that depends on an external input which may be missing
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Availability<T> {
    Available(T),
    Unavailable { reason: String },
}

impl<T> Availability<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Availability::Unavailable {
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available(_))
    }

    pub fn as_ref(&self) -> Availability<&T> {
        match self {
            Availability::Available(v) => Availability::Available(v),
            Availability::Unavailable { reason } => Availability::Unavailable {
                reason: reason.clone(),
            },
        }
    }

    pub fn available(self) -> Option<T> {
        match self {
            Availability::Available(v) => Some(v),
            Availability::Unavailable { .. } => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Availability<U> {
        match self {
            Availability::Available(v) => Availability::Available(f(v)),
            Availability::Unavailable { reason } => Availability::Unavailable { reason },
        }
    }
}

impl<T> From<Option<T>> for Availability<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or_else(|| Availability::unavailable("not found"), Availability::Available)
    }
}

/// Latest price and change against the previous close
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Quote {
    pub price: f64,
    pub previous_close: f64,
    pub change: f64,
    /// `None` when the previous close is zero
    pub change_percent: Option<f64>,
    /// `price` came from a manual override rather than the latest close
    pub overridden: bool,
}

impl Quote {
    pub fn new(price: f64, previous_close: f64, overridden: bool) -> Self {
        let change = price - previous_close;
        Self {
            price,
            previous_close,
            change,
            change_percent: (previous_close != 0.0).then(|| change / previous_close * 100.0),
            overridden,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct MovingAverageReading {
    pub window: usize,
    pub value: Option<f64>,
    pub bias: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct OscillatorReading {
    pub rsv: f64,
    pub k: f64,
    pub d: f64,
    pub k_band: Band,
    pub cross: KdCross,
    pub rsi: Option<f64>,
    pub rsi_band: Option<Band>,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct MacdReading {
    pub dif: Option<f64>,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
    pub transition: MacdTransition,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct FlowReading {
    pub flow: InstitutionalFlow,
    pub score: FlowScore,
}

/// Everything computed for one ticker on one run
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Report {
    /// Date of the latest bar
    pub as_of: NaiveDate,
    pub quote: Quote,
    pub limits: PriceLimitBand,
    pub moving_averages: Vec<MovingAverageReading>,
    pub trend: TrendAlignment,
    pub oscillator: OscillatorReading,
    pub macd: MacdReading,
    pub patterns: Vec<CandlePattern>,
    pub valuation: Availability<ValuationScore>,
    pub flow: Availability<FlowReading>,
    pub valuation_history: Availability<ValuationDiagnostics>,
}

impl Report {
    pub fn moving_average(&self, window: usize) -> Option<&MovingAverageReading> {
        self.moving_averages.iter().find(|m| m.window == window)
    }
}
