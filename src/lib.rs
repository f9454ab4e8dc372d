//! # twsignal - technical signals for Taiwan-listed equities
//!
//! A deterministic engine that turns a daily OHLC series for one ticker into
//! moving averages, bias ratios, a 9-day stochastic (RSV/K/D), RSI, MACD,
//! candlestick patterns, the next session's price-limit band and a scored
//! recommendation.
//!
//! ## Quick Start
//!
//! ```rust
//! use twsignal::prelude::*;
//! use chrono::{Days, NaiveDate};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
//! let bars: Vec<Bar> = (0..90)
//!     .map(|i| {
//!         let c = 20.0 + (i as f64 * 0.3).sin();
//!         Bar::new(start + Days::new(i), c - 0.1, c + 0.3, c - 0.3, c, 10_000)
//!     })
//!     .collect();
//!
//! let engine = EngineBuilder::new().build().unwrap();
//! let input = AnalysisInput::new().with_nav(26.5);
//! let report = engine.analyze(bars, &input).unwrap();
//!
//! println!("{} limit-up {}", report.as_of, report.limits.limit_up);
//! ```
//!
//! Data fetching lives behind the traits in [`provider`]; [`analyzer::Analyzer`]
//! wires providers to the engine.

pub mod analyzer;
pub mod config;
pub mod detectors;
pub mod indicators;
pub mod limit;
pub mod provider;
pub mod report;
pub mod score;
pub mod series;
pub mod valuation;

pub mod prelude {
    pub use crate::{
        // Orchestration
        analyzer::{AnalysisRequest, Analyzer},
        // Config
        config::EngineConfig,
        // Detectors
        detectors::{CandlePattern, PatternDetector, PatternStage},
        // Indicators
        indicators::{Band, KdCross, MacdTransition, TrendAlignment},
        // Limits
        limit::{PriceLimitBand, TickSchedule, TickTier},
        // Providers
        provider::{CachedMarketData, FlowProvider, MarketDataProvider, ValuationProvider},
        // Report
        report::{Availability, Report},
        // Scores
        score::{FlowBias, InstitutionalFlow, Recommendation},
        // Data
        series::{Bar, Column, Series},
        valuation::ValuationPoint,
        // Engine
        AnalysisEngine,
        AnalysisError,
        AnalysisInput,
        Direction,
        EngineBuilder,
        IndicatorSet,
        IndicatorSnapshot,
        OHLCVExt,
        Period,
        Ratio,
        Result,
        OHLCV,
    };
}

use chrono::NaiveDate;

use config::EngineConfig;
use detectors::PatternStage;
use indicators::{
    detect_cross, detect_transition, rsv, KdCross, Macd, MacdTransition, MomentumStage,
    MovingAverageStage, MovingAverages, OscillatorStage, Oscillators,
};
use limit::{LimitStage, PriceLimitBand, TickSchedule};
use report::{
    Availability, FlowReading, MacdReading, MovingAverageReading, OscillatorReading, Quote, Report,
};
use score::{InstitutionalFlow, ScoreStage};
use series::{Bar, Series};
use valuation::{ValuationDiagnostics, ValuationPoint};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can occur during analysis
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Indicator {indicator} not yet available at bar {index}")]
    IndicatorNotYetAvailable {
        indicator: &'static str,
        index: usize,
    },

    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: &'static str },

    #[error("{collaborator} unavailable: {reason}")]
    CollaboratorUnavailable {
        collaborator: &'static str,
        reason: String,
    },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(AnalysisError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(AnalysisError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Indicator window length in bars (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(AnalysisError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// One daily bar as delivered by a market data source
pub trait OHLCV {
    fn date(&self) -> NaiveDate;
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> u64;
}

impl<T: OHLCV + ?Sized> OHLCV for &T {
    fn date(&self) -> NaiveDate {
        (**self).date()
    }

    fn open(&self) -> f64 {
        (**self).open()
    }

    fn high(&self) -> f64 {
        (**self).high()
    }

    fn low(&self) -> f64 {
        (**self).low()
    }

    fn close(&self) -> f64 {
        (**self).close()
    }

    fn volume(&self) -> u64 {
        (**self).volume()
    }
}

/// Candle geometry derived from OHLC.
///
/// Shadows may come out negative for bars violating
/// `low <= min(open, close) <= max(open, close) <= high`; callers treat a
/// negative shadow as "not applicable".
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_shadow(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_shadow(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    /// Closed above its open
    #[inline]
    fn is_up(&self) -> bool {
        self.close() > self.open()
    }

    /// Closed below its open
    #[inline]
    fn is_down(&self) -> bool {
        self.close() < self.open()
    }
}

impl<T: OHLCV + ?Sized> OHLCVExt for T {}

/// Direction/bias of a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

// ============================================================
// INDICATOR SET / SNAPSHOT
// ============================================================

/// A prepared series with every indicator column computed
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct IndicatorSet {
    pub series: Series,
    pub moving_averages: MovingAverages,
    pub oscillators: Oscillators,
    pub macd: Macd,
}

/// Indicator values at one bar
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SnapshotRow {
    pub bar: Bar,
    /// `(window, average, bias)` in configuration order
    pub moving_averages: Vec<(usize, Option<f64>, Option<f64>)>,
    pub lowest_low: Option<f64>,
    pub highest_high: Option<f64>,
    pub rsv: f64,
    pub k: f64,
    pub d: f64,
    pub rsi: Option<f64>,
    pub dif: Option<f64>,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
}

/// The latest fully computed row and its predecessor
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct IndicatorSnapshot {
    pub latest: SnapshotRow,
    pub previous: SnapshotRow,
}

impl IndicatorSet {
    /// Row at `index`; panics when out of bounds
    pub fn row(&self, index: usize) -> SnapshotRow {
        let stochastic = &self.oscillators.stochastic;
        SnapshotRow {
            bar: self.series.bars()[index],
            moving_averages: self
                .moving_averages
                .lines()
                .iter()
                .map(|l| (l.window, l.average.get(index), l.bias.get(index)))
                .collect(),
            lowest_low: stochastic.lowest_low.get(index),
            highest_high: stochastic.highest_high.get(index),
            rsv: stochastic.rsv.get(index).unwrap_or(indicators::NEUTRAL_RSV),
            k: stochastic.k.get(index).unwrap_or(indicators::NEUTRAL_RSV),
            d: stochastic.d.get(index).unwrap_or(indicators::NEUTRAL_RSV),
            rsi: self.oscillators.rsi.get(index),
            dif: self.macd.dif.get(index),
            signal: self.macd.signal.get(index),
            histogram: self.macd.histogram.get(index),
        }
    }

    /// Latest two rows; a prepared series always has both
    pub fn snapshot(&self) -> IndicatorSnapshot {
        let last = self.series.len() - 1;
        IndicatorSnapshot {
            latest: self.row(last),
            previous: self.row(last - 1),
        }
    }
}

impl IndicatorSnapshot {
    pub fn cross(&self) -> KdCross {
        detect_cross(self.previous.k, self.previous.d, self.latest.k, self.latest.d)
    }

    pub fn transition(&self) -> MacdTransition {
        match (self.previous.histogram, self.latest.histogram) {
            (Some(prev), Some(curr)) => detect_transition(prev, curr),
            _ => MacdTransition::NoTransition,
        }
    }

    /// RSV of `price` inside the latest stochastic window, clamped to 0..=100
    pub fn rsv_at(&self, price: f64) -> f64 {
        rsv(price, self.latest.lowest_low, self.latest.highest_high).clamp(0.0, 100.0)
    }
}

// ============================================================
// ANALYSIS INPUT
// ============================================================

/// External inputs besides the price series
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisInput {
    /// Net asset value per share; book value is rarely reliable in price feeds
    pub nav: Option<f64>,
    /// Manual price override for a stale feed
    pub live_price: Option<f64>,
    pub flow: Availability<InstitutionalFlow>,
    pub valuation_history: Availability<Vec<ValuationPoint>>,
}

impl Default for AnalysisInput {
    fn default() -> Self {
        Self {
            nav: None,
            live_price: None,
            flow: Availability::unavailable("not requested"),
            valuation_history: Availability::unavailable("not requested"),
        }
    }
}

impl AnalysisInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nav(mut self, nav: f64) -> Self {
        self.nav = Some(nav);
        self
    }

    pub fn with_live_price(mut self, price: f64) -> Self {
        self.live_price = Some(price);
        self
    }

    pub fn with_flow(mut self, flow: Availability<InstitutionalFlow>) -> Self {
        self.flow = flow;
        self
    }

    pub fn with_valuation_history(mut self, history: Availability<Vec<ValuationPoint>>) -> Self {
        self.valuation_history = history;
        self
    }
}

// ============================================================
// ANALYSIS ENGINE
// ============================================================

/// Main analysis engine
#[derive(Debug, Clone)]
pub struct AnalysisEngine {
    config: EngineConfig,
    moving_average: MovingAverageStage,
    oscillator: OscillatorStage,
    momentum: MomentumStage,
    patterns: PatternStage,
    limits: LimitStage,
    score: ScoreStage,
}

impl AnalysisEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            moving_average: config.moving_average_stage(),
            oscillator: config.oscillator_stage(),
            momentum: config.momentum_stage(),
            patterns: config.pattern_stage(),
            limits: config.limit_stage(),
            score: config.score,
            config,
        })
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ===========================================
    // LOW-LEVEL: Stages
    // ===========================================

    /// Order, deduplicate and (optionally) validate raw bars.
    pub fn prepare<T, I>(&self, bars: I) -> Result<Series>
    where
        T: OHLCV,
        I: IntoIterator<Item = T>,
    {
        let series = Series::prepare(bars)?;
        if self.config.validate_data {
            series.validate()?;
        }
        Ok(series)
    }

    /// Run the moving average, oscillator and momentum stages.
    pub fn compute(&self, series: Series) -> IndicatorSet {
        tracing::debug!(
            bars = series.len(),
            parallel = self.config.parallel,
            "computing indicators"
        );

        let (moving_averages, (oscillators, macd)) = if self.config.parallel {
            rayon::join(
                || self.moving_average.compute(&series),
                || {
                    rayon::join(
                        || self.oscillator.compute(&series),
                        || self.momentum.compute(&series),
                    )
                },
            )
        } else {
            (
                self.moving_average.compute(&series),
                (
                    self.oscillator.compute(&series),
                    self.momentum.compute(&series),
                ),
            )
        };

        IndicatorSet {
            series,
            moving_averages,
            oscillators,
            macd,
        }
    }

    /// Price-limit band for the session after `prev_close`
    pub fn limits(&self, prev_close: f64) -> Result<PriceLimitBand> {
        self.limits.compute(prev_close)
    }

    #[inline]
    pub fn tick_schedule(&self) -> &TickSchedule {
        &self.limits.schedule
    }

    // ===========================================
    // HIGH-LEVEL: Full analysis
    // ===========================================

    /// Prepare `bars` and produce a full report.
    pub fn analyze<T, I>(&self, bars: I, input: &AnalysisInput) -> Result<Report>
    where
        T: OHLCV,
        I: IntoIterator<Item = T>,
    {
        let series = self.prepare(bars)?;
        self.analyze_series(series, input)
    }

    /// Produce a full report from an already prepared series.
    pub fn analyze_series(&self, series: Series, input: &AnalysisInput) -> Result<Report> {
        if let Some(price) = input.live_price {
            if !price.is_finite() || price <= 0.0 {
                return Err(AnalysisError::InvalidValue(
                    "live price must be positive and finite",
                ));
            }
        }

        let set = self.compute(series);
        let snapshot = set.snapshot();
        let latest = snapshot.latest.bar;

        let price = input.live_price.unwrap_or(latest.close);
        let quote = Quote::new(price, snapshot.previous.bar.close, input.live_price.is_some());
        let limits = self.limits.compute(latest.close)?;

        let moving_averages = snapshot
            .latest
            .moving_averages
            .iter()
            .map(|&(window, value, bias)| MovingAverageReading {
                window,
                value,
                bias,
            })
            .collect();
        let trend = self.moving_average.trend(&set.moving_averages);

        let oscillator = OscillatorReading {
            rsv: snapshot.latest.rsv,
            k: snapshot.latest.k,
            d: snapshot.latest.d,
            k_band: self.oscillator.k_band.classify(snapshot.latest.k),
            cross: snapshot.cross(),
            rsi: snapshot.latest.rsi,
            rsi_band: snapshot.latest.rsi.map(|v| self.oscillator.rsi_band.classify(v)),
        };

        let macd = MacdReading {
            dif: snapshot.latest.dif,
            signal: snapshot.latest.signal,
            histogram: snapshot.latest.histogram,
            transition: snapshot.transition(),
        };

        let patterns = self.patterns.scan(&snapshot.previous.bar, &latest);

        let valuation = match input.nav {
            Some(nav) => Availability::Available(self.score.valuation(
                price,
                nav,
                snapshot.rsv_at(price),
            )?),
            None => Availability::unavailable("net asset value not provided"),
        };

        let flow = input.flow.as_ref().map(|f| FlowReading {
            flow: *f,
            score: self.score.flow(f),
        });

        let valuation_history = match input.valuation_history.as_ref() {
            Availability::Available(points) => ValuationDiagnostics::from_points(points)
                .map_or_else(
                    || Availability::unavailable("valuation history is empty"),
                    Availability::Available,
                ),
            Availability::Unavailable { reason } => Availability::Unavailable { reason },
        };

        tracing::debug!(
            as_of = %latest.date,
            patterns = patterns.len(),
            flow = flow.is_available(),
            "analysis complete"
        );

        Ok(Report {
            as_of: latest.date,
            quote,
            limits,
            moving_averages,
            trend,
            oscillator,
            macd,
            patterns,
            valuation,
            flow,
            valuation_history,
        })
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating AnalysisEngine instances
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    invalid: Option<AnalysisError>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: EngineConfig) -> Self {
        Self {
            config,
            invalid: None,
        }
    }

    fn period(&mut self, value: usize) -> Period {
        match Period::new(value) {
            Ok(p) => p,
            Err(e) => {
                self.invalid.get_or_insert(e);
                Period::new_const(1)
            }
        }
    }

    /// Replace the moving average windows
    pub fn ma_windows(mut self, windows: impl IntoIterator<Item = usize>) -> Self {
        let windows: Vec<Period> = windows.into_iter().map(|w| self.period(w)).collect();
        self.config.ma_windows = windows;
        self
    }

    /// Fast, mid and slow windows for trend alignment
    pub fn trend_windows(mut self, fast: usize, mid: usize, slow: usize) -> Self {
        self.config.trend_windows = [self.period(fast), self.period(mid), self.period(slow)];
        self
    }

    pub fn stochastic_period(mut self, period: usize) -> Self {
        self.config.stochastic_period = self.period(period);
        self
    }

    pub fn kd_seed(mut self, seed: f64) -> Self {
        self.config.kd_seed = seed;
        self
    }

    pub fn rsi_period(mut self, period: usize) -> Self {
        self.config.rsi_period = self.period(period);
        self
    }

    pub fn macd_spans(mut self, fast: usize, slow: usize, signal: usize) -> Self {
        self.config.macd_fast = self.period(fast);
        self.config.macd_slow = self.period(slow);
        self.config.macd_signal = self.period(signal);
        self
    }

    /// Largest body-to-range ratio reported as a doji, in `0.0..=1.0`
    pub fn doji_ratio(mut self, ratio: f64) -> Self {
        match Ratio::new(ratio) {
            Ok(r) => self.config.doji_ratio = r,
            Err(e) => {
                self.invalid.get_or_insert(e);
            }
        }
        self
    }

    /// Hammer shape: lower shadow above `lower` bodies, upper shadow under `upper` bodies
    pub fn hammer_shadow_factors(mut self, lower: f64, upper: f64) -> Self {
        self.config.hammer_lower_shadow_factor = lower;
        self.config.hammer_upper_shadow_factor = upper;
        self
    }

    pub fn tick_schedule(mut self, schedule: TickSchedule) -> Self {
        self.config.tick_schedule = schedule;
        self
    }

    pub fn limit_ratio(mut self, ratio: f64) -> Self {
        self.config.limit_ratio = ratio;
        self
    }

    pub fn score_thresholds(mut self, score: ScoreStage) -> Self {
        self.config.score = score;
        self
    }

    /// Run the independent indicator stages concurrently
    pub fn parallel(mut self, enable: bool) -> Self {
        self.config.parallel = enable;
        self
    }

    /// Enable/disable data validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<AnalysisEngine> {
        if let Some(e) = self.invalid {
            return Err(e);
        }
        AnalysisEngine::new(self.config)
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::CandlePattern;
    use chrono::Days;

    fn bars(closes: &[f64]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(start + Days::new(i as u64), c, c + 0.5, c - 0.5, c, 1_000))
            .collect()
    }

    fn wave(n: usize) -> Vec<f64> {
        (0..n).map(|i| 50.0 + 5.0 * (i as f64 * 0.25).sin()).collect()
    }

    #[test]
    fn test_ratio_validation() {
        assert!(Ratio::new(0.0).is_ok());
        assert!(Ratio::new(1.0).is_ok());
        assert!(Ratio::new(-0.1).is_err());
        assert!(Ratio::new(1.1).is_err());
        assert!(Ratio::new(f64::NAN).is_err());
    }

    #[test]
    fn test_period_validation() {
        assert!(Period::new(1).is_ok());
        assert!(Period::new(0).is_err());
    }

    #[test]
    fn test_ohlcv_ext() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let bar = Bar::new(date, 100.0, 110.0, 90.0, 105.0, 1);
        assert_eq!(bar.body(), 5.0);
        assert_eq!(bar.range(), 20.0);
        assert_eq!(bar.upper_shadow(), 5.0);
        assert_eq!(bar.lower_shadow(), 10.0);
        assert!(bar.is_up());
        assert!(!bar.is_down());
    }

    #[test]
    fn test_inconsistent_bar_has_negative_shadow() {
        // high below close
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let bar = Bar::new(date, 100.0, 101.0, 99.0, 102.0, 1);
        assert!(bar.upper_shadow() < 0.0);
    }

    #[test]
    fn test_engine_builder() {
        assert!(EngineBuilder::new().build().is_ok());
        assert!(EngineBuilder::new().stochastic_period(0).build().is_err());
        assert!(EngineBuilder::new().macd_spans(26, 12, 9).build().is_err());
        assert!(EngineBuilder::new().ma_windows([5, 20]).build().is_err());
        assert!(EngineBuilder::new()
            .ma_windows([3, 8, 21])
            .trend_windows(3, 8, 21)
            .build()
            .is_ok());
        assert!(matches!(
            EngineBuilder::new().doji_ratio(1.2).build(),
            Err(AnalysisError::OutOfRange { field: "Ratio", .. })
        ));
        assert!(EngineBuilder::new().hammer_shadow_factors(0.0, 0.5).build().is_err());
    }

    #[test]
    fn test_configured_doji_ratio_reaches_report() {
        // Latest bar: body 0.6 over a range of 4.0
        let mut data = bars(&[20.0; 5]);
        let last = data[4].date + Days::new(1);
        data.push(Bar::new(last, 20.0, 22.0, 18.0, 20.6, 1_000));

        let strict = EngineBuilder::new().build().unwrap();
        let report = strict.analyze(data.clone(), &AnalysisInput::new()).unwrap();
        assert!(!report.patterns.contains(&CandlePattern::Doji));

        let loose = EngineBuilder::new().doji_ratio(0.2).build().unwrap();
        let report = loose.analyze(data, &AnalysisInput::new()).unwrap();
        assert!(report.patterns.contains(&CandlePattern::Doji));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let data = bars(&wave(120));
        let seq = EngineBuilder::new().build().unwrap();
        let par = EngineBuilder::new().parallel(true).build().unwrap();
        let a = seq.compute(seq.prepare(data.clone()).unwrap());
        let b = par.compute(par.prepare(data).unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn test_snapshot_rows() {
        let engine = EngineBuilder::new().build().unwrap();
        let set = engine.compute(engine.prepare(bars(&wave(70))).unwrap());
        let snap = set.snapshot();
        assert_eq!(snap.latest.bar, *set.series.latest());
        assert_eq!(snap.previous.bar, *set.series.previous());
        assert_eq!(snap.latest.moving_averages.len(), 4);
        assert_eq!(snap.latest.k, set.oscillators.stochastic.k.latest().unwrap());
        assert!(snap.latest.signal.is_some());
    }

    #[test]
    fn test_rsv_at_clamps() {
        let engine = EngineBuilder::new().build().unwrap();
        let set = engine.compute(engine.prepare(bars(&wave(30))).unwrap());
        let snap = set.snapshot();
        assert_eq!(snap.rsv_at(1_000.0), 100.0);
        assert_eq!(snap.rsv_at(0.01), 0.0);
    }

    #[test]
    fn test_analyze_rejects_bad_live_price() {
        let engine = EngineBuilder::new().build().unwrap();
        let input = AnalysisInput::new().with_live_price(-1.0);
        assert!(matches!(
            engine.analyze(bars(&wave(20)), &input),
            Err(AnalysisError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_validate_data_toggle() {
        let mut data = bars(&wave(20));
        data[3].low = f64::NAN;
        let lenient = EngineBuilder::new().build().unwrap();
        assert!(lenient.prepare(data.clone()).is_ok());
        let strict = EngineBuilder::new().validate_data(true).build().unwrap();
        assert!(matches!(
            strict.prepare(data),
            Err(AnalysisError::InvalidBar { index: 3, .. })
        ));
    }
}
