//! Engine configuration
//!
//! Every field has a default matching common Taiwanese charting conventions,
//! so a partial JSON/TOML document deserializes into a usable config:
//!
//! ```rust
//! use twsignal::config::EngineConfig;
//!
//! let config = EngineConfig::default();
//! assert!(config.validate().is_ok());
//! assert_eq!(config.stochastic_period.get(), 9);
//! ```

use crate::detectors::{DojiDetector, HammerDetector, PatternStage};
use crate::indicators::{BandThresholds, MomentumStage, MovingAverageStage, OscillatorStage};
use crate::limit::{LimitStage, TickSchedule};
use crate::score::ScoreStage;
use crate::{AnalysisError, Period, Ratio, Result};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Simple moving average windows
    pub ma_windows: Vec<Period>,
    /// Fast, mid and slow windows for trend alignment; each must be in `ma_windows`
    pub trend_windows: [Period; 3],
    /// Window of the lowest-low / highest-high used by RSV
    pub stochastic_period: Period,
    /// Initial K and D value
    pub kd_seed: f64,
    pub rsi_period: Period,
    pub k_band: BandThresholds,
    pub rsi_band: BandThresholds,
    pub macd_fast: Period,
    pub macd_slow: Period,
    pub macd_signal: Period,
    /// Largest body-to-range ratio still reported as a doji
    pub doji_ratio: Ratio,
    /// Hammer lower shadow must exceed this multiple of the body
    pub hammer_lower_shadow_factor: f64,
    /// Hammer upper shadow must stay under this multiple of the body
    pub hammer_upper_shadow_factor: f64,
    pub tick_schedule: TickSchedule,
    /// Daily limit as a fraction of the previous close
    pub limit_ratio: f64,
    pub score: ScoreStage,
    /// Run the moving average, oscillator and momentum stages on the rayon pool
    pub parallel: bool,
    /// Reject non-finite or non-positive prices before computing
    pub validate_data: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let ma = MovingAverageStage::default();
        let osc = OscillatorStage::default();
        let momentum = MomentumStage::default();
        let patterns = PatternStage::default();
        let limit = LimitStage::default();
        Self {
            ma_windows: ma.windows,
            trend_windows: ma.trend_windows,
            stochastic_period: osc.stochastic_period,
            kd_seed: osc.kd_seed,
            rsi_period: osc.rsi_period,
            k_band: osc.k_band,
            rsi_band: osc.rsi_band,
            macd_fast: momentum.fast_span,
            macd_slow: momentum.slow_span,
            macd_signal: momentum.signal_span,
            doji_ratio: patterns.doji.doji_ratio,
            hammer_lower_shadow_factor: patterns.hammer.lower_shadow_factor,
            hammer_upper_shadow_factor: patterns.hammer.upper_shadow_factor,
            tick_schedule: limit.schedule,
            limit_ratio: limit.limit_ratio,
            score: ScoreStage::default(),
            parallel: false,
            validate_data: false,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ma_windows.is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "at least one moving average window is required".into(),
            ));
        }
        for w in self.trend_windows {
            if !self.ma_windows.contains(&w) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "trend window {} is not a configured moving average window",
                    w.get()
                )));
            }
        }

        if !(0.0..=100.0).contains(&self.kd_seed) {
            return Err(AnalysisError::OutOfRange {
                field: "kd_seed",
                value: self.kd_seed,
                min: 0.0,
                max: 100.0,
            });
        }
        for (name, band) in [("k_band", self.k_band), ("rsi_band", self.rsi_band)] {
            if !(band.oversold < band.overbought) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{name}: oversold {} must be below overbought {}",
                    band.oversold, band.overbought
                )));
            }
        }

        if self.macd_fast >= self.macd_slow {
            return Err(AnalysisError::InvalidConfig(format!(
                "MACD fast span {} must be shorter than slow span {}",
                self.macd_fast.get(),
                self.macd_slow.get()
            )));
        }

        self.limit_stage().validate()?;
        self.pattern_stage().validate()?;
        self.score.validate()
    }

    pub fn moving_average_stage(&self) -> MovingAverageStage {
        MovingAverageStage {
            windows: self.ma_windows.clone(),
            trend_windows: self.trend_windows,
        }
    }

    pub fn oscillator_stage(&self) -> OscillatorStage {
        OscillatorStage {
            stochastic_period: self.stochastic_period,
            kd_seed: self.kd_seed,
            rsi_period: self.rsi_period,
            k_band: self.k_band,
            rsi_band: self.rsi_band,
        }
    }

    pub fn momentum_stage(&self) -> MomentumStage {
        MomentumStage {
            fast_span: self.macd_fast,
            slow_span: self.macd_slow,
            signal_span: self.macd_signal,
        }
    }

    pub fn pattern_stage(&self) -> PatternStage {
        PatternStage {
            doji: DojiDetector {
                doji_ratio: self.doji_ratio,
            },
            hammer: HammerDetector {
                lower_shadow_factor: self.hammer_lower_shadow_factor,
                upper_shadow_factor: self.hammer_upper_shadow_factor,
            },
            ..Default::default()
        }
    }

    pub fn limit_stage(&self) -> LimitStage {
        LimitStage {
            schedule: self.tick_schedule.clone(),
            limit_ratio: self.limit_ratio,
        }
    }
}
