//! Candlestick pattern detectors
//!
//! Detectors look at the latest completed bar and its predecessor only.
//!
//! # Patterns
//!
//! - **Single-bar**: Doji, Hammer / Hanging Man
//! - **Two-bar**: Bullish / Bearish Engulfing
//!
//! Patterns are not mutually exclusive; [`PatternStage::scan`] reports every
//! match.

pub mod helpers;
pub mod single_bar;
pub mod two_bar;

pub use helpers::*;
pub use single_bar::*;
pub use two_bar::*;

use crate::{Direction, Result, OHLCV};

/// A recognized candlestick signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandlePattern {
    Doji,
    BullishEngulfing,
    BearishEngulfing,
    Hammer,
    HangingMan,
}

impl CandlePattern {
    pub fn as_str(self) -> &'static str {
        match self {
            CandlePattern::Doji => "doji",
            CandlePattern::BullishEngulfing => "bullish engulfing",
            CandlePattern::BearishEngulfing => "bearish engulfing",
            CandlePattern::Hammer => "hammer",
            CandlePattern::HangingMan => "hanging man",
        }
    }

    /// Typical bias of the pattern
    pub fn direction(self) -> Direction {
        match self {
            CandlePattern::Doji => Direction::Neutral,
            CandlePattern::BullishEngulfing | CandlePattern::Hammer => Direction::Bullish,
            CandlePattern::BearishEngulfing | CandlePattern::HangingMan => Direction::Bearish,
        }
    }
}

/// Detector over the latest bar and its predecessor
pub trait PatternDetector: Send + Sync {
    fn detect<T: OHLCV>(&self, prev: &T, curr: &T) -> Option<CandlePattern>;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

/// All detectors, run in a fixed order
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternStage {
    pub doji: DojiDetector,
    pub engulfing: EngulfingDetector,
    pub hammer: HammerDetector,
}

impl PatternStage {
    /// Every pattern formed by `curr` (and `prev` for two-bar patterns)
    pub fn scan<T: OHLCV>(&self, prev: &T, curr: &T) -> Vec<CandlePattern> {
        [
            self.doji.detect(prev, curr),
            self.engulfing.detect(prev, curr),
            self.hammer.detect(prev, curr),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn validate(&self) -> Result<()> {
        self.doji.validate_config()?;
        self.engulfing.validate_config()?;
        self.hammer.validate_config()
    }
}
