//! Two-bar candlestick detectors: Engulfing

use super::{CandlePattern, PatternDetector};
use crate::{OHLCVExt, OHLCV};

/// Bullish and bearish engulfing.
///
/// Both bodies are compared strictly: the current body must open beyond the
/// prior close and close beyond the prior open.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngulfingDetector;

impl PatternDetector for EngulfingDetector {
    fn detect<T: OHLCV>(&self, prev: &T, curr: &T) -> Option<CandlePattern> {
        // Down bar engulfed by an up bar
        if prev.is_down()
            && curr.is_up()
            && curr.open() < prev.close()
            && curr.close() > prev.open()
        {
            return Some(CandlePattern::BullishEngulfing);
        }

        // Up bar engulfed by a down bar
        if prev.is_up()
            && curr.is_down()
            && curr.open() > prev.close()
            && curr.close() < prev.open()
        {
            return Some(CandlePattern::BearishEngulfing);
        }

        None
    }
}
