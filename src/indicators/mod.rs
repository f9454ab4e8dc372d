//! Indicator stages over a prepared [`Series`](crate::series::Series)
//!
//! - **Moving averages**: SMA per window, bias ratios, trend alignment
//! - **Oscillators**: 9-bar RSV, K/D smoothing, RSI
//! - **Momentum**: MACD DIF / signal / histogram
//!
//! The three stages only read the series and produce disjoint columns, so
//! they can run in any order or concurrently.

pub mod momentum;
pub mod moving_average;
pub mod oscillator;

pub use momentum::*;
pub use moving_average::*;
pub use oscillator::*;
