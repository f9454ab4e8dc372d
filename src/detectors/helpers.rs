//! Shared thresholds and candle-shape predicates

/// Doji: body <= range * DOJI_RATIO
pub const DOJI_RATIO: f64 = 0.1;
/// Hammer family: lower shadow > body * LOWER_SHADOW_FACTOR
pub const LOWER_SHADOW_FACTOR: f64 = 2.0;
/// Hammer family: upper shadow < body * UPPER_SHADOW_FACTOR
pub const UPPER_SHADOW_FACTOR: f64 = 0.5;

/// Body is doji-like relative to the bar's own range.
///
/// A zero body is always a doji, which also covers a bar with no range at all.
#[inline]
pub fn is_doji(body: f64, range: f64, ratio: f64) -> bool {
    if body <= 0.0 {
        return true;
    }
    range > 0.0 && body <= range * ratio
}

/// Lower shadow at least `factor` times the body.
///
/// Negative shadows come from inconsistent bars and never qualify.
#[inline]
pub fn is_lower_shadow_long(lower: f64, body: f64, factor: f64) -> bool {
    lower >= 0.0 && lower > body * factor
}

/// Upper shadow shorter than `factor` times the body.
#[inline]
pub fn is_upper_shadow_short(upper: f64, body: f64, factor: f64) -> bool {
    upper >= 0.0 && upper < body * factor
}
