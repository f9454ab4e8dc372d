//! PER / PBR history diagnostics

use chrono::NaiveDate;

/// Valuation ratios for one historical day
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ValuationPoint {
    pub date: NaiveDate,
    /// Price / earnings
    pub per: f64,
    /// Price / book
    pub pbr: f64,
}

/// Where the latest ratio sits within its own history
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RatioPercentile {
    pub current: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Share of samples at or below `current`, in percent
    pub percentile: f64,
    pub samples: usize,
}

impl RatioPercentile {
    /// Diagnostics over `history` (chronological). Non-positive and non-finite
    /// values are skipped; `None` when nothing valid remains.
    pub fn from_history(history: &[f64]) -> Option<Self> {
        let valid: Vec<f64> = history
            .iter()
            .copied()
            .filter(|v| v.is_finite() && *v > 0.0)
            .collect();
        let current = *valid.last()?;

        let samples = valid.len();
        let min = valid.iter().copied().fold(f64::INFINITY, f64::min);
        let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = valid.iter().sum::<f64>() / samples as f64;

        Some(Self {
            current,
            min,
            max,
            mean,
            percentile: percentile_rank(&valid, current),
            samples,
        })
    }
}

/// Percentage of `values` that are `<= value`
pub fn percentile_rank(values: &[f64], value: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let at_or_below = values.iter().filter(|&&v| v <= value).count();
    at_or_below as f64 / values.len() as f64 * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ValuationDiagnostics {
    pub per: Option<RatioPercentile>,
    pub pbr: Option<RatioPercentile>,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

impl ValuationDiagnostics {
    /// `None` for an empty history
    pub fn from_points(points: &[ValuationPoint]) -> Option<Self> {
        let mut sorted = points.to_vec();
        sorted.sort_by_key(|p| p.date);
        let first_date = sorted.first()?.date;
        let last_date = sorted.last()?.date;

        let per: Vec<f64> = sorted.iter().map(|p| p.per).collect();
        let pbr: Vec<f64> = sorted.iter().map(|p| p.pbr).collect();

        Some(Self {
            per: RatioPercentile::from_history(&per),
            pbr: RatioPercentile::from_history(&pbr),
            first_date,
            last_date,
        })
    }
}
