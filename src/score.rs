//! Recommendation scoring
//!
//! Two independent ordinal scores:
//!
//! - **Valuation score**: price-to-book bucket plus the 9-day RSV position,
//!   mapped to strong buy / wait / sell.
//! - **Flow score**: foreign investor and investment trust net lots, mapped to
//!   bullish / neutral / bearish flow.
//!
//! They are reported side by side and never added together.

use chrono::NaiveDate;

use crate::{AnalysisError, Result};

// ============================================================
// VALUATION SCORE
// ============================================================

/// Overall call from valuation and momentum
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    StrongBuy,
    Wait,
    Sell,
}

impl Recommendation {
    pub fn as_str(self) -> &'static str {
        match self {
            Recommendation::StrongBuy => "strong buy",
            Recommendation::Wait => "wait",
            Recommendation::Sell => "sell",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ValuationScore {
    pub price: f64,
    pub nav: f64,
    pub price_to_book: f64,
    /// RSV at `price` within the latest stochastic window
    pub rsv: f64,
    pub valuation_points: i32,
    pub momentum_points: i32,
    pub total: i32,
    pub recommendation: Recommendation,
}

// ============================================================
// FLOW SCORE
// ============================================================

/// Net lots bought (positive) or sold (negative) by each investor class
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InstitutionalFlow {
    pub date: NaiveDate,
    pub foreign_net_lots: i64,
    pub trust_net_lots: i64,
    pub dealer_net_lots: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowBias {
    BullishFlow,
    Neutral,
    BearishFlow,
}

impl FlowBias {
    pub fn as_str(self) -> &'static str {
        match self {
            FlowBias::BullishFlow => "bullish flow",
            FlowBias::Neutral => "neutral",
            FlowBias::BearishFlow => "bearish flow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct FlowScore {
    pub foreign_points: i32,
    pub trust_points: i32,
    pub total: i32,
    pub bias: FlowBias,
}

// ============================================================
// STAGE
// ============================================================

/// Score thresholds
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ScoreStage {
    /// P/B below this is deeply cheap (+2)
    pub cheap_pb: f64,
    /// P/B below this (and at or above `cheap_pb`) is cheap (+1)
    pub fair_pb: f64,
    /// P/B above this is expensive (-2); between `fair_pb` and here is -1
    pub expensive_pb: f64,
    /// RSV below this adds +1
    pub rsv_low: f64,
    /// RSV above this adds -1
    pub rsv_high: f64,
    /// Foreign net lots beyond ±this move the flow score by 2
    pub foreign_lots: i64,
}

impl Default for ScoreStage {
    fn default() -> Self {
        Self {
            cheap_pb: 0.6,
            fair_pb: 0.75,
            expensive_pb: 0.85,
            rsv_low: 20.0,
            rsv_high: 80.0,
            foreign_lots: 1000,
        }
    }
}

impl ScoreStage {
    pub fn valuation_points(&self, price_to_book: f64) -> i32 {
        if price_to_book < self.cheap_pb {
            2
        } else if price_to_book > self.expensive_pb {
            -2
        } else if price_to_book < self.fair_pb {
            1
        } else {
            -1
        }
    }

    pub fn momentum_points(&self, rsv: f64) -> i32 {
        if rsv < self.rsv_low {
            1
        } else if rsv > self.rsv_high {
            -1
        } else {
            0
        }
    }

    pub fn recommend(total: i32) -> Recommendation {
        match total {
            t if t >= 2 => Recommendation::StrongBuy,
            t if t <= -2 => Recommendation::Sell,
            _ => Recommendation::Wait,
        }
    }

    /// Score `price` against net asset value per share and the RSV.
    pub fn valuation(&self, price: f64, nav: f64, rsv: f64) -> Result<ValuationScore> {
        if !nav.is_finite() || nav <= 0.0 {
            return Err(AnalysisError::InvalidValue("NAV must be positive and finite"));
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(AnalysisError::InvalidValue("price must be positive and finite"));
        }

        let price_to_book = price / nav;
        let valuation_points = self.valuation_points(price_to_book);
        let momentum_points = self.momentum_points(rsv);
        let total = valuation_points + momentum_points;

        Ok(ValuationScore {
            price,
            nav,
            price_to_book,
            rsv,
            valuation_points,
            momentum_points,
            total,
            recommendation: Self::recommend(total),
        })
    }

    pub fn flow(&self, flow: &InstitutionalFlow) -> FlowScore {
        let foreign_points = if flow.foreign_net_lots > self.foreign_lots {
            2
        } else if flow.foreign_net_lots < -self.foreign_lots {
            -2
        } else {
            0
        };
        let trust_points = match flow.trust_net_lots {
            n if n > 0 => 1,
            n if n < 0 => -1,
            _ => 0,
        };
        let total = foreign_points + trust_points;
        let bias = match total {
            t if t > 0 => FlowBias::BullishFlow,
            t if t < 0 => FlowBias::BearishFlow,
            _ => FlowBias::Neutral,
        };

        FlowScore {
            foreign_points,
            trust_points,
            total,
            bias,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.cheap_pb < self.fair_pb && self.fair_pb <= self.expensive_pb) {
            return Err(AnalysisError::InvalidConfig(format!(
                "P/B thresholds must ascend, got {} / {} / {}",
                self.cheap_pb, self.fair_pb, self.expensive_pb
            )));
        }
        if !(self.rsv_low < self.rsv_high) {
            return Err(AnalysisError::InvalidConfig(format!(
                "RSV thresholds must ascend, got {} / {}",
                self.rsv_low, self.rsv_high
            )));
        }
        if self.foreign_lots < 0 {
            return Err(AnalysisError::InvalidValue("foreign lot threshold must be >= 0"));
        }
        Ok(())
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn flow(foreign: i64, trust: i64) -> InstitutionalFlow {
        InstitutionalFlow {
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            foreign_net_lots: foreign,
            trust_net_lots: trust,
            dealer_net_lots: -50,
        }
    }

    #[test]
    fn test_valuation_buckets() {
        let s = ScoreStage::default();
        assert_eq!(s.valuation_points(0.59), 2);
        assert_eq!(s.valuation_points(0.6), 1);
        assert_eq!(s.valuation_points(0.749), 1);
        assert_eq!(s.valuation_points(0.75), -1);
        assert_eq!(s.valuation_points(0.85), -1);
        assert_eq!(s.valuation_points(0.851), -2);
    }

    #[test]
    fn test_momentum_points() {
        let s = ScoreStage::default();
        assert_eq!(s.momentum_points(19.9), 1);
        assert_eq!(s.momentum_points(20.0), 0);
        assert_eq!(s.momentum_points(80.0), 0);
        assert_eq!(s.momentum_points(80.1), -1);
    }

    #[test]
    fn test_price_20_nav_26_5() {
        let score = ScoreStage::default().valuation(20.0, 26.5, 50.0).unwrap();
        assert!((score.price_to_book - 0.7547).abs() < 1e-4);
        assert_eq!(score.valuation_points, -1);
        assert_eq!(score.total, -1);
        assert_eq!(score.recommendation, Recommendation::Wait);
    }

    #[test]
    fn test_recommendation_thresholds() {
        let s = ScoreStage::default();
        let recommend = |price, nav, rsv| s.valuation(price, nav, rsv).unwrap().recommendation;
        assert_eq!(recommend(10.0, 20.0, 50.0), Recommendation::StrongBuy);
        assert_eq!(recommend(13.0, 20.0, 10.0), Recommendation::StrongBuy);
        assert_eq!(recommend(13.0, 20.0, 90.0), Recommendation::Wait);
        assert_eq!(recommend(16.0, 20.0, 90.0), Recommendation::Sell);
        assert_eq!(recommend(20.0, 20.0, 50.0), Recommendation::Sell);
    }

    #[test]
    fn test_valuation_rejects_bad_nav() {
        let s = ScoreStage::default();
        assert!(s.valuation(20.0, 0.0, 50.0).is_err());
        assert!(s.valuation(20.0, f64::NAN, 50.0).is_err());
        assert!(s.valuation(-1.0, 20.0, 50.0).is_err());
    }

    #[test]
    fn test_flow_1500_200() {
        let score = ScoreStage::default().flow(&flow(1500, 200));
        assert_eq!(score.total, 3);
        assert_eq!(score.bias, FlowBias::BullishFlow);
    }

    #[test]
    fn test_flow_edges() {
        let s = ScoreStage::default();
        // Exactly ±1000 does not count
        assert_eq!(s.flow(&flow(1000, 0)).total, 0);
        assert_eq!(s.flow(&flow(-1000, 0)).bias, FlowBias::Neutral);
        assert_eq!(s.flow(&flow(-1001, 5)).total, -1);
        assert_eq!(s.flow(&flow(-1001, 5)).bias, FlowBias::BearishFlow);
        assert_eq!(s.flow(&flow(2000, -3)).total, 1);
    }

    #[test]
    fn test_validate() {
        assert!(ScoreStage::default().validate().is_ok());
        let bad = ScoreStage {
            cheap_pb: 0.9,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
