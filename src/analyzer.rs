//! Provider-driven analysis of one ticker

use crate::provider::{FlowProvider, MarketDataProvider, ValuationProvider};
use crate::report::{Availability, Report};
use crate::score::InstitutionalFlow;
use crate::series::Series;
use crate::valuation::ValuationPoint;
use crate::{AnalysisEngine, AnalysisError, AnalysisInput, Result};

/// Default history requested from the market data provider
pub const DEFAULT_LOOKBACK_DAYS: usize = 260;
/// Shortest history that leaves the 60-day average meaningful
pub const MIN_LOOKBACK_DAYS: usize = 90;
/// Recent trading dates searched for institutional flow
pub const DEFAULT_FLOW_LOOKBACK_DAYS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub ticker: String,
    pub lookback_days: usize,
    pub nav: Option<f64>,
    pub live_price: Option<f64>,
}

impl AnalysisRequest {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            nav: None,
            live_price: None,
        }
    }

    pub fn with_lookback_days(mut self, days: usize) -> Self {
        self.lookback_days = days;
        self
    }

    pub fn with_nav(mut self, nav: f64) -> Self {
        self.nav = Some(nav);
        self
    }

    pub fn with_live_price(mut self, price: f64) -> Self {
        self.live_price = Some(price);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.ticker.trim().is_empty() {
            return Err(AnalysisError::InvalidValue("ticker must not be empty"));
        }
        if self.lookback_days < MIN_LOOKBACK_DAYS {
            return Err(AnalysisError::OutOfRange {
                field: "lookback_days",
                value: self.lookback_days as f64,
                min: MIN_LOOKBACK_DAYS as f64,
                max: f64::INFINITY,
            });
        }
        Ok(())
    }
}

/// Wires data providers to an [`AnalysisEngine`]
pub struct Analyzer {
    engine: AnalysisEngine,
    market: Box<dyn MarketDataProvider>,
    flow: Option<Box<dyn FlowProvider>>,
    valuation: Option<Box<dyn ValuationProvider>>,
    flow_lookback_days: usize,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("engine", &self.engine)
            .field("flow", &self.flow.is_some())
            .field("valuation", &self.valuation.is_some())
            .field("flow_lookback_days", &self.flow_lookback_days)
            .finish_non_exhaustive()
    }
}

impl Analyzer {
    pub fn new(engine: AnalysisEngine, market: impl MarketDataProvider + 'static) -> Self {
        Self {
            engine,
            market: Box::new(market),
            flow: None,
            valuation: None,
            flow_lookback_days: DEFAULT_FLOW_LOOKBACK_DAYS,
        }
    }

    pub fn with_flow_provider(mut self, provider: impl FlowProvider + 'static) -> Self {
        self.flow = Some(Box::new(provider));
        self
    }

    pub fn with_valuation_provider(mut self, provider: impl ValuationProvider + 'static) -> Self {
        self.valuation = Some(Box::new(provider));
        self
    }

    /// Number of most recent trading dates searched for flow data; at least 1
    pub fn with_flow_lookback_days(mut self, days: usize) -> Self {
        self.flow_lookback_days = days.max(1);
        self
    }

    #[inline]
    pub fn engine(&self) -> &AnalysisEngine {
        &self.engine
    }

    /// Fetch, prepare and analyze `request.ticker`.
    ///
    /// Only market data is required; missing flow or valuation data turns the
    /// matching report section `Unavailable`.
    #[tracing::instrument(skip(self), fields(ticker = %request.ticker))]
    pub fn run(&self, request: &AnalysisRequest) -> Result<Report> {
        request.validate()?;

        let bars = self
            .market
            .daily_bars(&request.ticker, request.lookback_days)
            .map_err(|e| market_unavailable(e.to_string()))?;
        if bars.is_empty() {
            return Err(market_unavailable("no bars returned".into()));
        }
        tracing::debug!(bars = bars.len(), "market data fetched");

        let series = self.engine.prepare(bars)?;

        let mut input = AnalysisInput::new()
            .with_flow(self.latest_flow(&request.ticker, &series))
            .with_valuation_history(self.fetch_valuation(request));
        input.nav = request.nav;
        input.live_price = request.live_price;

        self.engine.analyze_series(series, &input)
    }

    fn latest_flow(&self, ticker: &str, series: &Series) -> Availability<InstitutionalFlow> {
        let Some(provider) = &self.flow else {
            return Availability::unavailable("no flow provider configured");
        };

        for bar in series.bars().iter().rev().take(self.flow_lookback_days) {
            match provider.institutional_flow(ticker, bar.date) {
                Ok(Some(flow)) => return Availability::Available(flow),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(date = %bar.date, error = %e, "institutional flow lookup failed")
                }
            }
        }

        tracing::warn!(
            searched = self.flow_lookback_days.min(series.len()),
            "no institutional flow found"
        );
        Availability::unavailable(format!(
            "no institutional flow in the last {} trading days",
            self.flow_lookback_days
        ))
    }

    fn fetch_valuation(&self, request: &AnalysisRequest) -> Availability<Vec<ValuationPoint>> {
        let Some(provider) = &self.valuation else {
            return Availability::unavailable("no valuation provider configured");
        };

        match provider.valuation_history(&request.ticker, request.lookback_days) {
            Ok(points) if points.is_empty() => {
                tracing::warn!("valuation history is empty");
                Availability::unavailable("valuation history is empty")
            }
            Ok(points) => Availability::Available(points),
            Err(e) => {
                tracing::warn!(error = %e, "valuation history unavailable");
                Availability::unavailable(e.to_string())
            }
        }
    }
}

fn market_unavailable(reason: String) -> AnalysisError {
    AnalysisError::CollaboratorUnavailable {
        collaborator: "market data",
        reason,
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Bar;
    use crate::EngineBuilder;
    use chrono::{Days, NaiveDate};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    }

    struct FixedBars(Vec<Bar>);

    impl MarketDataProvider for FixedBars {
        fn daily_bars(&self, _ticker: &str, _lookback_days: usize) -> Result<Vec<Bar>> {
            Ok(self.0.clone())
        }
    }

    struct FailingBars;

    impl MarketDataProvider for FailingBars {
        fn daily_bars(&self, _ticker: &str, _lookback_days: usize) -> Result<Vec<Bar>> {
            Err(AnalysisError::InvalidValue("connection reset"))
        }
    }

    /// Publishes flow only on `published`; errors on `broken`
    struct RecordingFlow {
        published: NaiveDate,
        broken: Option<NaiveDate>,
        requested: Arc<Mutex<Vec<NaiveDate>>>,
    }

    impl FlowProvider for RecordingFlow {
        fn institutional_flow(
            &self,
            _ticker: &str,
            date: NaiveDate,
        ) -> Result<Option<InstitutionalFlow>> {
            self.requested.lock().push(date);
            if Some(date) == self.broken {
                return Err(AnalysisError::InvalidValue("rate limited"));
            }
            Ok((date == self.published).then_some(InstitutionalFlow {
                date,
                foreign_net_lots: 1500,
                trust_net_lots: 200,
                dealer_net_lots: -50,
            }))
        }
    }

    struct Valuations(Result<Vec<ValuationPoint>>);

    impl ValuationProvider for Valuations {
        fn valuation_history(
            &self,
            _ticker: &str,
            _lookback_days: usize,
        ) -> Result<Vec<ValuationPoint>> {
            self.0.clone()
        }
    }

    fn bars(n: u64) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let c = 20.0 + (i as f64 * 0.2).sin();
                Bar::new(start() + Days::new(i), c, c + 0.2, c - 0.2, c, 5_000)
            })
            .collect()
    }

    fn analyzer(market: impl MarketDataProvider + 'static) -> Analyzer {
        Analyzer::new(EngineBuilder::new().build().unwrap(), market)
    }

    #[test]
    fn test_request_validation() {
        assert!(AnalysisRequest::new("0050").validate().is_ok());
        assert!(AnalysisRequest::new("  ").validate().is_err());
        assert!(matches!(
            AnalysisRequest::new("0050").with_lookback_days(30).validate(),
            Err(AnalysisError::OutOfRange { field: "lookback_days", .. })
        ));
    }

    #[test]
    fn test_market_failure_is_fatal() {
        let err = analyzer(FailingBars)
            .run(&AnalysisRequest::new("0050"))
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::CollaboratorUnavailable { collaborator: "market data", .. }
        ));
    }

    #[test]
    fn test_empty_market_data_is_fatal() {
        let err = analyzer(FixedBars(Vec::new()))
            .run(&AnalysisRequest::new("0050"))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::CollaboratorUnavailable { .. }));
    }

    #[test]
    fn test_missing_providers_mark_sections_unavailable() {
        let report = analyzer(FixedBars(bars(100)))
            .run(&AnalysisRequest::new("0050"))
            .unwrap();
        assert!(!report.flow.is_available());
        assert!(!report.valuation.is_available());
        assert!(!report.valuation_history.is_available());
    }

    #[test]
    fn test_flow_lookup_walks_back_past_errors() {
        let data = bars(100);
        let last = data[99].date;
        let published = data[96].date;
        let requested = Arc::new(Mutex::new(Vec::new()));
        let flow = RecordingFlow {
            published,
            broken: Some(last),
            requested: Arc::clone(&requested),
        };
        let analyzer = analyzer(FixedBars(data)).with_flow_provider(flow);
        let report = analyzer.run(&AnalysisRequest::new("0050")).unwrap();

        let reading = report.flow.available().unwrap();
        assert_eq!(reading.flow.date, published);
        assert_eq!(reading.score.total, 3);
        assert_eq!(requested.lock().len(), 4);
    }

    #[test]
    fn test_flow_lookup_gives_up_after_window() {
        let data = bars(100);
        let requested = Arc::new(Mutex::new(Vec::new()));
        let flow = RecordingFlow {
            published: data[10].date,
            broken: None,
            requested: Arc::clone(&requested),
        };
        let expected: Vec<NaiveDate> = data[97..].iter().rev().map(|b| b.date).collect();
        let analyzer = analyzer(FixedBars(data)).with_flow_lookback_days(3);
        let analyzer = analyzer.with_flow_provider(flow);
        let report = analyzer.run(&AnalysisRequest::new("0050")).unwrap();
        assert!(!report.flow.is_available());
        assert_eq!(*requested.lock(), expected);
    }

    #[test]
    fn test_valuation_provider_paths() {
        let point = ValuationPoint {
            date: start(),
            per: 12.0,
            pbr: 0.9,
        };
        let ok = analyzer(FixedBars(bars(100)))
            .with_valuation_provider(Valuations(Ok(vec![point])));
        let report = ok.run(&AnalysisRequest::new("0050")).unwrap();
        assert!(report.valuation_history.is_available());

        let failing = analyzer(FixedBars(bars(100))).with_valuation_provider(Valuations(Err(
            AnalysisError::InvalidValue("http 503"),
        )));
        let report = failing.run(&AnalysisRequest::new("0050")).unwrap();
        assert!(!report.valuation_history.is_available());

        let empty = analyzer(FixedBars(bars(100))).with_valuation_provider(Valuations(Ok(vec![])));
        let report = empty.run(&AnalysisRequest::new("0050")).unwrap();
        assert!(!report.valuation_history.is_available());
    }

    #[test]
    fn test_request_nav_and_live_price_flow_through() {
        let report = analyzer(FixedBars(bars(100)))
            .run(
                &AnalysisRequest::new("0050")
                    .with_nav(26.5)
                    .with_live_price(21.0),
            )
            .unwrap();
        assert_eq!(report.quote.price, 21.0);
        assert!(report.quote.overridden);
        let score = report.valuation.available().unwrap();
        assert_eq!(score.nav, 26.5);
        assert_eq!(score.price, 21.0);
    }
}
