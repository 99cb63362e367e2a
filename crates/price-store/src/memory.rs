use analysis_core::{
    normalize_symbol, validate_series, AnalysisError, AnalysisResult, Company, PricePoint, PriceStore,
};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Price history held in memory, one date-ordered map per symbol.
///
/// Besides serving demos it doubles as a test double for the engine:
/// `fetch_count` reports how often prices were fetched, `with_latency` delays
/// every fetch and `set_unavailable` makes every read fail.
#[derive(Debug, Default)]
pub struct InMemoryPriceStore {
    series: DashMap<String, BTreeMap<NaiveDate, PricePoint>>,
    companies: DashMap<String, Company>,
    fetch_count: AtomicUsize,
    latency: Option<Duration>,
    unavailable: AtomicBool,
}

impl InMemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every `fetch_recent` by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Add one point. A point for a date already present replaces it.
    pub fn insert(&self, symbol: &str, point: PricePoint) -> Result<(), AnalysisError> {
        let symbol = normalize_symbol(symbol)?;
        validate_series(std::slice::from_ref(&point))?;
        self.series.entry(symbol).or_default().insert(point.date, point);
        Ok(())
    }

    /// Add many points at once; nothing is stored if any point is invalid.
    pub fn insert_series(
        &self,
        symbol: &str,
        points: impl IntoIterator<Item = PricePoint>,
    ) -> Result<usize, AnalysisError> {
        let symbol = normalize_symbol(symbol)?;
        let points: Vec<PricePoint> = points.into_iter().collect();
        for point in &points {
            validate_series(std::slice::from_ref(point))?;
        }

        let count = points.len();
        let mut entry = self.series.entry(symbol.clone()).or_default();
        for point in points {
            entry.insert(point.date, point);
        }
        tracing::debug!("Stored {} points for {}", count, symbol);
        Ok(count)
    }

    /// Register company master data; replaces an earlier entry for the symbol.
    pub fn add_company(&self, symbol: &str, name: &str, sector: Option<&str>) -> Result<(), AnalysisError> {
        let symbol = normalize_symbol(symbol)?;
        self.companies.insert(
            symbol.clone(),
            Company {
                symbol,
                name: name.to_string(),
                sector: sector.map(str::to_string),
            },
        );
        Ok(())
    }

    /// Number of `fetch_recent` calls served so far, failed ones included
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> AnalysisResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AnalysisError::UpstreamUnavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PriceStore for InMemoryPriceStore {
    async fn fetch_recent(
        &self,
        symbol: &str,
        as_of: NaiveDate,
        days: i64,
    ) -> AnalysisResult<Vec<PricePoint>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.check_available()?;
        if days <= 0 {
            return Ok(Vec::new());
        }

        let start = as_of - ChronoDuration::days(days);
        let points = self
            .series
            .get(&normalize_symbol(symbol)?)
            .map(|series| {
                series
                    .range((Bound::Excluded(start), Bound::Included(as_of)))
                    .map(|(_, p)| p.clone())
                    .collect()
            })
            .unwrap_or_default();

        Ok(points)
    }

    async fn list_symbols(&self) -> AnalysisResult<Vec<String>> {
        self.check_available()?;
        let mut symbols: Vec<String> = self
            .series
            .iter()
            .filter(|e| !e.value().is_empty())
            .map(|e| e.key().clone())
            .collect();
        symbols.sort();
        Ok(symbols)
    }

    async fn list_companies(&self) -> AnalysisResult<Vec<Company>> {
        self.check_available()?;
        let mut companies: Vec<Company> = self.companies.iter().map(|e| e.value().clone()).collect();
        companies.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(companies)
    }

    async fn latest_date(&self) -> AnalysisResult<Option<NaiveDate>> {
        self.check_available()?;
        Ok(self
            .series
            .iter()
            .filter_map(|e| e.value().keys().next_back().copied())
            .max())
    }
}
