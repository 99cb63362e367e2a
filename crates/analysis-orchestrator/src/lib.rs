use analysis_core::{
    normalize_symbol, validate_series, AnalysisError, Company, Comparison, IndicatorPoint,
    IndicatorSet, MoverRanking, PredictionResult, PricePoint, PriceStore, PriceSummary,
    SentimentScore, StoreStatus, TopMovers,
};
use chrono::{NaiveDate, Utc};
use price_predictor::PredictionModel;
use sentiment_analysis::SentimentScorer;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use technical_analysis::IndicatorEngine;
use tokio::task::JoinSet;
use ttl_cache::TtlCache;

pub mod cached;
pub mod config;

use cached::FillError;
pub use cached::{cache_key, CacheKind, CachedData, CachedValue, ALL_SYMBOLS};
pub use config::EngineConfig;

/// Cache-first facade over a `PriceStore`.
///
/// Every result is cached under `"{kind}:{SYMBOL}:{as_of}"`; the raw price
/// series is cached as well, so one storage fetch serves every derived
/// metric of a symbol for the TTL. Cloning is cheap and shares the cache.
#[derive(Clone)]
pub struct AnalyticsEngine {
    store: Arc<dyn PriceStore>,
    cache: TtlCache<CachedValue>,
    config: EngineConfig,
    indicators: IndicatorEngine,
    predictor: PredictionModel,
    scorer: SentimentScorer,
    /// Pinned reference date; `None` follows the UTC calendar
    as_of: Option<NaiveDate>,
}

impl AnalyticsEngine {
    pub fn new(store: Arc<dyn PriceStore>, cache: TtlCache<CachedValue>, config: EngineConfig) -> Self {
        Self {
            store,
            cache,
            config,
            indicators: IndicatorEngine::new(),
            predictor: PredictionModel::new(),
            scorer: SentimentScorer::new(),
            as_of: None,
        }
    }

    /// Build the cache from `config` (bounded when `cache_max_entries` is set)
    pub fn with_config(store: Arc<dyn PriceStore>, config: EngineConfig) -> Self {
        let cache = match config.cache_max_entries {
            Some(max) => TtlCache::bounded(config.cache_ttl, max),
            None => TtlCache::new(config.cache_ttl),
        };
        Self::new(store, cache, config)
    }

    /// Evaluate every request as of `date` instead of today
    pub fn with_as_of_date(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &TtlCache<CachedValue> {
        &self.cache
    }

    pub fn clear_cache(&self) {
        let dropped = self.cache.len();
        self.cache.clear();
        tracing::info!("Cleared analytics cache ({} entries)", dropped);
    }

    /// Indicators for the most recent trading day
    pub async fn get_indicators(&self, symbol: &str) -> Result<IndicatorSet, AnalysisError> {
        let (engine, symbol) = self.begin("indicators", symbol)?;
        engine.indicators_for(&symbol).await
    }

    /// Indicators for every day of the loaded history
    pub async fn get_indicator_series(&self, symbol: &str) -> Result<Arc<Vec<IndicatorPoint>>, AnalysisError> {
        let (engine, symbol) = self.begin("indicator series", symbol)?;
        engine
            .cached(
                CacheKind::Series,
                &symbol,
                |d| match d {
                    CachedData::Series(s) => Some(s),
                    _ => None,
                },
                |engine, symbol| async move {
                    let prices = engine.prices(&symbol).await?;
                    let series = engine.indicators.series(&prices)?;
                    Ok::<_, AnalysisError>(CachedData::Series(Arc::new(series)))
                },
            )
            .await
    }

    /// Seven-day linear forecast; `None` with fewer than 60 points of history
    pub async fn get_prediction(&self, symbol: &str) -> Result<Option<PredictionResult>, AnalysisError> {
        let (engine, symbol) = self.begin("prediction", symbol)?;
        engine.prediction_for(&symbol).await
    }

    /// Composite sentiment; `None` while RSI is unavailable (fewer than 15 points)
    pub async fn get_sentiment(&self, symbol: &str) -> Result<Option<SentimentScore>, AnalysisError> {
        let (engine, symbol) = self.begin("sentiment", symbol)?;
        engine
            .cached(
                CacheKind::Sentiment,
                &symbol,
                |d| match d {
                    CachedData::Sentiment(s) => Some(s),
                    _ => None,
                },
                |engine, symbol| async move {
                    let indicators = engine.indicators_for(&symbol).await?;
                    if indicators.rsi_14.is_none() {
                        tracing::debug!("No sentiment for {}: RSI unavailable", symbol);
                        return Ok(CachedData::Sentiment(None));
                    }
                    let prediction = engine.prediction_for(&symbol).await?;
                    let score = engine.scorer.score(&symbol, &indicators, prediction.as_ref());
                    Ok::<_, AnalysisError>(CachedData::Sentiment(Some(score)))
                },
            )
            .await
    }

    /// 52-week high/low/average with the latest volatility and RSI
    pub async fn get_summary(&self, symbol: &str) -> Result<PriceSummary, AnalysisError> {
        let (engine, symbol) = self.begin("summary", symbol)?;
        engine.summary_for(&symbol).await
    }

    /// Side-by-side summaries plus close-price correlation and volatility ratio
    pub async fn compare(&self, first: &str, second: &str) -> Result<Comparison, AnalysisError> {
        let (engine, first) = self.begin("comparison", first)?;
        let second = normalize_symbol(second)?;

        let (stock1, stock2) = tokio::try_join!(engine.summary_for(&first), engine.summary_for(&second))?;
        let (prices1, prices2) = tokio::try_join!(engine.prices(&first), engine.prices(&second))?;

        let correlation = engine.indicators.correlation(&prices1, &prices2);
        let volatility_ratio = match (stock1.volatility, stock2.volatility) {
            (Some(v1), Some(v2)) if v2 != 0.0 => Some(v1 / v2),
            _ => None,
        };

        Ok(Comparison {
            stock1,
            stock2,
            correlation,
            volatility_ratio,
        })
    }

    /// Tracked companies, sorted by symbol
    pub async fn list_companies(&self) -> Result<Arc<Vec<Company>>, AnalysisError> {
        let engine = self.pinned();
        tracing::info!("company list requested (as of {})", engine.as_of());
        engine.companies().await
    }

    /// Best and worst `limit` intraday moves on the latest trading date
    pub async fn top_movers(&self, limit: usize) -> Result<TopMovers, AnalysisError> {
        if limit == 0 {
            return Err(AnalysisError::InvalidData("limit must be at least 1".to_string()));
        }
        let engine = self.pinned();
        tracing::info!("top {} movers requested (as of {})", limit, engine.as_of());

        let ranking = engine
            .cached(
                CacheKind::Movers,
                ALL_SYMBOLS,
                |d| match d {
                    CachedData::Movers(r) => Some(r),
                    _ => None,
                },
                |engine, _| async move {
                    let ranking = engine.rank_movers().await?;
                    Ok::<_, AnalysisError>(CachedData::Movers(Arc::new(ranking)))
                },
            )
            .await?;

        Ok(ranking.top(limit))
    }

    /// Uncached storage round trip for health checks
    pub async fn store_status(&self) -> Result<StoreStatus, AnalysisError> {
        let companies = self.guarded("company listing", self.store.list_companies()).await?;
        let latest_data_date = self.guarded("latest date lookup", self.store.latest_date()).await?;
        Ok(StoreStatus {
            companies_tracked: companies.len(),
            latest_data_date,
        })
    }

    /// Normalize the symbol and pin the reference date for one request, so
    /// every key and fetch it makes agrees on the day.
    fn begin(&self, what: &str, symbol: &str) -> Result<(Self, String), AnalysisError> {
        let symbol = normalize_symbol(symbol)?;
        let engine = self.pinned();
        tracing::info!("{} requested for {} (as of {})", what, symbol, engine.as_of());
        Ok((engine, symbol))
    }

    fn pinned(&self) -> Self {
        let mut engine = self.clone();
        engine.as_of = Some(self.as_of());
        engine
    }

    async fn companies(&self) -> Result<Arc<Vec<Company>>, AnalysisError> {
        self.cached(
            CacheKind::Companies,
            ALL_SYMBOLS,
            |d| match d {
                CachedData::Companies(c) => Some(c),
                _ => None,
            },
            |engine, _| async move {
                let companies = engine.guarded("company listing", engine.store.list_companies()).await?;
                Ok::<_, AnalysisError>(CachedData::Companies(Arc::new(companies)))
            },
        )
        .await
    }

    /// Latest point of every stored symbol, ranked. Each history comes from
    /// the shared price cache, so the scan also warms per-symbol lookups.
    async fn rank_movers(&self) -> Result<MoverRanking, AnalysisError> {
        let symbols = self.guarded("symbol listing", self.store.list_symbols()).await?;
        let names: HashMap<String, String> = self
            .companies()
            .await?
            .iter()
            .map(|c| (c.symbol.clone(), c.name.clone()))
            .collect();

        let mut scans = JoinSet::new();
        for symbol in symbols {
            let engine = self.clone();
            scans.spawn(async move {
                let prices = engine.prices(&symbol).await;
                (symbol, prices)
            });
        }

        let mut latest = Vec::new();
        while let Some(joined) = scans.join_next().await {
            let (symbol, prices) =
                joined.map_err(|e| AnalysisError::CacheError(format!("mover scan aborted: {}", e)))?;
            match prices {
                Ok(points) => {
                    if let Some(last) = points.last() {
                        latest.push((symbol, last.clone()));
                    }
                }
                // nothing inside the history window
                Err(AnalysisError::SymbolNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        tracing::debug!("Ranking {} symbols for top movers", latest.len());
        self.indicators
            .rank_movers(latest, &names)
            .ok_or_else(|| AnalysisError::UpstreamUnavailable("no trading data available".to_string()))
    }

    async fn indicators_for(&self, symbol: &str) -> Result<IndicatorSet, AnalysisError> {
        self.cached(
            CacheKind::Indicators,
            symbol,
            |d| match d {
                CachedData::Indicators(s) => Some(s),
                _ => None,
            },
            |engine, symbol| async move {
                let prices = engine.prices(&symbol).await?;
                let set = engine.indicators.latest(&symbol, &prices)?;
                Ok::<_, AnalysisError>(CachedData::Indicators(set))
            },
        )
        .await
    }

    async fn prediction_for(&self, symbol: &str) -> Result<Option<PredictionResult>, AnalysisError> {
        self.cached(
            CacheKind::Prediction,
            symbol,
            |d| match d {
                CachedData::Prediction(p) => Some(p),
                _ => None,
            },
            |engine, symbol| async move {
                let prices = engine.prices(&symbol).await?;
                Ok::<_, AnalysisError>(CachedData::Prediction(engine.predictor.predict(&symbol, &prices)))
            },
        )
        .await
    }

    async fn summary_for(&self, symbol: &str) -> Result<PriceSummary, AnalysisError> {
        self.cached(
            CacheKind::Summary,
            symbol,
            |d| match d {
                CachedData::Summary(s) => Some(s),
                _ => None,
            },
            |engine, symbol| async move {
                let prices = engine.prices(&symbol).await?;
                let summary = engine.indicators.summary(&symbol, &prices)?;
                Ok::<_, AnalysisError>(CachedData::Summary(summary))
            },
        )
        .await
    }

    async fn prices(&self, symbol: &str) -> Result<Arc<Vec<PricePoint>>, AnalysisError> {
        self.cached(
            CacheKind::Prices,
            symbol,
            |d| match d {
                CachedData::Prices(p) => Some(p),
                _ => None,
            },
            |engine, symbol| async move {
                let points = engine.load_prices(&symbol).await?;
                Ok::<_, AnalysisError>(CachedData::Prices(Arc::new(points)))
            },
        )
        .await
    }

    async fn load_prices(&self, symbol: &str) -> Result<Vec<PricePoint>, AnalysisError> {
        let as_of = self.as_of();
        let fetch = self.store.fetch_recent(symbol, as_of, self.config.history_days);
        let points = self.guarded(&format!("price fetch for {}", symbol), fetch).await?;

        if points.is_empty() {
            return Err(AnalysisError::SymbolNotFound(symbol.to_string()));
        }
        validate_series(&points)?;

        tracing::debug!("Loaded {} price points for {}", points.len(), symbol);
        Ok(points)
    }

    /// Run one storage call under the fetch timeout
    async fn guarded<T>(
        &self,
        what: &str,
        call: impl Future<Output = Result<T, AnalysisError>>,
    ) -> Result<T, AnalysisError> {
        let timeout = self.config.fetch_timeout;
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!("{} failed: {}", what, e);
                Err(upstream_error(e))
            }
            Err(_) => {
                tracing::warn!("{} timed out after {:?}", what, timeout);
                Err(AnalysisError::UpstreamTimeout(timeout))
            }
        }
    }

    /// Read-through lookup for one `(kind, symbol)` entry.
    ///
    /// A structurally wrong entry is logged, dropped and recomputed. `compute`
    /// runs on the cache's fill task; it is only called a second time when the
    /// value handed back by the cache still fails the check, and that result
    /// is returned without being cached.
    async fn cached<T, F, Fut>(
        &self,
        kind: CacheKind,
        symbol: &str,
        extract: fn(CachedData) -> Option<T>,
        compute: F,
    ) -> Result<T, AnalysisError>
    where
        F: Fn(AnalyticsEngine, String) -> Fut,
        Fut: Future<Output = Result<CachedData, AnalysisError>> + Send + 'static,
    {
        let key = cache_key(kind, symbol, self.as_of());

        if let Some(value) = self.cache.get(&key) {
            match checked(value, kind, symbol, extract) {
                Ok(hit) => {
                    tracing::debug!("Cache hit for {}", key);
                    return Ok(hit);
                }
                Err(e) => {
                    tracing::warn!("Dropping cache entry {}: {}", key, e);
                    self.cache.invalidate(&key);
                }
            }
        }

        let pending = compute(self.clone(), symbol.to_string());
        let owner = symbol.to_string();
        let fill = async move {
            let data = pending.await?;
            Ok::<_, FillError>(CachedValue::new(owner, data))
        };

        let value = self
            .cache
            .get_or_try_insert_with(&key, self.config.cache_ttl, move || fill)
            .await
            .map_err(|FillError(e)| e)?;

        match checked(value, kind, symbol, extract) {
            Ok(result) => Ok(result),
            Err(e) => {
                tracing::warn!("Dropping cache entry {}: {}", key, e);
                self.cache.invalidate(&key);
                let data = compute(self.clone(), symbol.to_string()).await?;
                extract(data).ok_or_else(|| {
                    AnalysisError::CacheCorruption(format!("computed wrong kind of value for {}", key))
                })
            }
        }
    }
}

fn checked<T>(
    value: CachedValue,
    kind: CacheKind,
    symbol: &str,
    extract: fn(CachedData) -> Option<T>,
) -> Result<T, AnalysisError> {
    value.verify(kind, symbol)?;
    extract(value.data).ok_or_else(|| {
        AnalysisError::CacheCorruption(format!("{} entry for {} failed to decode", kind.as_str(), symbol))
    })
}

/// Storage failures surface as upstream errors; data errors keep their kind
fn upstream_error(e: AnalysisError) -> AnalysisError {
    match e {
        AnalysisError::DatabaseError(msg) => AnalysisError::UpstreamUnavailable(msg),
        other => other,
    }
}
