use analysis_core::{
    AnalysisError, Company, IndicatorPoint, IndicatorSet, MoverRanking, PredictionResult,
    PricePoint, PriceSummary, SentimentScore,
};
use chrono::NaiveDate;
use std::sync::Arc;
use ttl_cache::CacheError;

/// What a cache entry holds; the first segment of its key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Prices,
    Indicators,
    Series,
    Prediction,
    Sentiment,
    Summary,
    Companies,
    Movers,
}

/// Symbol slot used for entries that span every symbol
pub const ALL_SYMBOLS: &str = "*";

impl CacheKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::Prices => "prices",
            CacheKind::Indicators => "indicators",
            CacheKind::Series => "series",
            CacheKind::Prediction => "prediction",
            CacheKind::Sentiment => "sentiment",
            CacheKind::Summary => "summary",
            CacheKind::Companies => "companies",
            CacheKind::Movers => "movers",
        }
    }
}

/// `"{kind}:{SYMBOL}:{YYYY-MM-DD}"`
pub fn cache_key(kind: CacheKind, symbol: &str, as_of: NaiveDate) -> String {
    format!("{}:{}:{}", kind.as_str(), symbol, as_of.format("%Y-%m-%d"))
}

#[derive(Debug, Clone)]
pub enum CachedData {
    Prices(Arc<Vec<PricePoint>>),
    Indicators(IndicatorSet),
    Series(Arc<Vec<IndicatorPoint>>),
    Prediction(Option<PredictionResult>),
    Sentiment(Option<SentimentScore>),
    Summary(PriceSummary),
    Companies(Arc<Vec<Company>>),
    Movers(Arc<MoverRanking>),
}

impl CachedData {
    pub fn kind(&self) -> CacheKind {
        match self {
            CachedData::Prices(_) => CacheKind::Prices,
            CachedData::Indicators(_) => CacheKind::Indicators,
            CachedData::Series(_) => CacheKind::Series,
            CachedData::Prediction(_) => CacheKind::Prediction,
            CachedData::Sentiment(_) => CacheKind::Sentiment,
            CachedData::Summary(_) => CacheKind::Summary,
            CachedData::Companies(_) => CacheKind::Companies,
            CachedData::Movers(_) => CacheKind::Movers,
        }
    }
}

/// A cache entry tagged with the symbol it was computed for
#[derive(Debug, Clone)]
pub struct CachedValue {
    pub symbol: String,
    pub data: CachedData,
}

impl CachedValue {
    pub fn new(symbol: impl Into<String>, data: CachedData) -> Self {
        Self {
            symbol: symbol.into(),
            data,
        }
    }

    /// Structural check against the key the entry was read from
    pub fn verify(&self, kind: CacheKind, symbol: &str) -> Result<(), AnalysisError> {
        if self.data.kind() != kind {
            return Err(AnalysisError::CacheCorruption(format!(
                "expected {} entry for {}, found {}",
                kind.as_str(),
                symbol,
                self.data.kind().as_str()
            )));
        }
        if self.symbol != symbol {
            return Err(AnalysisError::CacheCorruption(format!(
                "{} entry for {} holds data for {}",
                kind.as_str(),
                symbol,
                self.symbol
            )));
        }
        Ok(())
    }
}

/// Error type for cache fills. Wraps `AnalysisError` so an aborted fill can
/// be folded into it.
#[derive(Debug)]
pub(crate) struct FillError(pub(crate) AnalysisError);

impl From<CacheError> for FillError {
    fn from(e: CacheError) -> Self {
        FillError(AnalysisError::CacheError(e.to_string()))
    }
}

impl From<AnalysisError> for FillError {
    fn from(e: AnalysisError) -> Self {
        FillError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_format() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(
            cache_key(CacheKind::Indicators, "RELIANCE.NS", date),
            "indicators:RELIANCE.NS:2024-05-01"
        );
    }

    #[test]
    fn test_verify_detects_wrong_variant_and_symbol() {
        let value = CachedValue::new("TCS.NS", CachedData::Prediction(None));

        assert!(value.verify(CacheKind::Prediction, "TCS.NS").is_ok());
        assert!(matches!(
            value.verify(CacheKind::Sentiment, "TCS.NS"),
            Err(AnalysisError::CacheCorruption(_))
        ));
        assert!(matches!(
            value.verify(CacheKind::Prediction, "INFY.NS"),
            Err(AnalysisError::CacheCorruption(_))
        ));
    }
}
