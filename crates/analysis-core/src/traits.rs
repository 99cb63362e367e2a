use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{AnalysisResult, Company, PricePoint};

/// Storage collaborator that supplies raw daily history
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Points for `symbol` with `as_of - days < date <= as_of`, ascending by date.
    /// Non-trading days are simply absent.
    async fn fetch_recent(
        &self,
        symbol: &str,
        as_of: NaiveDate,
        days: i64,
    ) -> AnalysisResult<Vec<PricePoint>>;

    /// Every symbol with at least one stored price, sorted
    async fn list_symbols(&self) -> AnalysisResult<Vec<String>>;

    /// Company master data, sorted by symbol
    async fn list_companies(&self) -> AnalysisResult<Vec<Company>>;

    /// Most recent date with any stored price; `None` for an empty store
    async fn latest_date(&self) -> AnalysisResult<Option<NaiveDate>>;
}
