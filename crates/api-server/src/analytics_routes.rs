//! Read-only analytics endpoints

use analysis_core::{
    Company, Comparison, IndicatorPoint, IndicatorSet, PredictionResult, PriceSummary,
    SentimentScore, TopMovers,
};
use anyhow::anyhow;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, AppError, AppState};

/// Rows returned by `/data/:symbol` when `days` is not given
pub const DEFAULT_DAYS: i64 = 30;
pub const MAX_DAYS: i64 = 365;
pub const DEFAULT_MOVERS: i64 = 5;
pub const MAX_MOVERS: i64 = 20;

#[derive(Deserialize)]
pub struct CompareQuery {
    pub symbol1: String,
    pub symbol2: String,
}

#[derive(Deserialize)]
pub struct DaysQuery {
    pub days: Option<i64>,
}

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub companies_tracked: Option<usize>,
    pub latest_data_date: Option<NaiveDate>,
    pub as_of: NaiveDate,
    pub cache_entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct CacheClearResponse {
    pub cleared: usize,
}

/// Query parameters outside their range are rejected with 422
fn bounded_param(name: &str, value: Option<i64>, default: i64, max: i64) -> Result<usize, AppError> {
    let value = value.unwrap_or(default);
    if !(1..=max).contains(&value) {
        return Err(AppError::with_status(
            StatusCode::UNPROCESSABLE_ENTITY,
            anyhow!("{} must be between 1 and {}, got {}", name, max, value),
        ));
    }
    Ok(value as usize)
}

pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/companies", get(get_companies))
        .route("/analytics/:symbol", get(get_analytics))
        .route("/data/:symbol", get(get_data))
        .route("/prediction/:symbol", get(get_prediction))
        .route("/sentiment/:symbol", get(get_sentiment))
        .route("/summary/:symbol", get(get_summary))
        .route("/compare", get(compare))
        .route("/top-movers", get(top_movers))
        .route("/health", get(health))
        .route("/cache/clear", post(clear_cache))
}

async fn get_companies(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Company>>>, AppError> {
    let companies = state.engine.list_companies().await?;
    Ok(Json(ApiResponse::success(companies.to_vec())))
}

/// Latest indicators
async fn get_analytics(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<IndicatorSet>>, AppError> {
    let indicators = state.engine.get_indicators(&symbol).await?;
    Ok(Json(ApiResponse::success(indicators)))
}

/// Indicator history for charting: the last `days` trading days, oldest first
async fn get_data(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<ApiResponse<Vec<IndicatorPoint>>>, AppError> {
    let days = bounded_param("days", query.days, DEFAULT_DAYS, MAX_DAYS)?;
    let series = state.engine.get_indicator_series(&symbol).await?;
    let start = series.len().saturating_sub(days);
    Ok(Json(ApiResponse::success(series[start..].to_vec())))
}

/// `data` is null when there is not enough history for a forecast
async fn get_prediction(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<Option<PredictionResult>>>, AppError> {
    let prediction = state.engine.get_prediction(&symbol).await?;
    Ok(Json(ApiResponse::success(prediction)))
}

async fn get_sentiment(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<Option<SentimentScore>>>, AppError> {
    let sentiment = state.engine.get_sentiment(&symbol).await?;
    Ok(Json(ApiResponse::success(sentiment)))
}

async fn get_summary(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<PriceSummary>>, AppError> {
    let summary = state.engine.get_summary(&symbol).await?;
    Ok(Json(ApiResponse::success(summary)))
}

async fn compare(
    State(state): State<AppState>,
    Query(query): Query<CompareQuery>,
) -> Result<Json<ApiResponse<Comparison>>, AppError> {
    let comparison = state.engine.compare(&query.symbol1, &query.symbol2).await?;
    Ok(Json(ApiResponse::success(comparison)))
}

async fn top_movers(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ApiResponse<TopMovers>>, AppError> {
    let limit = bounded_param("limit", query.limit, DEFAULT_MOVERS, MAX_MOVERS)?;
    let movers = state.engine.top_movers(limit).await?;
    Ok(Json(ApiResponse::success(movers)))
}

/// Always answers 200; a failed store check is reported in the body
async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let engine = &state.engine;
    let response = match engine.store_status().await {
        Ok(status) => HealthResponse {
            status: "healthy",
            database: "connected",
            companies_tracked: Some(status.companies_tracked),
            latest_data_date: status.latest_data_date,
            as_of: engine.as_of(),
            cache_entries: engine.cache().len(),
            error: None,
        },
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            HealthResponse {
                status: "unhealthy",
                database: "error",
                companies_tracked: None,
                latest_data_date: None,
                as_of: engine.as_of(),
                cache_entries: engine.cache().len(),
                error: Some(e.to_string()),
            }
        }
    };
    Json(ApiResponse::success(response))
}

async fn clear_cache(State(state): State<AppState>) -> Json<ApiResponse<CacheClearResponse>> {
    let cleared = state.engine.cache().len();
    state.engine.clear_cache();
    Json(ApiResponse::success(CacheClearResponse { cleared }))
}
