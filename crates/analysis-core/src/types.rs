use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::AnalysisError;

/// One trading day of OHLCV data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PricePoint {
    /// Build a validated point. Non-finite or negative values are rejected so
    /// they never reach a rolling window.
    pub fn new(
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, AnalysisError> {
        let fields = [
            ("open", open),
            ("high", high),
            ("low", low),
            ("close", close),
            ("volume", volume),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(AnalysisError::InvalidData(format!(
                    "{} on {} is not finite ({})",
                    name, date, value
                )));
            }
            if value < 0.0 {
                return Err(AnalysisError::InvalidData(format!(
                    "{} on {} is negative ({})",
                    name, date, value
                )));
            }
        }

        Ok(Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// Point with open == high == low == close, handy for close-only series
    pub fn flat(date: NaiveDate, close: f64) -> Result<Self, AnalysisError> {
        Self::new(date, close, close, close, close, 0.0)
    }
}

/// Check that a series is strictly ascending by date and holds only finite values.
pub fn validate_series(points: &[PricePoint]) -> Result<(), AnalysisError> {
    for point in points {
        if ![point.open, point.high, point.low, point.close, point.volume]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(AnalysisError::InvalidData(format!(
                "non-finite value on {}",
                point.date
            )));
        }
    }

    for pair in points.windows(2) {
        if pair[1].date <= pair[0].date {
            return Err(AnalysisError::InvalidData(format!(
                "series not strictly ascending: {} followed by {}",
                pair[0].date, pair[1].date
            )));
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiInterpretation {
    Oversold,
    Neutral,
    Overbought,
}

impl RsiInterpretation {
    pub fn from_rsi(rsi: f64) -> Self {
        if rsi < 30.0 {
            RsiInterpretation::Oversold
        } else if rsi > 70.0 {
            RsiInterpretation::Overbought
        } else {
            RsiInterpretation::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityLevel {
    Low,
    Normal,
    High,
}

impl VolatilityLevel {
    pub fn from_volatility(volatility: f64) -> Self {
        if volatility < 0.20 {
            VolatilityLevel::Low
        } else if volatility < 0.40 {
            VolatilityLevel::Normal
        } else {
            VolatilityLevel::High
        }
    }
}

/// Indicators for the most recent point of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub symbol: String,
    pub date: NaiveDate,
    pub close: f64,
    pub ma_7: Option<f64>,
    pub ma_20: Option<f64>,
    pub rsi_14: Option<f64>,
    pub volatility_20d: Option<f64>,
    pub daily_return: Option<f64>,
    pub rsi_interpretation: Option<RsiInterpretation>,
    pub volatility_level: Option<VolatilityLevel>,
}

/// One row of the full indicator history used by the dashboard chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub daily_return: Option<f64>,
    pub ma_7: Option<f64>,
    pub ma_20: Option<f64>,
    pub volatility_20d: Option<f64>,
    pub rsi_14: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_price: f64,
}

/// Linear-trend forecast over the tail of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub symbol: String,
    pub model: String,
    pub lookback_days: usize,
    pub forecast_days: usize,
    pub trend: Trend,
    pub slope_per_day: f64,
    pub intercept: f64,
    /// Mean of the closes the line was fitted on
    pub mean_close: f64,
    pub r_squared: f64,
    /// 0 to 100
    pub confidence: f64,
    pub forecast: Vec<ForecastPoint>,
}

impl PredictionResult {
    pub fn forecast_prices(&self) -> Vec<f64> {
        self.forecast.iter().map(|p| p.predicted_price).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentInterpretation {
    StrongBullish,
    Bullish,
    Neutral,
    Bearish,
    StrongBearish,
}

impl SentimentInterpretation {
    /// Lower bound of every band is inclusive: 80.0 is strong_bullish, 60.0 bullish, ...
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 80.0 => SentimentInterpretation::StrongBullish,
            s if s >= 60.0 => SentimentInterpretation::Bullish,
            s if s >= 40.0 => SentimentInterpretation::Neutral,
            s if s >= 20.0 => SentimentInterpretation::Bearish,
            _ => SentimentInterpretation::StrongBearish,
        }
    }

    /// Human-readable label for the dashboard
    pub fn to_label(&self) -> &'static str {
        match self {
            SentimentInterpretation::StrongBullish => "Strong Buy Signal",
            SentimentInterpretation::Bullish => "Bullish",
            SentimentInterpretation::Neutral => "Neutral",
            SentimentInterpretation::Bearish => "Bearish",
            SentimentInterpretation::StrongBearish => "Strong Sell Signal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentComponent {
    pub score: f64,
    pub weight: f64,
    /// True when the input was unavailable and the neutral 50 was substituted
    pub defaulted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentComponents {
    pub rsi: SentimentComponent,
    pub volatility: SentimentComponent,
    pub momentum: SentimentComponent,
    pub daily_change: SentimentComponent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub symbol: String,
    pub sentiment_score: f64,
    pub label: String,
    pub interpretation: SentimentInterpretation,
    pub components: SentimentComponents,
}

/// 52-week summary statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSummary {
    pub symbol: String,
    pub current_price: f64,
    pub high_52w: f64,
    pub low_52w: f64,
    pub avg_close: f64,
    pub change_52w_pct: Option<f64>,
    pub volatility: Option<f64>,
    pub rsi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub stock1: PriceSummary,
    pub stock2: PriceSummary,
    /// Pearson correlation of closes on common dates (-1 to 1)
    pub correlation: Option<f64>,
    pub volatility_ratio: Option<f64>,
}

/// A tracked company as listed in the `companies` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub symbol: String,
    pub name: String,
    pub sector: Option<String>,
}

/// One symbol's move on the latest trading day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mover {
    pub symbol: String,
    pub name: String,
    pub close: f64,
    /// Intraday return in percent, rounded to two decimals
    pub change_pct: f64,
}

/// Every symbol trading on `date`, strongest move first
#[derive(Debug, Clone, PartialEq)]
pub struct MoverRanking {
    pub date: NaiveDate,
    pub ranked: Vec<Mover>,
}

impl MoverRanking {
    /// The `limit` best and worst movers; the same symbol can appear in both
    /// lists when fewer than `2 * limit` symbols traded.
    pub fn top(&self, limit: usize) -> TopMovers {
        TopMovers {
            date: self.date,
            gainers: self.ranked.iter().take(limit).cloned().collect(),
            losers: self.ranked.iter().rev().take(limit).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopMovers {
    pub date: NaiveDate,
    pub gainers: Vec<Mover>,
    pub losers: Vec<Mover>,
}

/// Result of a storage health check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreStatus {
    pub companies_tracked: usize,
    pub latest_data_date: Option<NaiveDate>,
}

/// Symbols are matched case-insensitively and without surrounding whitespace
pub fn normalize_symbol(symbol: &str) -> Result<String, AnalysisError> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(AnalysisError::InvalidData("symbol must not be empty".to_string()));
    }
    Ok(symbol)
}
