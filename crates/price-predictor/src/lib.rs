//! Linear-trend price forecasting.
//!
//! Fits an ordinary least-squares line through the last `LOOKBACK_DAYS`
//! closes (x = trading-day index) and extrapolates it `FORECAST_DAYS` ahead.

use analysis_core::{ForecastPoint, PredictionResult, PricePoint, Trend};
use chrono::{Datelike, Duration, NaiveDate, Weekday};

pub mod regression;
pub use regression::{fit_index_series, LinearFit};

pub const LOOKBACK_DAYS: usize = 60;
pub const FORECAST_DAYS: usize = 7;
/// Slopes within this fraction of the mean close per day count as flat
pub const TREND_EPSILON_RATIO: f64 = 1e-4;

#[derive(Debug, Clone, Copy)]
pub struct PredictionModel {
    lookback: usize,
    horizon: usize,
}

impl PredictionModel {
    pub fn new() -> Self {
        Self {
            lookback: LOOKBACK_DAYS,
            horizon: FORECAST_DAYS,
        }
    }

    /// Forecast from the tail of `points`; `None` when fewer than 60 points exist.
    pub fn predict(&self, symbol: &str, points: &[PricePoint]) -> Option<PredictionResult> {
        if points.len() < self.lookback {
            tracing::debug!(
                "Insufficient history for {} prediction: {} < {}",
                symbol,
                points.len(),
                self.lookback
            );
            return None;
        }

        let window = &points[points.len() - self.lookback..];
        let closes: Vec<f64> = window.iter().map(|p| p.close).collect();
        let fit = fit_index_series(&closes)?;

        let trend = classify_trend(&fit);
        let confidence = (fit.r_squared * 100.0).clamp(0.0, 100.0);

        let last_date = window[window.len() - 1].date;
        let forecast = next_trading_days(last_date, self.horizon)
            .into_iter()
            .enumerate()
            .map(|(i, date)| ForecastPoint {
                date,
                predicted_price: fit.value_at((self.lookback + i) as f64),
            })
            .collect();

        Some(PredictionResult {
            symbol: symbol.to_string(),
            model: "linear_regression".to_string(),
            lookback_days: self.lookback,
            forecast_days: self.horizon,
            trend,
            slope_per_day: fit.slope,
            intercept: fit.intercept,
            mean_close: fit.mean_y,
            r_squared: fit.r_squared,
            confidence,
            forecast,
        })
    }
}

impl Default for PredictionModel {
    fn default() -> Self {
        Self::new()
    }
}

fn classify_trend(fit: &LinearFit) -> Trend {
    if fit.degenerate {
        return Trend::Neutral;
    }
    let epsilon = TREND_EPSILON_RATIO * fit.mean_y.abs();
    if fit.slope > epsilon {
        Trend::Bullish
    } else if fit.slope < -epsilon {
        Trend::Bearish
    } else {
        Trend::Neutral
    }
}

/// The next `count` weekdays strictly after `from`
pub fn next_trading_days(from: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(count);
    let mut date = from;
    while days.len() < count {
        date += Duration::days(1);
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(date);
        }
    }
    days
}
