use analysis_core::stats::pearson_correlation;
use analysis_core::{
    validate_series, AnalysisError, IndicatorPoint, IndicatorSet, Mover, MoverRanking, PricePoint,
    PriceSummary, RsiInterpretation, VolatilityLevel,
};
use std::collections::HashMap;

use crate::indicators::*;

/// Minimum number of shared dates before a correlation is reported
pub const MIN_CORRELATION_OVERLAP: usize = 30;

/// Turns an ordered price history into technical indicators.
/// Stateless; every method is a pure function of its input.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorEngine;

impl IndicatorEngine {
    pub fn new() -> Self {
        Self
    }

    /// Indicators for the newest point of `points`
    pub fn latest(&self, symbol: &str, points: &[PricePoint]) -> Result<IndicatorSet, AnalysisError> {
        validate_series(points)?;
        let last = points.last().ok_or_else(|| {
            AnalysisError::InsufficientData(format!("no price points for {}", symbol))
        })?;

        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        let returns = daily_returns(points);

        let rsi_14 = rsi(&closes, RSI_WINDOW).last().copied();
        let volatility_20d = annualized_volatility(&returns, VOLATILITY_WINDOW);

        Ok(IndicatorSet {
            symbol: symbol.to_string(),
            date: last.date,
            close: last.close,
            ma_7: latest_sma(&closes, MA_WINDOW_7),
            ma_20: latest_sma(&closes, MA_WINDOW_20),
            rsi_14,
            volatility_20d,
            daily_return: daily_return(last),
            rsi_interpretation: rsi_14.map(RsiInterpretation::from_rsi),
            volatility_level: volatility_20d.map(VolatilityLevel::from_volatility),
        })
    }

    /// Indicators for every point; each value only looks at points up to its own date
    pub fn series(&self, points: &[PricePoint]) -> Result<Vec<IndicatorPoint>, AnalysisError> {
        validate_series(points)?;

        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        let returns = daily_returns(points);
        let ma_7 = sma_series(&closes, MA_WINDOW_7);
        let ma_20 = sma_series(&closes, MA_WINDOW_20);
        let rsi_14 = rsi_series(&closes, RSI_WINDOW);
        let volatility = volatility_series(&returns, VOLATILITY_WINDOW);

        Ok(points
            .iter()
            .enumerate()
            .map(|(i, p)| IndicatorPoint {
                date: p.date,
                open: p.open,
                high: p.high,
                low: p.low,
                close: p.close,
                volume: p.volume,
                daily_return: returns[i],
                ma_7: ma_7[i],
                ma_20: ma_20[i],
                volatility_20d: volatility[i],
                rsi_14: rsi_14[i],
            })
            .collect())
    }

    /// 52-week summary over the newest `WEEK_52_WINDOW` points
    pub fn summary(&self, symbol: &str, points: &[PricePoint]) -> Result<PriceSummary, AnalysisError> {
        let latest = self.latest(symbol, points)?;
        let stats = week_52_stats(points).ok_or_else(|| {
            AnalysisError::InsufficientData(format!("no price points for {}", symbol))
        })?;

        let change_52w_pct = if stats.first_close != 0.0 {
            Some((stats.last_close - stats.first_close) / stats.first_close * 100.0)
        } else {
            None
        };

        Ok(PriceSummary {
            symbol: symbol.to_string(),
            current_price: latest.close,
            high_52w: stats.high,
            low_52w: stats.low,
            avg_close: stats.avg_close,
            change_52w_pct,
            volatility: latest.volatility_20d,
            rsi: latest.rsi_14,
        })
    }

    /// Pearson correlation of closes on shared dates; `None` below `MIN_CORRELATION_OVERLAP`
    pub fn correlation(&self, a: &[PricePoint], b: &[PricePoint]) -> Option<f64> {
        let (xs, ys) = aligned_closes(a, b);
        if xs.len() < MIN_CORRELATION_OVERLAP {
            return None;
        }
        pearson_correlation(&xs, &ys)
    }

    /// Rank symbols by intraday return on the newest date any of them traded.
    ///
    /// `latest` holds each symbol's most recent point; symbols that did not
    /// trade on that date are left out. `names` maps symbols to display
    /// names, falling back to the symbol. `None` when `latest` is empty.
    pub fn rank_movers(
        &self,
        latest: Vec<(String, PricePoint)>,
        names: &HashMap<String, String>,
    ) -> Option<MoverRanking> {
        let date = latest.iter().map(|(_, p)| p.date).max()?;

        let mut moves: Vec<(f64, String, PricePoint)> = latest
            .into_iter()
            .filter(|(_, p)| p.date == date)
            .map(|(symbol, p)| (daily_return(&p).unwrap_or(0.0), symbol, p))
            .collect();
        moves.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        let ranked = moves
            .into_iter()
            .map(|(ret, symbol, p)| Mover {
                name: names.get(&symbol).cloned().unwrap_or_else(|| symbol.clone()),
                symbol,
                close: p.close,
                change_pct: (ret * 10_000.0).round() / 100.0,
            })
            .collect();

        Some(MoverRanking { date, ranked })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn series_from_closes(closes: &[f64]) -> Vec<PricePoint> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                PricePoint::new(start + Duration::days(i as i64), c * 0.99, c * 1.01, c * 0.98, c, 1_000.0)
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_latest_short_history_has_nulls() {
        let points = series_from_closes(&[100.0, 101.0, 102.0]);
        let set = IndicatorEngine::new().latest("INFY.NS", &points).unwrap();

        assert_eq!(set.close, 102.0);
        assert!(set.ma_7.is_none());
        assert!(set.ma_20.is_none());
        assert!(set.rsi_14.is_none());
        assert!(set.volatility_20d.is_none());
        assert!(set.rsi_interpretation.is_none());
        assert!(set.volatility_level.is_none());
        assert!(set.daily_return.is_some());
    }

    #[test]
    fn test_latest_matches_series_tail() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let points = series_from_closes(&closes);
        let engine = IndicatorEngine::new();

        let set = engine.latest("TCS.NS", &points).unwrap();
        let series = engine.series(&points).unwrap();
        let tail = series.last().unwrap();

        assert_eq!(series.len(), points.len());
        assert_eq!(set.date, tail.date);
        assert!((set.ma_7.unwrap() - tail.ma_7.unwrap()).abs() < 1e-9);
        assert!((set.ma_20.unwrap() - tail.ma_20.unwrap()).abs() < 1e-9);
        assert!((set.rsi_14.unwrap() - tail.rsi_14.unwrap()).abs() < 1e-9);
        assert!((set.volatility_20d.unwrap() - tail.volatility_20d.unwrap()).abs() < 1e-9);
    }

    #[test]
    fn test_series_window_boundaries() {
        let closes: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        let series = IndicatorEngine::new().series(&series_from_closes(&closes)).unwrap();

        assert!(series[5].ma_7.is_none());
        assert!(series[6].ma_7.is_some());
        assert!(series[18].ma_20.is_none());
        assert!(series[19].ma_20.is_some());
        assert!(series[13].rsi_14.is_none());
        assert!(series[14].rsi_14.is_some());
        assert!(series[18].volatility_20d.is_none());
        assert!(series[19].volatility_20d.is_some());
    }

    #[test]
    fn test_series_has_no_look_ahead() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i % 5) as f64).collect();
        let points = series_from_closes(&closes);
        let engine = IndicatorEngine::new();
        let full = engine.series(&points).unwrap();

        // appending a wild future point must not change any earlier value
        let mut extended = points.clone();
        let next_day = points.last().unwrap().date + Duration::days(1);
        extended.push(PricePoint::new(next_day, 500.0, 520.0, 10.0, 10.0, 1.0).unwrap());
        let with_future = engine.series(&extended).unwrap();

        assert_eq!(&with_future[..full.len()], &full[..]);
    }

    #[test]
    fn test_latest_rejects_unordered_series() {
        let mut points = series_from_closes(&[100.0, 101.0, 102.0]);
        points.swap(0, 2);
        let err = IndicatorEngine::new().latest("SBIN.NS", &points).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidData(_)));
    }

    #[test]
    fn test_latest_empty_is_insufficient() {
        let err = IndicatorEngine::new().latest("SBIN.NS", &[]).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData(_)));
    }

    #[test]
    fn test_zero_open_gives_null_return() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let points = vec![PricePoint::new(date, 0.0, 10.0, 0.0, 5.0, 1.0).unwrap()];
        let set = IndicatorEngine::new().latest("ITC.NS", &points).unwrap();
        assert!(set.daily_return.is_none());
    }

    #[test]
    fn test_summary() {
        let closes: Vec<f64> = (0..300).map(|i| 100.0 + i as f64).collect();
        let summary = IndicatorEngine::new()
            .summary("LT.NS", &series_from_closes(&closes))
            .unwrap();

        // last 252 closes: 148..=399
        assert_eq!(summary.high_52w, 399.0);
        assert_eq!(summary.low_52w, 148.0);
        assert!((summary.avg_close - 273.5).abs() < 1e-9);
        assert_eq!(summary.current_price, 399.0);
        let expected_change = (399.0 - 148.0) / 148.0 * 100.0;
        assert!((summary.change_52w_pct.unwrap() - expected_change).abs() < 1e-9);
    }

    #[test]
    fn test_correlation_requires_overlap() {
        let engine = IndicatorEngine::new();
        let a = series_from_closes(&(0..40).map(|i| 100.0 + i as f64).collect::<Vec<_>>());
        let b = series_from_closes(&(0..40).map(|i| 50.0 + 2.0 * i as f64).collect::<Vec<_>>());
        assert!((engine.correlation(&a, &b).unwrap() - 1.0).abs() < 1e-9);

        assert!(engine.correlation(&a[..20], &b[..20]).is_none());
    }

    #[test]
    fn test_rank_movers_uses_latest_date() {
        let day = |d: u32| NaiveDate::from_ymd_opt(2024, 5, d).unwrap();
        let point = |d: u32, open: f64, close: f64| {
            PricePoint::new(day(d), open, open.max(close), open.min(close), close, 100.0).unwrap()
        };
        let latest = vec![
            ("TCS.NS".to_string(), point(10, 100.0, 102.5)),
            ("INFY.NS".to_string(), point(10, 100.0, 98.0)),
            ("ITC.NS".to_string(), point(10, 50.0, 50.0)),
            // stale: last traded a day earlier
            ("LT.NS".to_string(), point(9, 100.0, 120.0)),
        ];
        let names = HashMap::from([("TCS.NS".to_string(), "Tata Consultancy Services".to_string())]);

        let ranking = IndicatorEngine::new().rank_movers(latest, &names).unwrap();
        assert_eq!(ranking.date, day(10));

        let symbols: Vec<&str> = ranking.ranked.iter().map(|m| m.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["TCS.NS", "ITC.NS", "INFY.NS"]);
        assert_eq!(ranking.ranked[0].name, "Tata Consultancy Services");
        assert_eq!(ranking.ranked[0].change_pct, 2.5);
        assert_eq!(ranking.ranked[2].name, "INFY.NS");
        assert_eq!(ranking.ranked[2].change_pct, -2.0);

        assert!(IndicatorEngine::new().rank_movers(Vec::new(), &names).is_none());
    }
}
