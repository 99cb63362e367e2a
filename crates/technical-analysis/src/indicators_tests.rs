#[cfg(test)]
mod tests {
    use super::super::indicators::*;
    use analysis_core::PricePoint;
    use chrono::{Duration, NaiveDate};

    // Helper function to create sample price data
    fn sample_prices() -> Vec<f64> {
        vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ]
    }

    // Helper function to create sample points from (open, close) pairs
    fn sample_points(pairs: &[(f64, f64)]) -> Vec<PricePoint> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        pairs
            .iter()
            .enumerate()
            .map(|(i, &(open, close))| {
                PricePoint::new(
                    start + Duration::days(i as i64),
                    open,
                    open.max(close) + 1.0,
                    (open.min(close) - 1.0).max(0.0),
                    close,
                    1_000_000.0,
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_sma_basic() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&data, 3);

        assert_eq!(result.len(), 3);
        assert!((result[0] - 2.0).abs() < 0.001); // (1+2+3)/3 = 2
        assert!((result[1] - 3.0).abs() < 0.001); // (2+3+4)/3 = 3
        assert!((result[2] - 4.0).abs() < 0.001); // (3+4+5)/3 = 4
    }

    #[test]
    fn test_sma_insufficient_data() {
        let data = vec![1.0, 2.0];
        assert_eq!(sma(&data, 5).len(), 0);
        assert_eq!(latest_sma(&data, 5), None);
        assert!(sma_series(&data, 5).iter().all(|v| v.is_none()));
    }

    #[test]
    fn test_sma_real_prices() {
        let prices = sample_prices();
        let result = sma(&prices, 5);

        assert!(!result.is_empty());
        // First SMA(5) should be average of first 5 prices
        let expected_first = (44.34 + 44.09 + 44.15 + 43.61 + 44.33) / 5.0;
        assert!((result[0] - expected_first).abs() < 0.01);
    }

    #[test]
    fn test_sma_constant_series() {
        let data = vec![250.0; 30];
        for window in [1, 7, 20, 30] {
            for value in sma(&data, window) {
                assert!((value - 250.0).abs() < 1e-9);
            }
            assert!((latest_sma(&data, window).unwrap() - 250.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_sma_series_alignment() {
        let data = vec![1.0, 2.0, 3.0, 4.0];
        let aligned = sma_series(&data, 2);
        assert_eq!(aligned, vec![None, Some(1.5), Some(2.5), Some(3.5)]);
    }

    #[test]
    fn test_rsi_null_below_fifteen_points() {
        for len in 0..15 {
            let data: Vec<f64> = (0..len).map(|i| 100.0 + i as f64).collect();
            assert!(rsi(&data, RSI_WINDOW).is_empty(), "len {}", len);
            assert!(rsi_series(&data, RSI_WINDOW).iter().all(|v| v.is_none()));
        }
    }

    #[test]
    fn test_rsi_basic() {
        let prices = sample_prices();
        let result = rsi(&prices, 14);

        // 20 prices: seed at index 14 plus 5 smoothed steps
        assert_eq!(result.len(), 6);
        for &value in &result {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_rsi_seed_scenario() {
        let closes = vec![
            100.0, 102.0, 101.0, 105.0, 107.0, 106.0, 110.0, 111.0, 109.0, 108.0, 112.0, 115.0,
            114.0, 117.0, 120.0,
        ];
        let result = rsi(&closes, RSI_WINDOW);
        assert_eq!(result.len(), 1);

        // gains sum to 26, losses to 6 over the 14 deltas
        let expected = 100.0 - 100.0 / (1.0 + 26.0 / 6.0);
        assert!((result[0] - expected).abs() < 1e-9);
        assert!(result[0] > 50.0);
        assert!(result[0] > 70.0);
        assert_eq!(
            analysis_core::RsiInterpretation::from_rsi(result[0]),
            analysis_core::RsiInterpretation::Overbought
        );
    }

    #[test]
    fn test_rsi_wilder_smoothing_step() {
        // 14 alternating deltas of +1/-1 then one +2 step
        let mut closes = vec![100.0];
        for i in 0..14 {
            let last = *closes.last().unwrap();
            closes.push(if i % 2 == 0 { last + 1.0 } else { last - 1.0 });
        }
        let last = *closes.last().unwrap();
        closes.push(last + 2.0);

        let result = rsi(&closes, 14);
        assert_eq!(result.len(), 2);
        assert!((result[0] - 50.0).abs() < 1e-9);

        let avg_gain = (0.5 * 13.0 + 2.0) / 14.0;
        let avg_loss = (0.5 * 13.0) / 14.0;
        let expected = 100.0 - 100.0 / (1.0 + avg_gain / avg_loss);
        assert!((result[1] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_monotonic_uptrend() {
        let data: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let result = rsi(&data, 14);

        for &value in &result {
            assert!(value <= 100.0);
            assert!((value - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rsi_flat_market_is_fifty() {
        let data = vec![100.0; 20];
        for value in rsi(&data, 14) {
            assert!((value - 50.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rsi_downtrend_is_oversold() {
        let data: Vec<f64> = (0..30).map(|i| 200.0 - i as f64 * 2.0).collect();
        let last = *rsi(&data, 14).last().unwrap();
        assert!(last < 30.0);
        assert!(last >= 0.0);
    }

    #[test]
    fn test_daily_return() {
        let points = sample_points(&[(100.0, 102.0), (0.0, 5.0), (50.0, 45.0)]);
        let returns = daily_returns(&points);

        assert!((returns[0].unwrap() - 0.02).abs() < 1e-12);
        assert_eq!(returns[1], None);
        assert!((returns[2].unwrap() + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_volatility_requires_twenty_returns() {
        let pairs: Vec<(f64, f64)> = (0..19).map(|i| (100.0, 100.0 + (i % 3) as f64)).collect();
        let returns = daily_returns(&sample_points(&pairs));
        assert_eq!(annualized_volatility(&returns, VOLATILITY_WINDOW), None);
    }

    #[test]
    fn test_volatility_non_negative_and_annualized() {
        let pairs: Vec<(f64, f64)> = (0..20)
            .map(|i| if i % 2 == 0 { (100.0, 101.0) } else { (100.0, 99.0) })
            .collect();
        let returns = daily_returns(&sample_points(&pairs));
        let vol = annualized_volatility(&returns, VOLATILITY_WINDOW).unwrap();

        // returns alternate +0.01 / -0.01: mean 0, sample variance 20 * 0.0001 / 19
        let expected = (20.0 * 0.0001f64 / 19.0).sqrt() * 252.0f64.sqrt();
        assert!(vol >= 0.0);
        assert!((vol - expected).abs() < 1e-12);
    }

    #[test]
    fn test_volatility_constant_returns_is_zero() {
        let pairs: Vec<(f64, f64)> = (0..25).map(|_| (100.0, 101.0)).collect();
        let returns = daily_returns(&sample_points(&pairs));
        let vol = annualized_volatility(&returns, VOLATILITY_WINDOW).unwrap();
        assert!(vol.abs() < 1e-9);
    }

    #[test]
    fn test_volatility_undefined_return_in_window() {
        let mut pairs: Vec<(f64, f64)> = (0..20).map(|i| (100.0, 100.0 + i as f64 * 0.1)).collect();
        pairs[10] = (0.0, 10.0);
        let returns = daily_returns(&sample_points(&pairs));
        assert_eq!(annualized_volatility(&returns, VOLATILITY_WINDOW), None);
    }

    #[test]
    fn test_volatility_series_alignment() {
        let pairs: Vec<(f64, f64)> = (0..22).map(|i| (100.0, 100.0 + (i % 4) as f64)).collect();
        let returns = daily_returns(&sample_points(&pairs));
        let series = volatility_series(&returns, VOLATILITY_WINDOW);

        assert_eq!(series.len(), 22);
        assert!(series[..19].iter().all(|v| v.is_none()));
        assert!(series[19..].iter().all(|v| v.map_or(false, |x| x >= 0.0)));
    }

    #[test]
    fn test_aligned_closes_skips_missing_dates() {
        let a = sample_points(&[(1.0, 1.0), (2.0, 2.0), (3.0, 3.0), (4.0, 4.0)]);
        let mut b = sample_points(&[(10.0, 10.0), (20.0, 20.0), (30.0, 30.0), (40.0, 40.0)]);
        b.remove(1);

        let (xs, ys) = aligned_closes(&a, &b);
        assert_eq!(xs, vec![1.0, 3.0, 4.0]);
        assert_eq!(ys, vec![10.0, 30.0, 40.0]);
    }
}
