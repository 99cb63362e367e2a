/// Ordinary least-squares fit of `y` against `x = 0..n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination; 0 when x or y has no variance
    pub r_squared: f64,
    pub mean_y: f64,
    /// True when y is constant (or fewer than two points), i.e. there is no trend to explain
    pub degenerate: bool,
}

impl LinearFit {
    pub fn value_at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit a line through `(i, ys[i])`. `None` for an empty slice.
pub fn fit_index_series(ys: &[f64]) -> Option<LinearFit> {
    if ys.is_empty() {
        return None;
    }
    let n = ys.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (i, y) in ys.iter().enumerate() {
        let dx = i as f64 - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    // relative tolerance so a flat series with rounding noise still counts as flat
    let flat_y = syy <= f64::EPSILON * mean_y.abs().max(1.0).powi(2) * n;
    if sxx == 0.0 || flat_y {
        return Some(LinearFit {
            slope: 0.0,
            intercept: mean_y,
            r_squared: 0.0,
            mean_y,
            degenerate: true,
        });
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let ss_res: f64 = ys
        .iter()
        .enumerate()
        .map(|(i, y)| (y - (slope * i as f64 + intercept)).powi(2))
        .sum();
    let r_squared = (1.0 - ss_res / syy).clamp(0.0, 1.0);

    Some(LinearFit {
        slope,
        intercept,
        r_squared,
        mean_y,
        degenerate: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_line() {
        let ys: Vec<f64> = (0..60).map(|i| 10.0 + 2.5 * i as f64).collect();
        let fit = fit_index_series(&ys).unwrap();

        assert!((fit.slope - 2.5).abs() < 1e-9);
        assert!((fit.intercept - 10.0).abs() < 1e-9);
        assert!((fit.r_squared - 1.0).abs() < 1e-9);
        assert!(!fit.degenerate);
        assert!((fit.value_at(60.0) - 160.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_series_is_degenerate() {
        let fit = fit_index_series(&[100.0; 60]).unwrap();
        assert!(fit.degenerate);
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.r_squared, 0.0);
        assert!((fit.value_at(66.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_point_is_degenerate() {
        let fit = fit_index_series(&[42.0]).unwrap();
        assert!(fit.degenerate);
        assert_eq!(fit.intercept, 42.0);
    }

    #[test]
    fn test_noisy_series_r_squared_in_range() {
        let ys: Vec<f64> = (0..60)
            .map(|i| 100.0 + 0.3 * i as f64 + if i % 2 == 0 { 4.0 } else { -4.0 })
            .collect();
        let fit = fit_index_series(&ys).unwrap();
        assert!(fit.r_squared > 0.0 && fit.r_squared < 1.0);
        assert!(fit.slope > 0.0);
    }

    #[test]
    fn test_empty() {
        assert!(fit_index_series(&[]).is_none());
    }
}
