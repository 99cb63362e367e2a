use analysis_core::stats::{mean, sample_std_dev};
use analysis_core::PricePoint;

pub const MA_WINDOW_7: usize = 7;
pub const MA_WINDOW_20: usize = 20;
pub const RSI_WINDOW: usize = 14;
pub const VOLATILITY_WINDOW: usize = 20;
pub const WEEK_52_WINDOW: usize = 252;
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Simple Moving Average, one value per full window
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let mut result = Vec::with_capacity(data.len() - period + 1);
    for i in period - 1..data.len() {
        let sum: f64 = data[i + 1 - period..=i].iter().sum();
        result.push(sum / period as f64);
    }
    result
}

/// SMA aligned to the input: `None` until `period` values are available
pub fn sma_series(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let values = sma(data, period);
    (0..data.len())
        .map(|i| {
            if period > 0 && i + 1 >= period {
                values.get(i + 1 - period).copied()
            } else {
                None
            }
        })
        .collect()
}

/// SMA of the last `period` values only
pub fn latest_sma(data: &[f64], period: usize) -> Option<f64> {
    if period == 0 || data.len() < period {
        return None;
    }
    mean(&data[data.len() - period..])
}

/// Intraday return `(close - open) / open`; undefined when open is zero
pub fn daily_return(point: &PricePoint) -> Option<f64> {
    if point.open == 0.0 {
        return None;
    }
    Some((point.close - point.open) / point.open)
}

pub fn daily_returns(points: &[PricePoint]) -> Vec<Option<f64>> {
    points.iter().map(daily_return).collect()
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        // no losses at all: pure uptrend, or a flat market
        return if avg_gain > 0.0 { 100.0 } else { 50.0 };
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

/// Relative Strength Index with Wilder smoothing.
///
/// The averages are seeded with the simple mean of the first `period`
/// gains/losses and then folded forward with
/// `avg = (prev * (period - 1) + current) / period`.
/// Element `i` of the result belongs to `data[period + i]`.
pub fn rsi(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period + 1 {
        return vec![];
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = data
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    let p = period as f64;
    let seed = (
        gains[..period].iter().sum::<f64>() / p,
        losses[..period].iter().sum::<f64>() / p,
    );

    std::iter::once(seed)
        .chain(
            gains[period..]
                .iter()
                .zip(&losses[period..])
                .scan(seed, |(avg_gain, avg_loss), (gain, loss)| {
                    *avg_gain = (*avg_gain * (p - 1.0) + gain) / p;
                    *avg_loss = (*avg_loss * (p - 1.0) + loss) / p;
                    Some((*avg_gain, *avg_loss))
                }),
        )
        .map(|(avg_gain, avg_loss)| rsi_from_averages(avg_gain, avg_loss))
        .collect()
}

/// RSI aligned to the input: `None` for the first `period` points
pub fn rsi_series(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let values = rsi(data, period);
    (0..data.len())
        .map(|i| i.checked_sub(period).and_then(|j| values.get(j).copied()))
        .collect()
}

/// Annualized volatility: sample std-dev of a full window of daily returns × √252.
/// Any undefined return inside the window makes the result undefined.
pub fn annualized_volatility(returns: &[Option<f64>], window: usize) -> Option<f64> {
    if window < 2 || returns.len() < window {
        return None;
    }
    let tail: Option<Vec<f64>> = returns[returns.len() - window..].iter().copied().collect();
    let std = sample_std_dev(&tail?)?;
    Some(std * TRADING_DAYS_PER_YEAR.sqrt())
}

/// Rolling annualized volatility aligned to the input
pub fn volatility_series(returns: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..returns.len())
        .map(|i| annualized_volatility(&returns[..=i], window))
        .collect()
}

/// 52-week high, low and mean close over the last `WEEK_52_WINDOW` points
pub struct Week52Stats {
    pub high: f64,
    pub low: f64,
    pub avg_close: f64,
    pub first_close: f64,
    pub last_close: f64,
}

pub fn week_52_stats(points: &[PricePoint]) -> Option<Week52Stats> {
    let window = &points[points.len().saturating_sub(WEEK_52_WINDOW)..];
    let closes: Vec<f64> = window.iter().map(|p| p.close).collect();
    let avg_close = mean(&closes)?;

    Some(Week52Stats {
        high: closes.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        low: closes.iter().copied().fold(f64::INFINITY, f64::min),
        avg_close,
        first_close: closes[0],
        last_close: closes[closes.len() - 1],
    })
}

/// Closes of two ascending series paired on the dates they share
pub fn aligned_closes(a: &[PricePoint], b: &[PricePoint]) -> (Vec<f64>, Vec<f64>) {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        match a[i].date.cmp(&b[j].date) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                xs.push(a[i].close);
                ys.push(b[j].close);
                i += 1;
                j += 1;
            }
        }
    }

    (xs, ys)
}
