use analysis_core::{
    IndicatorSet, PredictionResult, SentimentComponent, SentimentComponents,
    SentimentInterpretation, SentimentScore, Trend,
};

pub const RSI_WEIGHT: f64 = 0.40;
pub const VOLATILITY_WEIGHT: f64 = 0.20;
pub const MOMENTUM_WEIGHT: f64 = 0.20;
pub const DAILY_CHANGE_WEIGHT: f64 = 0.20;

const NEUTRAL_SCORE: f64 = 50.0;
/// Each percentage point of annualized volatility costs 2.5 points
const VOLATILITY_PENALTY: f64 = 2.5;
/// Slope (in % of mean price per day) that moves momentum ~76% of the way to an extreme
const MOMENTUM_SCALE_PCT: f64 = 0.5;
/// Daily move (in %) that moves the daily-change score ~76% of the way to an extreme
const DAILY_CHANGE_SCALE_PCT: f64 = 2.0;

/// Raw inputs to the composite; `None` means unavailable
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SentimentInputs {
    pub rsi: Option<f64>,
    pub volatility: Option<f64>,
    /// Trend label and slope as % of mean close per day
    pub momentum: Option<(Trend, f64)>,
    pub daily_return: Option<f64>,
}

impl SentimentInputs {
    pub fn from_analysis(indicators: &IndicatorSet, prediction: Option<&PredictionResult>) -> Self {
        let momentum = prediction.map(|p| {
            let slope_pct = if p.mean_close != 0.0 {
                p.slope_per_day / p.mean_close * 100.0
            } else {
                0.0
            };
            (p.trend, slope_pct)
        });

        Self {
            rsi: indicators.rsi_14,
            volatility: indicators.volatility_20d,
            momentum,
            daily_return: indicators.daily_return,
        }
    }
}

/// Composite 0-100 sentiment from RSI, volatility, trend momentum and the latest daily move
#[derive(Debug, Clone, Copy, Default)]
pub struct SentimentScorer;

impl SentimentScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(
        &self,
        symbol: &str,
        indicators: &IndicatorSet,
        prediction: Option<&PredictionResult>,
    ) -> SentimentScore {
        self.score_inputs(symbol, SentimentInputs::from_analysis(indicators, prediction))
    }

    pub fn score_inputs(&self, symbol: &str, inputs: SentimentInputs) -> SentimentScore {
        let components = SentimentComponents {
            rsi: component(finite(inputs.rsi).map(|r| r.clamp(0.0, 100.0)), RSI_WEIGHT),
            volatility: component(finite(inputs.volatility).map(volatility_score), VOLATILITY_WEIGHT),
            momentum: component(
                inputs
                    .momentum
                    .filter(|(_, slope)| slope.is_finite())
                    .map(|(trend, slope)| momentum_score(trend, slope)),
                MOMENTUM_WEIGHT,
            ),
            daily_change: component(finite(inputs.daily_return).map(daily_change_score), DAILY_CHANGE_WEIGHT),
        };

        let weighted = [
            &components.rsi,
            &components.volatility,
            &components.momentum,
            &components.daily_change,
        ]
        .iter()
        .map(|c| c.score * c.weight)
        .sum::<f64>();
        let sentiment_score = weighted.clamp(0.0, 100.0);
        let interpretation = SentimentInterpretation::from_score(sentiment_score);

        tracing::debug!(
            "Sentiment for {}: {:.1} ({:?})",
            symbol,
            sentiment_score,
            interpretation
        );

        SentimentScore {
            symbol: symbol.to_string(),
            sentiment_score,
            label: interpretation.to_label().to_string(),
            interpretation,
            components,
        }
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn component(score: Option<f64>, weight: f64) -> SentimentComponent {
    match score {
        Some(score) => SentimentComponent {
            score,
            weight,
            defaulted: false,
        },
        None => SentimentComponent {
            score: NEUTRAL_SCORE,
            weight,
            defaulted: true,
        },
    }
}

/// Lower volatility scores higher: 0% → 100, 40% annualized → 0
pub fn volatility_score(volatility: f64) -> f64 {
    (100.0 - volatility * 100.0 * VOLATILITY_PENALTY).clamp(0.0, 100.0)
}

/// Neutral trend sits at 50; directional trends saturate towards 0 or 100
pub fn momentum_score(trend: Trend, slope_pct_per_day: f64) -> f64 {
    match trend {
        Trend::Neutral => NEUTRAL_SCORE,
        Trend::Bullish | Trend::Bearish => {
            let scaled = (slope_pct_per_day / MOMENTUM_SCALE_PCT).tanh();
            (NEUTRAL_SCORE + NEUTRAL_SCORE * scaled).clamp(0.0, 100.0)
        }
    }
}

/// tanh keeps a single large move from dominating the composite
pub fn daily_change_score(daily_return: f64) -> f64 {
    let scaled = (daily_return * 100.0 / DAILY_CHANGE_SCALE_PCT).tanh();
    (NEUTRAL_SCORE + NEUTRAL_SCORE * scaled).clamp(0.0, 100.0)
}
