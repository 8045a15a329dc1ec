use chrono::{DateTime, Utc};

use common::{Candle, MarketRegime};

use crate::indicators::EmaIndicator;

const MIN_BARS: usize = 200;
/// Dead-band around EMA parity that keeps the label from flapping.
const BAND: f64 = 0.005;

/// Classify a reference index by EMA(50) vs EMA(200) on the last bar.
/// Fewer than 200 bars, or degenerate averages, yield `Sideways`.
pub fn classify_regime(candles: &[Candle]) -> MarketRegime {
    if candles.len() < MIN_BARS {
        return MarketRegime::Sideways;
    }
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let (Some(fast), Some(slow)) = (
        EmaIndicator::new(50).latest(&closes),
        EmaIndicator::new(200).latest(&closes),
    ) else {
        return MarketRegime::Sideways;
    };

    if !fast.is_finite() || !slow.is_finite() || slow <= 0.0 {
        return MarketRegime::Sideways;
    }
    if fast > slow * (1.0 + BAND) {
        MarketRegime::BullTrend
    } else if fast < slow * (1.0 - BAND) {
        MarketRegime::BearTrend
    } else {
        MarketRegime::Sideways
    }
}

/// Regime as of `as_of`, using only bars dated on or before it.
pub fn regime_at(candles: &[Candle], as_of: DateTime<Utc>) -> MarketRegime {
    let upto: Vec<Candle> = candles
        .iter()
        .filter(|c| c.date <= as_of)
        .cloned()
        .collect();
    classify_regime(&upto)
}
