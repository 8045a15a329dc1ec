mod breakout;
mod divergence;
mod trend;
mod volume;

pub use breakout::SupportResistanceBreakDetector;
pub use divergence::RsiDivergenceDetector;
pub use trend::TrendStartDetector;
pub use volume::VolumeAnomalyDetector;

use common::Candle;

/// True when the series is long enough and every bar is well-formed.
pub(crate) fn usable(candles: &[Candle], min_bars: usize) -> bool {
    candles.len() >= min_bars && candles.iter().all(Candle::is_valid)
}
