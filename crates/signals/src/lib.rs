pub mod detectors;
pub mod indicators;
pub mod regime;
pub mod registry;

pub use detectors::{
    RsiDivergenceDetector, SupportResistanceBreakDetector, TrendStartDetector,
    VolumeAnomalyDetector,
};
pub use regime::{classify_regime, regime_at};
pub use registry::DetectorRegistry;

use common::{Candle, Signal, SignalKind};

/// All detector implementations must satisfy this trait.
///
/// Detectors are stateless: indicators are recomputed on every call and a
/// malformed or too-short series yields `None`, never an error.
pub trait Detector: Send + Sync {
    /// The signal family this detector emits.
    fn kind(&self) -> SignalKind;

    /// Evaluate the series (oldest first) and emit at most one signal for its last bar.
    fn detect(&self, symbol: &str, candles: &[Candle]) -> Option<Signal>;
}

/// Run every detector kind over the series: 0 to 4 signals.
pub fn detect_all_signals(symbol: &str, candles: &[Candle]) -> Vec<Signal> {
    DetectorRegistry::default().detect_all(symbol, candles)
}
