use tracing::debug;

use common::{Candle, Signal};

use crate::detectors::{
    RsiDivergenceDetector, SupportResistanceBreakDetector, TrendStartDetector,
    VolumeAnomalyDetector,
};
use crate::Detector;

/// Holds the active detectors and runs them over a series in a fixed order.
pub struct DetectorRegistry {
    detectors: Vec<Box<dyn Detector>>,
}

impl Default for DetectorRegistry {
    /// All four detector kinds, in the order divergence, volume, trend, breakout.
    fn default() -> Self {
        Self {
            detectors: vec![
                Box::new(RsiDivergenceDetector),
                Box::new(VolumeAnomalyDetector),
                Box::new(TrendStartDetector),
                Box::new(SupportResistanceBreakDetector),
            ],
        }
    }
}

impl DetectorRegistry {
    /// Run every detector; at most one signal per kind.
    pub fn detect_all(&self, symbol: &str, candles: &[Candle]) -> Vec<Signal> {
        let signals: Vec<Signal> = self
            .detectors
            .iter()
            .filter_map(|d| d.detect(symbol, candles))
            .collect();

        for s in &signals {
            debug!(
                symbol = %symbol,
                kind = %s.kind(),
                direction = %s.direction,
                severity = %s.severity,
                "Signal detected"
            );
        }
        signals
    }
}
