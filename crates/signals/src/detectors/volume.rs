use common::{Candle, Direction, Severity, Signal, SignalKind, SignalPayload};

use crate::indicators::average_volume;
use crate::Detector;

const MIN_BARS: usize = 21;
const AVG_WINDOW: usize = 20;
const MIN_RATIO: f64 = 1.8;

/// Latest-bar volume spike against the 20-bar average volume.
#[derive(Debug, Default, Clone, Copy)]
pub struct VolumeAnomalyDetector;

impl Detector for VolumeAnomalyDetector {
    fn kind(&self) -> SignalKind {
        SignalKind::VolumeAnomaly
    }

    fn detect(&self, symbol: &str, candles: &[Candle]) -> Option<Signal> {
        if !super::usable(candles, MIN_BARS) {
            return None;
        }
        let avg = average_volume(candles, AVG_WINDOW);
        if avg <= 0.0 {
            return None;
        }
        let last = &candles[candles.len() - 1];
        let prev = &candles[candles.len() - 2];

        let ratio = last.volume / avg;
        if ratio < MIN_RATIO {
            return None;
        }

        let price_change_pct = (last.close - prev.close) / prev.close * 100.0;
        let direction = if price_change_pct > 0.5 {
            Direction::Up
        } else if price_change_pct < -0.5 {
            Direction::Down
        } else {
            Direction::Neutral
        };
        let severity = if ratio >= 3.0 {
            Severity::Strong
        } else if ratio >= 2.3 {
            Severity::Medium
        } else {
            Severity::Weak
        };

        Some(Signal {
            symbol: symbol.to_string(),
            severity,
            direction,
            payload: SignalPayload::VolumeAnomaly {
                current_volume: last.volume,
                avg_volume_20: avg,
                volume_ratio: ratio,
                price_change_pct,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::fixtures::from_closes;

    /// 30-bar uptrend at volume 1000 with a custom final bar.
    fn series(last_change: f64, last_volume: f64) -> Vec<Candle> {
        let mut closes: Vec<f64> = (0..29).map(|i| 100.0 + 0.2 * i as f64).collect();
        let prev = *closes.last().unwrap();
        closes.push(prev * (1.0 + last_change));
        let mut candles = from_closes(&closes, 1000.0);
        candles.last_mut().unwrap().volume = last_volume;
        candles
    }

    #[test]
    fn strong_up_spike() {
        // avg = (19 * 1000 + 3500) / 20 = 1125, ratio ~3.11
        let signal = VolumeAnomalyDetector
            .detect("AKBNK", &series(0.01, 3500.0))
            .unwrap();
        assert_eq!(signal.direction, Direction::Up);
        assert_eq!(signal.severity, Severity::Strong);
        match signal.payload {
            SignalPayload::VolumeAnomaly { volume_ratio, avg_volume_20, .. } => {
                assert!((avg_volume_20 - 1125.0).abs() < 1e-9);
                assert!((volume_ratio - 3500.0 / 1125.0).abs() < 1e-9);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn medium_down_spike() {
        // avg = (19 * 1000 + 2600) / 20 = 1080, ratio ~2.41
        let signal = VolumeAnomalyDetector
            .detect("AKBNK", &series(-0.02, 2600.0))
            .unwrap();
        assert_eq!(signal.direction, Direction::Down);
        assert_eq!(signal.severity, Severity::Medium);
    }

    #[test]
    fn weak_neutral_spike() {
        // avg = (19 * 1000 + 2000) / 20 = 1050, ratio ~1.90
        let signal = VolumeAnomalyDetector
            .detect("AKBNK", &series(0.001, 2000.0))
            .unwrap();
        assert_eq!(signal.direction, Direction::Neutral);
        assert_eq!(signal.severity, Severity::Weak);
    }

    #[test]
    fn below_threshold_never_fires_even_on_large_move() {
        // ratio = 1500 / 1025 ~1.46
        assert!(VolumeAnomalyDetector
            .detect("AKBNK", &series(0.09, 1500.0))
            .is_none());
    }

    #[test]
    fn zero_average_volume_returns_none() {
        let closes: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        let candles = from_closes(&closes, 0.0);
        assert!(VolumeAnomalyDetector.detect("AKBNK", &candles).is_none());
    }
}
