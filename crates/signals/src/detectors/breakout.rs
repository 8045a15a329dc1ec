use common::{Candle, Direction, LevelKind, Severity, Signal, SignalKind, SignalPayload};

use crate::indicators::average_volume;
use crate::Detector;

const MIN_BARS: usize = 21;
const RANGE_WINDOW: usize = 20;

/// Close beyond the prior 20-bar high/low, confirmed by at-or-above-average volume.
/// Never emits `Severity::Weak`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SupportResistanceBreakDetector;

impl Detector for SupportResistanceBreakDetector {
    fn kind(&self) -> SignalKind {
        SignalKind::SupportResistanceBreak
    }

    fn detect(&self, symbol: &str, candles: &[Candle]) -> Option<Signal> {
        if !super::usable(candles, MIN_BARS) {
            return None;
        }
        let n = candles.len();
        let last = &candles[n - 1];
        let prior = &candles[n - 1 - RANGE_WINDOW..n - 1];

        let high20 = prior.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let low20 = prior.iter().map(|c| c.low).fold(f64::MAX, f64::min);

        let avg_volume = average_volume(candles, RANGE_WINDOW);
        if avg_volume <= 0.0 || last.volume < avg_volume {
            return None;
        }

        let (level, level_kind, direction) = if last.close > high20 {
            (high20, LevelKind::Resistance, Direction::Up)
        } else if last.close < low20 {
            (low20, LevelKind::Support, Direction::Down)
        } else {
            return None;
        };

        let severity = if last.volume >= avg_volume * 1.5 {
            Severity::Strong
        } else {
            Severity::Medium
        };

        Some(Signal {
            symbol: symbol.to_string(),
            severity,
            direction,
            payload: SignalPayload::SupportResistanceBreak {
                level,
                level_kind,
                break_price: last.close,
                volume_above_avg: true,
            },
        })
    }
}
