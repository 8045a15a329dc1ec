use common::{Candle, Direction, Severity, Signal, SignalKind, SignalPayload};

use crate::indicators::EmaIndicator;
use crate::Detector;

const MIN_BARS: usize = 25;
const SHORT_PERIOD: usize = 9;
const LONG_PERIOD: usize = 21;
const MAX_BARS_AGO: usize = 5;

/// EMA(9)/EMA(21) crossover within the last five completed transitions.
///
/// The final bar is treated as still forming: `bars_ago = 1` is the
/// transition that ends on the bar before it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrendStartDetector;

impl Detector for TrendStartDetector {
    fn kind(&self) -> SignalKind {
        SignalKind::TrendStart
    }

    fn detect(&self, symbol: &str, candles: &[Candle]) -> Option<Signal> {
        if !super::usable(candles, MIN_BARS) {
            return None;
        }
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let short = EmaIndicator::new(SHORT_PERIOD).series(&closes);
        let long = EmaIndicator::new(LONG_PERIOD).series(&closes);
        let last = candles.len() - 1;

        for bars_ago in 1..=MAX_BARS_AGO {
            let idx = last - bars_ago;
            let prev = idx - 1;

            let direction = if short[prev] <= long[prev] && short[idx] > long[idx] {
                Direction::Up
            } else if short[prev] >= long[prev] && short[idx] < long[idx] {
                Direction::Down
            } else {
                continue;
            };

            let severity = match bars_ago {
                1 => Severity::Strong,
                2 => Severity::Medium,
                _ => Severity::Weak,
            };
            return Some(Signal {
                symbol: symbol.to_string(),
                severity,
                direction,
                payload: SignalPayload::TrendStart {
                    ema_short: short[idx],
                    ema_long: long[idx],
                    bars_ago,
                },
            });
        }
        None
    }
}
