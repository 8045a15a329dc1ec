use common::{Candle, Direction, DivergenceKind, Severity, Signal, SignalKind, SignalPayload};

use crate::indicators::RsiIndicator;
use crate::Detector;

const MIN_BARS: usize = 20;
const RSI_PERIOD: usize = 14;
const LOOKBACK: usize = 10;

/// Price/RSI divergence over a 10-bar window anchored at each candidate bar,
/// scanning from the latest bar backward. The most recent qualifying window wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct RsiDivergenceDetector;

/// The two lowest lows and two highest highs seen in one window.
struct Extremes {
    low1: (f64, usize),
    low2: (f64, usize),
    high1: (f64, usize),
    high2: (f64, usize),
}

impl Extremes {
    fn scan(candles: &[Candle], anchor: usize) -> Self {
        let a = &candles[anchor];
        let mut ext = Extremes {
            low1: (a.low, anchor),
            low2: (a.low, anchor),
            high1: (a.high, anchor),
            high2: (a.high, anchor),
        };

        let floor = anchor.saturating_sub(LOOKBACK).max(RSI_PERIOD);
        for j in (floor..anchor).rev() {
            let c = &candles[j];
            if c.low < ext.low1.0 {
                ext.low2 = ext.low1;
                ext.low1 = (c.low, j);
            } else if c.low < ext.low2.0 {
                ext.low2 = (c.low, j);
            }
            if c.high > ext.high1.0 {
                ext.high2 = ext.high1;
                ext.high1 = (c.high, j);
            } else if c.high > ext.high2.0 {
                ext.high2 = (c.high, j);
            }
        }
        ext
    }
}

impl Detector for RsiDivergenceDetector {
    fn kind(&self) -> SignalKind {
        SignalKind::RsiDivergence
    }

    fn detect(&self, symbol: &str, candles: &[Candle]) -> Option<Signal> {
        if !super::usable(candles, MIN_BARS) {
            return None;
        }
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let rsi = RsiIndicator::new(RSI_PERIOD).series(&closes);
        let rsi_at = |idx: usize| rsi.get(idx).copied().unwrap_or(RsiIndicator::NEUTRAL);

        for anchor in (RSI_PERIOD + LOOKBACK..candles.len()).rev() {
            let ext = Extremes::scan(candles, anchor);

            // Bullish: lower low in price, higher low in RSI.
            let (low1, idx_low1) = ext.low1;
            let (low2, idx_low2) = ext.low2;
            let (rsi1, rsi2) = (rsi_at(idx_low1), rsi_at(idx_low2));
            if idx_low1 > idx_low2 && low1 < low2 && rsi1 > rsi2 && rsi1 < 40.0 {
                let severity = if rsi1 < 30.0 {
                    Severity::Strong
                } else if rsi1 < 35.0 {
                    Severity::Medium
                } else {
                    Severity::Weak
                };
                return Some(Signal {
                    symbol: symbol.to_string(),
                    severity,
                    direction: Direction::Up,
                    payload: SignalPayload::RsiDivergence {
                        divergence: DivergenceKind::Bullish,
                        rsi_current: rsi1,
                        rsi_prev: rsi2,
                        price_current: low1,
                        price_prev: low2,
                    },
                });
            }

            // Bearish: higher high in price, lower high in RSI.
            let (high1, idx_high1) = ext.high1;
            let (high2, idx_high2) = ext.high2;
            let (rsi_h1, rsi_h2) = (rsi_at(idx_high1), rsi_at(idx_high2));
            if idx_high1 > idx_high2 && high1 > high2 && rsi_h1 < rsi_h2 && rsi_h1 > 60.0 {
                let severity = if rsi_h1 > 70.0 {
                    Severity::Strong
                } else if rsi_h1 > 65.0 {
                    Severity::Medium
                } else {
                    Severity::Weak
                };
                return Some(Signal {
                    symbol: symbol.to_string(),
                    severity,
                    direction: Direction::Down,
                    payload: SignalPayload::RsiDivergence {
                        divergence: DivergenceKind::Bearish,
                        rsi_current: rsi_h1,
                        rsi_prev: rsi_h2,
                        price_current: high1,
                        price_prev: high2,
                    },
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::fixtures::from_closes;

    /// Steady decline, a capitulation bar at 20, a rebound, then a marginally
    /// lower low at 26 on much better RSI.
    fn bullish_closes() -> Vec<f64> {
        let mut closes: Vec<f64> = (0..20).map(|i| 100.0 - 0.5 * i as f64).collect();
        closes.extend([85.0, 85.75, 86.5, 87.25, 88.0, 86.5, 84.8, 86.0, 87.0, 88.0]);
        closes
    }

    #[test]
    fn detects_bullish_divergence() {
        let candles = from_closes(&bullish_closes(), 1000.0);
        let signal = RsiDivergenceDetector.detect("THYAO", &candles).unwrap();

        assert_eq!(signal.direction, Direction::Up);
        assert_eq!(signal.severity, Severity::Strong);
        match signal.payload {
            SignalPayload::RsiDivergence {
                divergence,
                rsi_current,
                rsi_prev,
                price_current,
                price_prev,
            } => {
                assert_eq!(divergence, DivergenceKind::Bullish);
                assert!(price_current < price_prev);
                assert!(rsi_current > rsi_prev);
                assert!(rsi_current < 30.0, "rsi {rsi_current}");
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn detects_bearish_divergence_on_mirrored_series() {
        let closes: Vec<f64> = bullish_closes().iter().map(|c| 200.0 - c).collect();
        let candles = from_closes(&closes, 1000.0);
        let signal = RsiDivergenceDetector.detect("THYAO", &candles).unwrap();

        assert_eq!(signal.direction, Direction::Down);
        assert_eq!(signal.severity, Severity::Strong);
        assert!(matches!(
            signal.payload,
            SignalPayload::RsiDivergence { divergence: DivergenceKind::Bearish, .. }
        ));
    }

    #[test]
    fn monotonic_uptrend_has_no_divergence() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let candles = from_closes(&closes, 1000.0);
        assert!(RsiDivergenceDetector.detect("THYAO", &candles).is_none());
    }

    #[test]
    fn short_series_returns_none() {
        let candles = from_closes(&bullish_closes()[..19], 1000.0);
        assert!(RsiDivergenceDetector.detect("THYAO", &candles).is_none());
    }

    #[test]
    fn non_finite_price_returns_none() {
        let mut candles = from_closes(&bullish_closes(), 1000.0);
        candles[5].close = f64::NAN;
        assert!(RsiDivergenceDetector.detect("THYAO", &candles).is_none());
    }
}
