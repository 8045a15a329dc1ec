use chrono::{Duration, TimeZone, Utc};
use common::{Candle, SignalKind};
use proptest::prelude::*;
use signals::indicators::{EmaIndicator, RsiIndicator};
use signals::{detect_all_signals, Detector, VolumeAnomalyDetector};

fn candles(closes: &[f64], volumes: &[f64]) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&close, &volume))| Candle {
            date: start + Duration::days(i as i64),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume,
        })
        .collect()
}

proptest! {
    /// RSI stays within [0, 100] for any positive price path.
    #[test]
    fn rsi_is_bounded(closes in prop::collection::vec(0.01f64..10_000.0, 0..120)) {
        for v in RsiIndicator::default().series(&closes) {
            prop_assert!((0.0..=100.0).contains(&v), "RSI out of range: {v}");
        }
    }

    /// Before the seed index the EMA is the raw input; at the seed it is the SMA.
    #[test]
    fn ema_bootstrap_holds(
        values in prop::collection::vec(1.0f64..1_000.0, 30..60),
        period in 2usize..25,
    ) {
        let series = EmaIndicator::new(period).series(&values);
        for i in 0..period - 1 {
            prop_assert_eq!(series[i], values[i]);
        }
        let sma = values[..period].iter().sum::<f64>() / period as f64;
        prop_assert!((series[period - 1] - sma).abs() < 1e-9);
    }

    /// No detector fires on fewer than 20 bars.
    #[test]
    fn short_series_never_signal(
        closes in prop::collection::vec(1.0f64..500.0, 0..20),
        volume in 0.0f64..1e7,
    ) {
        let volumes = vec![volume; closes.len()];
        prop_assert!(detect_all_signals("TEST", &candles(&closes, &volumes)).is_empty());
    }

    /// A volume ratio under 1.8 never fires, whatever the price move.
    #[test]
    fn volume_anomaly_requires_ratio(
        base in 100.0f64..1e6,
        ratio in 0.0f64..1.79,
        last_change in -0.5f64..0.5,
    ) {
        let mut closes = vec![100.0; 29];
        closes.push(100.0 * (1.0 + last_change));
        let mut volumes = vec![base; 30];
        // Solve last / ((19 * base + last) / 20) = ratio for `last`.
        volumes[29] = 19.0 * base * ratio / (20.0 - ratio);

        let series = candles(&closes, &volumes);
        prop_assert!(VolumeAnomalyDetector.detect("TEST", &series).is_none());
        let fired = detect_all_signals("TEST", &series);
        prop_assert!(fired.iter().all(|s| s.kind() != SignalKind::VolumeAnomaly));
    }
}
