use chrono::{TimeZone, Utc};
use common::{Direction, MarketRegime, PerformanceRecord, SignalKind};
use edge::{compute_signal_edge, confidence_score, SignalEdgeStats};
use proptest::prelude::*;

fn record(direction: Direction, r: Option<f64>) -> PerformanceRecord {
    let at = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
    PerformanceRecord {
        id: "p".into(),
        user_id: None,
        symbol: "TEST".into(),
        signal_type: SignalKind::TrendStart,
        direction,
        entry_price: 10.0,
        entry_time: at,
        regime: MarketRegime::BullTrend,
        return_3d: r,
        return_7d: r,
        return_14d: r,
        mfe: None,
        mae: None,
        evaluated: true,
        created_at: at,
    }
}

fn scored(final_score: f64) -> SignalEdgeStats {
    SignalEdgeStats {
        total_signals: 30,
        sufficient_sample: true,
        horizon_3d: None,
        horizon_7d: None,
        horizon_14d: None,
        composite_edge: None,
        final_score: Some(final_score),
    }
}

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Up), Just(Direction::Down), Just(Direction::Neutral)]
}

proptest! {
    /// Below 20 records nothing but the count is reported.
    #[test]
    fn small_samples_are_gated(rows in prop::collection::vec((direction(), -1.0f64..1.0), 0..20)) {
        let records: Vec<_> = rows.iter().map(|(d, r)| record(*d, Some(*r))).collect();
        let stats = compute_signal_edge(&records);
        prop_assert!(!stats.sufficient_sample);
        prop_assert_eq!(stats.total_signals, records.len());
        prop_assert!(stats.horizon_3d.is_none() && stats.horizon_7d.is_none() && stats.horizon_14d.is_none());
        prop_assert!(stats.composite_edge.is_none() && stats.final_score.is_none());
        prop_assert_eq!(confidence_score(&stats), None);
    }

    /// With enough records, every reported statistic is finite and confidence is bounded.
    #[test]
    fn statistics_are_finite(
        rows in prop::collection::vec((direction(), prop::option::of(-5.0f64..5.0)), 20..80),
    ) {
        let records: Vec<_> = rows.iter().map(|(d, r)| record(*d, *r)).collect();
        let stats = compute_signal_edge(&records);
        prop_assert!(stats.sufficient_sample);

        for h in [stats.horizon_3d, stats.horizon_7d, stats.horizon_14d].into_iter().flatten() {
            for v in [h.win_rate, h.avg_win, h.avg_loss, h.expectancy, h.std_dev,
                      h.downside_dev, h.profit_factor, h.risk_adjusted].into_iter().flatten() {
                prop_assert!(v.is_finite());
            }
            if let Some(wr) = h.win_rate {
                prop_assert!((0.0..=1.0).contains(&wr));
            }
        }
        prop_assert!(stats.final_score.map_or(true, f64::is_finite));

        let c = confidence_score(&stats).unwrap();
        prop_assert!((0.0..=100.0).contains(&c));
    }

    /// Confidence is 0 for non-positive scores and never decreases as the score grows.
    #[test]
    fn confidence_is_monotonic(a in -10.0f64..10.0, delta in 0.0f64..10.0) {
        let lo = confidence_score(&scored(a)).unwrap();
        let hi = confidence_score(&scored(a + delta)).unwrap();
        prop_assert!(lo <= hi);
        prop_assert!((0.0..=100.0).contains(&lo) && (0.0..=100.0).contains(&hi));
        if a <= 0.0 {
            prop_assert_eq!(lo, 0.0);
        } else {
            prop_assert!(lo >= 50.0);
        }
    }
}
