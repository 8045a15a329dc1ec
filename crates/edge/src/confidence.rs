use crate::stats::SignalEdgeStats;

/// Confidence in [0, 100] from an edge summary.
///
/// `None` without a sufficient sample. Non-positive (or missing) final scores
/// give exactly 0; positive ones map through the logistic curve, rounded to
/// two decimals.
pub fn confidence_score(edge: &SignalEdgeStats) -> Option<f64> {
    if !edge.sufficient_sample {
        return None;
    }
    let base = edge.final_score.unwrap_or(0.0);
    if base <= 0.0 {
        return Some(0.0);
    }
    let confidence = 100.0 / (1.0 + (-base).exp());
    Some((confidence * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(sufficient: bool, final_score: Option<f64>) -> SignalEdgeStats {
        SignalEdgeStats {
            total_signals: if sufficient { 25 } else { 5 },
            sufficient_sample: sufficient,
            horizon_3d: None,
            horizon_7d: None,
            horizon_14d: None,
            composite_edge: final_score,
            final_score,
        }
    }

    #[test]
    fn insufficient_sample_has_no_confidence() {
        assert_eq!(confidence_score(&edge(false, Some(2.0))), None);
    }

    #[test]
    fn non_positive_score_is_zero() {
        assert_eq!(confidence_score(&edge(true, Some(-1.5))), Some(0.0));
        assert_eq!(confidence_score(&edge(true, Some(0.0))), Some(0.0));
        assert_eq!(confidence_score(&edge(true, None)), Some(0.0));
    }

    #[test]
    fn positive_score_maps_through_logistic() {
        // 100 / (1 + e^-1) = 73.1059
        assert_eq!(confidence_score(&edge(true, Some(1.0))), Some(73.11));
        let low = confidence_score(&edge(true, Some(0.2))).unwrap();
        let high = confidence_score(&edge(true, Some(0.8))).unwrap();
        assert!(low > 50.0 && low < high && high < 100.0);
    }
}
