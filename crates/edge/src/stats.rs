use serde::{Deserialize, Serialize};

use common::{Direction, Horizon, PerformanceRecord};

/// Minimum records of one signal type before any statistic is reported.
pub const MIN_SAMPLE: usize = 20;

/// Horizon weights for the composite edge: 3d, 7d, 14d.
const COMPOSITE_WEIGHTS: [(Horizon, f64); 3] =
    [(Horizon::D3, 0.25), (Horizon::D7, 0.35), (Horizon::D14, 0.4)];

/// Win/loss and dispersion statistics of normalised returns at one horizon.
/// Every field is `None` when the data leaves it undefined.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HorizonEdgeStats {
    pub win_rate: Option<f64>,
    pub avg_win: Option<f64>,
    pub avg_loss: Option<f64>,
    pub expectancy: Option<f64>,
    pub std_dev: Option<f64>,
    pub downside_dev: Option<f64>,
    pub profit_factor: Option<f64>,
    pub risk_adjusted: Option<f64>,
}

/// Edge summary for one signal type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEdgeStats {
    pub total_signals: usize,
    pub sufficient_sample: bool,
    pub horizon_3d: Option<HorizonEdgeStats>,
    pub horizon_7d: Option<HorizonEdgeStats>,
    pub horizon_14d: Option<HorizonEdgeStats>,
    pub composite_edge: Option<f64>,
    pub final_score: Option<f64>,
}

impl SignalEdgeStats {
    pub fn horizon(&self, horizon: Horizon) -> Option<&HorizonEdgeStats> {
        match horizon {
            Horizon::D3 => self.horizon_3d.as_ref(),
            Horizon::D7 => self.horizon_7d.as_ref(),
            Horizon::D14 => self.horizon_14d.as_ref(),
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn is_win(direction: Direction, value: f64) -> bool {
    (direction == Direction::Up && value > 0.0) || (direction == Direction::Down && value < 0.0)
}

/// Statistics for one horizon over the directional records with a finite return.
///
/// Raw returns pass through `tanh` first so a single extreme outlier cannot
/// dominate; every figure below is computed on the squashed values.
pub fn horizon_stats(records: &[PerformanceRecord], horizon: Horizon) -> HorizonEdgeStats {
    let samples: Vec<(Direction, f64)> = records
        .iter()
        .filter(|r| r.direction.is_directional())
        .filter_map(|r| {
            let raw = r.return_at(horizon)?;
            let value = raw.tanh();
            (raw.is_finite() && value.is_finite()).then_some((r.direction, value))
        })
        .collect();

    let n = samples.len();
    if n == 0 {
        return HorizonEdgeStats::default();
    }

    let (wins, losses): (Vec<_>, Vec<_>) = samples.iter().partition(|(d, v)| is_win(*d, *v));
    let win_values: Vec<f64> = wins.iter().map(|(_, v)| *v).collect();
    let loss_values: Vec<f64> = losses.iter().map(|(_, v)| *v).collect();

    let win_rate = win_values.len() as f64 / n as f64;
    let avg_win = mean(&win_values);
    let avg_loss = mean(&loss_values);

    let expectancy = match (avg_win, avg_loss) {
        (Some(w), Some(l)) => Some(win_rate * w + (1.0 - win_rate) * l),
        (Some(w), None) => Some(w),
        (None, Some(l)) => Some(l),
        (None, None) => None,
    }
    .filter(|e| e.is_finite())
    .map(round4);

    let values: Vec<f64> = samples.iter().map(|(_, v)| *v).collect();
    let mu = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / n as f64;
    let std_dev = Some(variance.sqrt()).filter(|s| s.is_finite()).map(round4);

    let negatives: Vec<f64> = values.iter().copied().filter(|v| *v < 0.0).collect();
    let downside_dev = mean(&negatives.iter().map(|v| v * v).collect::<Vec<_>>())
        .filter(|var| var.is_finite() && *var > 0.0)
        .map(|var| round4(var.sqrt()));

    let gross_profit: f64 = values.iter().filter(|v| **v > 0.0).sum();
    let gross_loss: f64 = negatives.iter().sum::<f64>().abs();
    // No losses: unbounded or undefined, both reported as None.
    let profit_factor = (gross_loss > 0.0)
        .then(|| gross_profit / gross_loss)
        .filter(|pf| pf.is_finite())
        .map(round4);

    let risk_adjusted = match (expectancy, std_dev) {
        (e, Some(sd)) if sd == 0.0 => Some(e.filter(|e| *e > 0.0).unwrap_or(0.0)),
        (Some(e), Some(sd)) => {
            let ratio = e / sd;
            Some(if ratio.is_finite() { round4(ratio) } else { 0.0 })
        }
        _ => None,
    };

    HorizonEdgeStats {
        win_rate: Some(round4(win_rate)),
        avg_win: avg_win.map(round4),
        avg_loss: avg_loss.map(round4),
        expectancy,
        std_dev,
        downside_dev,
        profit_factor,
        risk_adjusted,
    }
}

/// Aggregate edge for the evaluated records of one signal type.
///
/// Below [`MIN_SAMPLE`] records only the count is reported. Otherwise the
/// composite edge blends the horizons' risk-adjusted scores (missing = 0) and
/// the final score scales it by `ln(total_signals)`.
pub fn compute_signal_edge(records: &[PerformanceRecord]) -> SignalEdgeStats {
    let total_signals = records.len();
    if total_signals < MIN_SAMPLE {
        return SignalEdgeStats {
            total_signals,
            sufficient_sample: false,
            horizon_3d: None,
            horizon_7d: None,
            horizon_14d: None,
            composite_edge: None,
            final_score: None,
        };
    }

    let horizon_3d = horizon_stats(records, Horizon::D3);
    let horizon_7d = horizon_stats(records, Horizon::D7);
    let horizon_14d = horizon_stats(records, Horizon::D14);

    let composite_edge = round4(
        COMPOSITE_WEIGHTS
            .iter()
            .map(|(h, w)| {
                let stats = match h {
                    Horizon::D3 => &horizon_3d,
                    Horizon::D7 => &horizon_7d,
                    Horizon::D14 => &horizon_14d,
                };
                w * stats.risk_adjusted.unwrap_or(0.0)
            })
            .sum(),
    );

    let log_n = (total_signals as f64).ln();
    let final_score = log_n.is_finite().then(|| round4(composite_edge * log_n));

    SignalEdgeStats {
        total_signals,
        sufficient_sample: true,
        horizon_3d: Some(horizon_3d),
        horizon_7d: Some(horizon_7d),
        horizon_14d: Some(horizon_14d),
        composite_edge: Some(composite_edge),
        final_score,
    }
}
