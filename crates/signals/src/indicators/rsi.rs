/// RSI (Relative Strength Index) indicator.
///
/// Each value averages gains and losses over the trailing `period + 1`
/// closes ending at that bar. Bars without `period` bars of history get
/// the neutral value 50.
#[derive(Debug, Clone)]
pub struct RsiIndicator {
    pub period: usize,
}

impl RsiIndicator {
    pub const NEUTRAL: f64 = 50.0;

    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self { period }
    }

    /// RSI for every bar of `closes` (oldest first). Output length equals input length.
    pub fn series(&self, closes: &[f64]) -> Vec<f64> {
        (0..closes.len())
            .map(|i| {
                if i < self.period {
                    return Self::NEUTRAL;
                }
                let window = &closes[i - self.period..=i];
                let (gains, losses) = window.windows(2).fold((0.0, 0.0), |(g, l), w| {
                    let diff = w[1] - w[0];
                    if diff > 0.0 {
                        (g + diff, l)
                    } else {
                        (g, l - diff)
                    }
                });

                let avg_gain = gains / self.period as f64;
                let avg_loss = losses / self.period as f64;
                if avg_loss == 0.0 {
                    return 100.0;
                }
                let rs = avg_gain / avg_loss;
                100.0 - 100.0 / (1.0 + rs)
            })
            .collect()
    }

    /// RSI of the last bar, or `None` for an empty series.
    pub fn latest(&self, closes: &[f64]) -> Option<f64> {
        self.series(closes).last().copied()
    }
}

impl Default for RsiIndicator {
    fn default() -> Self {
        Self::new(14)
    }
}
