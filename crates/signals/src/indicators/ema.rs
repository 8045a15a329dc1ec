/// Exponential Moving Average.
///
/// Seed: the value at index `period - 1` is the SMA of the first `period`
/// values. Bars before the seed carry the raw input unchanged, which
/// understates the average during warm-up.
#[derive(Debug, Clone)]
pub struct EmaIndicator {
    pub period: usize,
}

impl EmaIndicator {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self { period }
    }

    /// EMA for every value (oldest first). Output length equals input length.
    pub fn series(&self, values: &[f64]) -> Vec<f64> {
        let k = 2.0 / (self.period as f64 + 1.0);
        let mut out = Vec::with_capacity(values.len());
        let mut sum = 0.0;

        for (i, &value) in values.iter().enumerate() {
            if i < self.period {
                sum += value;
                if i == self.period - 1 {
                    out.push(sum / self.period as f64);
                } else {
                    out.push(value);
                }
                continue;
            }
            let prev = out[i - 1];
            out.push(value * k + prev * (1.0 - k));
        }
        out
    }

    pub fn latest(&self, values: &[f64]) -> Option<f64> {
        self.series(values).last().copied()
    }
}
