pub mod ema;
pub mod rsi;

pub use ema::EmaIndicator;
pub use rsi::RsiIndicator;

use common::Candle;

/// Mean volume of the last `n` bars (including the latest), 0 when fewer exist.
pub fn average_volume(candles: &[Candle], n: usize) -> f64 {
    if n == 0 || candles.len() < n {
        return 0.0;
    }
    let window = &candles[candles.len() - n..];
    window.iter().map(|c| c.volume).sum::<f64>() / n as f64
}
