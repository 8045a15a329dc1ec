use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// One OHLCV bar. Daily bars are stamped at midnight UTC of their trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub date: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Prices finite and positive, volume finite and non-negative.
    pub fn is_valid(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|p| p.is_finite() && *p > 0.0)
            && self.volume.is_finite()
            && self.volume >= 0.0
    }
}

/// How strongly a detector rates its own signal. Ordered weak < medium < strong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Weak,
    Medium,
    Strong,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Weak => write!(f, "weak"),
            Severity::Medium => write!(f, "medium"),
            Severity::Strong => write!(f, "strong"),
        }
    }
}

/// Expected price direction of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Neutral,
}

impl Direction {
    /// Only up/down signals can be scored against forward returns.
    pub fn is_directional(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
            Direction::Neutral => write!(f, "neutral"),
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "neutral" => Ok(Direction::Neutral),
            other => Err(Error::InvalidRecord(format!("unknown direction '{other}'"))),
        }
    }
}

/// The four pattern families the detector recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    RsiDivergence,
    VolumeAnomaly,
    TrendStart,
    SupportResistanceBreak,
}

impl SignalKind {
    pub const ALL: [SignalKind; 4] = [
        SignalKind::RsiDivergence,
        SignalKind::VolumeAnomaly,
        SignalKind::TrendStart,
        SignalKind::SupportResistanceBreak,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::RsiDivergence => "rsi_divergence",
            SignalKind::VolumeAnomaly => "volume_anomaly",
            SignalKind::TrendStart => "trend_start",
            SignalKind::SupportResistanceBreak => "support_resistance_break",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        SignalKind::ALL
            .into_iter()
            .find(|k| k.as_str() == needle)
            .ok_or_else(|| Error::InvalidRecord(format!("unknown signal type '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DivergenceKind {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelKind {
    Support,
    Resistance,
}

/// Detector-specific evidence attached to a signal, keyed by signal kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SignalPayload {
    RsiDivergence {
        divergence: DivergenceKind,
        /// RSI at the newer extreme.
        rsi_current: f64,
        /// RSI at the older extreme.
        rsi_prev: f64,
        /// Newer price extreme (low for bullish, high for bearish).
        price_current: f64,
        price_prev: f64,
    },
    VolumeAnomaly {
        current_volume: f64,
        avg_volume_20: f64,
        volume_ratio: f64,
        /// Close-over-close change in percent.
        price_change_pct: f64,
    },
    TrendStart {
        ema_short: f64,
        ema_long: f64,
        /// 1 = crossed on the latest bar.
        bars_ago: usize,
    },
    SupportResistanceBreak {
        level: f64,
        level_kind: LevelKind,
        break_price: f64,
        volume_above_avg: bool,
    },
}

impl SignalPayload {
    pub fn kind(&self) -> SignalKind {
        match self {
            SignalPayload::RsiDivergence { .. } => SignalKind::RsiDivergence,
            SignalPayload::VolumeAnomaly { .. } => SignalKind::VolumeAnomaly,
            SignalPayload::TrendStart { .. } => SignalKind::TrendStart,
            SignalPayload::SupportResistanceBreak { .. } => SignalKind::SupportResistanceBreak,
        }
    }
}

/// A pattern event detected on the latest bar of a candle series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub severity: Severity,
    pub direction: Direction,
    #[serde(flatten)]
    pub payload: SignalPayload,
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        self.payload.kind()
    }
}

/// Coarse trend classification of the reference index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MarketRegime {
    BullTrend,
    BearTrend,
    #[default]
    Sideways,
}

impl MarketRegime {
    pub fn as_str(self) -> &'static str {
        match self {
            MarketRegime::BullTrend => "bull_trend",
            MarketRegime::BearTrend => "bear_trend",
            MarketRegime::Sideways => "sideways",
        }
    }
}

impl fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketRegime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "bull_trend" => Ok(MarketRegime::BullTrend),
            "bear_trend" => Ok(MarketRegime::BearTrend),
            "sideways" => Ok(MarketRegime::Sideways),
            other => Err(Error::InvalidRecord(format!("unknown regime '{other}'"))),
        }
    }
}

/// Forward measurement offsets, in calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Horizon {
    D3,
    D7,
    D14,
}

impl Horizon {
    pub const ALL: [Horizon; 3] = [Horizon::D3, Horizon::D7, Horizon::D14];

    pub fn days(self) -> i64 {
        match self {
            Horizon::D3 => 3,
            Horizon::D7 => 7,
            Horizon::D14 => 14,
        }
    }
}

/// A tracked signal and, once matured, its realised forward performance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub id: String,
    /// `None` = global entry not tied to a user.
    pub user_id: Option<String>,
    pub symbol: String,
    pub signal_type: SignalKind,
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub regime: MarketRegime,
    pub return_3d: Option<f64>,
    pub return_7d: Option<f64>,
    pub return_14d: Option<f64>,
    pub mfe: Option<f64>,
    pub mae: Option<f64>,
    pub evaluated: bool,
    pub created_at: DateTime<Utc>,
}

impl PerformanceRecord {
    pub fn return_at(&self, horizon: Horizon) -> Option<f64> {
        match horizon {
            Horizon::D3 => self.return_3d,
            Horizon::D7 => self.return_7d,
            Horizon::D14 => self.return_14d,
        }
    }
}

/// Fields supplied by the recorder; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPerformanceRecord {
    pub user_id: Option<String>,
    pub symbol: String,
    pub signal_type: SignalKind,
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub regime: MarketRegime,
}

/// Realised outcome written once when a record is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ForwardMetrics {
    pub return_3d: Option<f64>,
    pub return_7d: Option<f64>,
    pub return_14d: Option<f64>,
    pub mfe: Option<f64>,
    pub mae: Option<f64>,
}

impl ForwardMetrics {
    /// Replaces any non-finite value with `None`.
    pub fn sanitized(self) -> Self {
        let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
        Self {
            return_3d: finite(self.return_3d),
            return_7d: finite(self.return_7d),
            return_14d: finite(self.return_14d),
            mfe: finite(self.mfe),
            mae: finite(self.mae),
        }
    }

    pub fn return_at(&self, horizon: Horizon) -> Option<f64> {
        match horizon {
            Horizon::D3 => self.return_3d,
            Horizon::D7 => self.return_7d,
            Horizon::D14 => self.return_14d,
        }
    }
}
