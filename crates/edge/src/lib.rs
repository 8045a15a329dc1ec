//! Edge statistics over evaluated performance records and the confidence
//! figure derived from them. Pure functions, no I/O.

pub mod confidence;
pub mod stats;

pub use confidence::confidence_score;
pub use stats::{compute_signal_edge, horizon_stats, HorizonEdgeStats, SignalEdgeStats, MIN_SAMPLE};
