pub mod config;
pub mod error;
pub mod market_data;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use market_data::{CandleSource, Lookback, Timeframe};
pub use store::{RecordStore, UpsertOutcome};
pub use types::*;
