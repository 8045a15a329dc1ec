pub mod evaluator;
pub mod recorder;
pub mod scanner;
pub mod scheduler;
pub mod store;
pub mod universe;
pub mod yahoo;

#[cfg(test)]
pub(crate) mod testing;

pub use evaluator::{BatchReport, ForwardReturnEvaluator};
pub use recorder::PerformanceRecorder;
pub use scanner::{filter_scan_results, ScanResult, Scanner};
pub use scheduler::Scheduler;
pub use store::SqliteStore;
pub use universe::UniverseConfig;
pub use yahoo::YahooClient;
