/// All configuration loaded from environment variables at startup.
/// Missing required variables cause an immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // API
    pub api_port: u16,
    /// Shared secret for the evaluation trigger. `None` makes the trigger
    /// answer with a configuration error instead of running.
    pub eval_token: Option<String>,

    // Scheduling (0 = disabled)
    pub eval_interval_secs: u64,
    pub scan_interval_secs: u64,

    // Market data
    pub symbol_suffix: String,
    pub market_index_symbol: String,

    // Symbol universe file path
    pub universe_path: String,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on any missing required variable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        Config {
            database_url: required_env("DATABASE_URL"),
            api_port: optional_env("API_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            eval_token: optional_env("EVAL_TOKEN").filter(|t| !t.trim().is_empty()),
            eval_interval_secs: optional_env("EVAL_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(86_400),
            scan_interval_secs: optional_env("SCAN_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            symbol_suffix: optional_env("SYMBOL_SUFFIX").unwrap_or_else(|| ".IS".to_string()),
            market_index_symbol: optional_env("MARKET_INDEX_SYMBOL")
                .unwrap_or_else(|| "^XU100".to_string()),
            universe_path: optional_env("UNIVERSE_PATH")
                .unwrap_or_else(|| "config/universe.toml".to_string()),
        }
    }
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
