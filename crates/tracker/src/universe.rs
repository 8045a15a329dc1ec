use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use common::{Error, Result};

fn default_lookback_days() -> u32 {
    90
}

fn default_concurrency() -> usize {
    4
}

/// The set of symbols the scanner walks (TOML).
///
/// Example `config/universe.toml`:
/// ```toml
/// lookback_days = 90
/// concurrency = 4
/// symbols = ["THYAO", "AKBNK", "GARAN"]
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UniverseConfig {
    /// Days of daily history fetched per symbol.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    /// Maximum symbols fetched at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    pub symbols: Vec<String>,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            concurrency: default_concurrency(),
            symbols: Vec::new(),
        }
    }
}

impl UniverseConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read universe at '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{} ({})", e, path.display())))
    }

    /// Parse and normalise: symbols trimmed, upper-cased, blanks and repeats dropped.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: UniverseConfig =
            toml::from_str(content).map_err(|e| Error::Config(format!("invalid universe: {e}")))?;

        if config.lookback_days == 0 {
            return Err(Error::Config("lookback_days must be positive".into()));
        }
        config.concurrency = config.concurrency.max(1);

        let mut seen = HashSet::new();
        config.symbols = config
            .symbols
            .into_iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty() && seen.insert(s.clone()))
            .collect();
        Ok(config)
    }
}
