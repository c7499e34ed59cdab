//! Runtime configuration.
//!
//! Loaded from an optional JSON file, then overridden by `CHECKUP_*`
//! environment variables. Every field has a default so an empty or missing
//! file is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CheckupError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "portfolio_checkup.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub market: MarketConfig,
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Uploaded files live here only for the duration of one request.
    pub upload_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            upload_dir: PathBuf::from("uploads"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Calendar days of daily bars requested per symbol.
    pub lookback_days: i64,
    /// Exchange suffix appended to bare symbols, e.g. ".NS".
    pub symbol_suffix: String,
    /// Pause between symbols to stay under the provider's rate limit.
    pub pause_ms: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 10,
            lookback_days: 400,
            symbol_suffix: ".NS".to_string(),
            pause_ms: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub max_results: usize,
    pub rsi_low: f64,
    pub rsi_high: f64,
    pub min_volume_ratio: f64,
    pub oversold_threshold: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_results: 15,
            rsi_low: 40.0,
            rsi_high: 55.0,
            min_volume_ratio: 1.1,
            oversold_threshold: 30.0,
        }
    }
}

impl Config {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] when `path` is `None`.
    ///
    /// A missing default file yields defaults; a missing explicit file or an
    /// unparsable one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            CheckupError::Config(format!("could not read '{}': {}", path.display(), e))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            CheckupError::Config(format!("could not parse '{}': {}", path.display(), e))
        })
    }

    /// Apply `CHECKUP_*` overrides. The lookup is injected so tests do not
    /// touch the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("CHECKUP_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("CHECKUP_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| CheckupError::Config(format!("CHECKUP_PORT is not a port: {}", port)))?;
        }
        if let Some(dir) = lookup("CHECKUP_UPLOAD_DIR") {
            self.server.upload_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup("CHECKUP_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("CHECKUP_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(url) = lookup("CHECKUP_MARKET_URL") {
            self.market.base_url = url;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"server": {{"port": 8080}}, "scan": {{"max_results": 5}}}}"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.scan.max_results, 5);
        assert_eq!(config.scan.rsi_high, 55.0);
        assert_eq!(config.market.symbol_suffix, ".NS");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/checkup.json"))).unwrap_err();
        assert!(matches!(err, CheckupError::Config(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = [
            ("CHECKUP_PORT", "9001"),
            ("CHECKUP_LOG_FORMAT", "json"),
            ("CHECKUP_UPLOAD_DIR", "/tmp/up"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 9001);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.server.upload_dir, PathBuf::from("/tmp/up"));
    }

    #[test]
    fn bad_port_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_env(|k| (k == "CHECKUP_PORT").then(|| "http".to_string()))
            .unwrap_err();
        assert!(matches!(err, CheckupError::Config(_)));
    }
}
