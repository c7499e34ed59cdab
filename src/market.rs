//! Daily price history from Yahoo Finance.
//!
//! The scanners only need closes and volumes, so the provider trait is
//! deliberately narrow: one call per symbol returning oldest-first daily bars.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::MarketConfig;
use crate::error::{CheckupError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistory {
    pub symbol: String,
    pub company_name: Option<String>,
    pub bars: Vec<DailyBar>,
}

impl PriceHistory {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }
}

#[async_trait]
pub trait HistoryProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Daily bars for `symbol`, oldest first.
    async fn history(&self, symbol: &str) -> Result<PriceHistory>;

    /// Delay to observe between consecutive symbols.
    fn pause(&self) -> Duration {
        Duration::ZERO
    }
}

pub struct YahooProvider {
    client: reqwest::Client,
    config: MarketConfig,
}

impl YahooProvider {
    pub fn new(config: MarketConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("Mozilla/5.0 (portfolio-checkup)")
            .build()?;
        Ok(Self { client, config })
    }

    /// Exchange ticker for a bare symbol, e.g. "TCS" -> "TCS.NS".
    pub fn ticker(&self, symbol: &str) -> String {
        with_suffix(symbol, &self.config.symbol_suffix)
    }

    fn chart_url(&self, ticker: &str, now: DateTime<Utc>) -> String {
        let end = now.timestamp();
        let start = (now - chrono::Duration::days(self.config.lookback_days)).timestamp();
        format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d",
            self.config.base_url.trim_end_matches('/'),
            ticker,
            start,
            end
        )
    }
}

#[async_trait]
impl HistoryProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn history(&self, symbol: &str) -> Result<PriceHistory> {
        let ticker = self.ticker(symbol);
        let url = self.chart_url(&ticker, Utc::now());
        tracing::debug!(%ticker, %url, "Fetching daily history");

        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(CheckupError::MarketData {
                symbol: ticker,
                reason: format!("HTTP {}", resp.status()),
            });
        }

        let json: Value = resp.json().await?;
        parse_chart(&ticker, &json)
    }

    fn pause(&self) -> Duration {
        Duration::from_millis(self.config.pause_ms)
    }
}

/// Append `suffix` unless the symbol already carries an exchange suffix.
pub fn with_suffix(symbol: &str, suffix: &str) -> String {
    let symbol = symbol.trim().to_uppercase();
    if suffix.is_empty() || symbol.contains('.') || symbol.starts_with('^') {
        symbol
    } else {
        format!("{}{}", symbol, suffix)
    }
}

/// Build a [`PriceHistory`] from a chart API response. Bars with a missing
/// close are dropped; a missing volume counts as zero.
pub fn parse_chart(symbol: &str, json: &Value) -> Result<PriceHistory> {
    let fail = |reason: &str| CheckupError::MarketData {
        symbol: symbol.to_string(),
        reason: reason.to_string(),
    };

    if let Some(desc) = json["chart"]["error"]["description"].as_str() {
        return Err(fail(desc));
    }

    let result = json["chart"]["result"]
        .as_array()
        .and_then(|r| r.first())
        .ok_or_else(|| fail("no chart result"))?;

    let timestamps = result["timestamp"].as_array().ok_or_else(|| fail("no timestamps"))?;
    let quote = result["indicators"]["quote"]
        .as_array()
        .and_then(|q| q.first())
        .ok_or_else(|| fail("no quote block"))?;
    let closes = quote["close"].as_array().ok_or_else(|| fail("no closes"))?;
    let volumes = quote["volume"].as_array();

    let bars = timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let close = closes.get(i)?.as_f64()?;
            let date = DateTime::from_timestamp(ts.as_i64()?, 0)?.date_naive();
            let volume = volumes
                .and_then(|v| v.get(i))
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            Some(DailyBar { date, close, volume })
        })
        .collect();

    let company_name = result["meta"]["longName"]
        .as_str()
        .or_else(|| result["meta"]["shortName"].as_str())
        .map(str::to_string);

    Ok(PriceHistory {
        symbol: symbol.to_string(),
        company_name,
        bars,
    })
}

/// Serves preloaded histories. Unknown symbols are a market-data error.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProvider {
    histories: HashMap<String, PriceHistory>,
}

impl InMemoryProvider {
    pub fn new(histories: impl IntoIterator<Item = PriceHistory>) -> Self {
        Self {
            histories: histories
                .into_iter()
                .map(|h| (h.symbol.to_uppercase(), h))
                .collect(),
        }
    }

    /// Synthetic history from closes and volumes, one bar per day ending today.
    pub fn series(symbol: &str, closes: &[f64], volumes: &[f64]) -> PriceHistory {
        let today = Utc::now().date_naive();
        let n = closes.len();
        let bars = closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (&close, &volume))| DailyBar {
                date: today - chrono::Duration::days((n - 1 - i) as i64),
                close,
                volume,
            })
            .collect();
        PriceHistory {
            symbol: symbol.to_uppercase(),
            company_name: None,
            bars,
        }
    }
}

#[async_trait]
impl HistoryProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    async fn history(&self, symbol: &str) -> Result<PriceHistory> {
        self.histories
            .get(&symbol.trim().to_uppercase())
            .cloned()
            .ok_or_else(|| CheckupError::MarketData {
                symbol: symbol.to_string(),
                reason: "no data".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn suffix_rules() {
        assert_eq!(with_suffix("tcs", ".NS"), "TCS.NS");
        assert_eq!(with_suffix("TCS.NS", ".NS"), "TCS.NS");
        assert_eq!(with_suffix("TCS.BO", ".NS"), "TCS.BO");
        assert_eq!(with_suffix("^NSEI", ".NS"), "^NSEI");
        assert_eq!(with_suffix("AAPL", ""), "AAPL");
    }

    #[test]
    fn parses_chart_and_skips_null_closes() {
        let body = json!({
            "chart": {
                "result": [{
                    "meta": {"longName": "Tata Consultancy Services Limited"},
                    "timestamp": [1700000000, 1700086400, 1700172800],
                    "indicators": {"quote": [{
                        "close": [3500.0, null, 3550.5],
                        "volume": [1000, 2000, null]
                    }]}
                }],
                "error": null
            }
        });

        let history = parse_chart("TCS.NS", &body).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.closes(), vec![3500.0, 3550.5]);
        assert_eq!(history.volumes(), vec![1000.0, 0.0]);
        assert_eq!(
            history.company_name.as_deref(),
            Some("Tata Consultancy Services Limited")
        );
        assert!(history.bars[0].date < history.bars[1].date);
    }

    #[test]
    fn chart_error_is_reported() {
        let body = json!({
            "chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}
        });
        let err = parse_chart("BAD.NS", &body).unwrap_err();
        assert!(err.to_string().contains("delisted"));
    }

    #[test]
    fn chart_url_uses_lookback() {
        let provider = YahooProvider::new(MarketConfig {
            base_url: "http://localhost:9999/".to_string(),
            lookback_days: 10,
            ..MarketConfig::default()
        })
        .unwrap();
        let now = DateTime::from_timestamp(1_000_000_000, 0).unwrap();
        let url = provider.chart_url("TCS.NS", now);
        assert_eq!(
            url,
            "http://localhost:9999/v8/finance/chart/TCS.NS?period1=999136000&period2=1000000000&interval=1d"
        );
    }

    #[tokio::test]
    async fn in_memory_provider_round_trip() {
        let series = InMemoryProvider::series("abc", &[1.0, 2.0], &[10.0, 20.0]);
        let provider = InMemoryProvider::new([series]);
        let history = provider.history("ABC").await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(provider.history("XYZ").await.is_err());
    }
}
