//! RSI momentum scanner and oversold screener.
//!
//! Both walk a symbol list through a [`HistoryProvider`], one symbol at a
//! time. A symbol that fails to load or has too little history is logged and
//! skipped; the scan carries on with the rest.

use serde::Serialize;

use crate::config::ScanConfig;
use crate::error::{CheckupError, Result};
use crate::indicators::{self, last};
use crate::market::{HistoryProvider, PriceHistory};

/// Daily bars needed before the 220-day average is meaningful.
pub const MIN_BARS: usize = 250;
pub const RSI_PERIOD: usize = 14;
const VOLUME_WINDOW: usize = 20;

/// Indicator values on the latest bar of one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct TechnicalSnapshot {
    pub symbol: String,
    pub company_name: Option<String>,
    pub close: f64,
    pub rsi: Option<f64>,
    /// Change over the last three defined RSI readings.
    pub rsi_trend: f64,
    pub volume_ratio: Option<f64>,
    pub price_change_5d: Option<f64>,
    pub price_change_10d: Option<f64>,
    pub macd: f64,
    pub macd_signal: f64,
    pub sma_10: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_220: Option<f64>,
    /// 0-8
    pub momentum_score: u8,
}

fn gt(value: Option<f64>, threshold: f64) -> bool {
    value.is_some_and(|v| v > threshold)
}

impl TechnicalSnapshot {
    fn above(&self, average: Option<f64>) -> bool {
        average.is_some_and(|avg| self.close > avg)
    }

    pub fn macd_bullish(&self) -> bool {
        self.macd > self.macd_signal
    }

    pub fn above_sma10(&self) -> bool {
        self.above(self.sma_10)
    }

    pub fn above_sma20(&self) -> bool {
        self.above(self.sma_20)
    }

    pub fn above_sma50(&self) -> bool {
        self.above(self.sma_50)
    }

    pub fn above_sma220(&self) -> bool {
        self.above(self.sma_220)
    }

    pub fn trend_arrow(&self) -> &'static str {
        if self.rsi_trend > 0.5 {
            "↑"
        } else if self.rsi_trend < -0.5 {
            "↓"
        } else {
            "→"
        }
    }

    pub fn dma_status(&self) -> &'static str {
        if self.above_sma50() && self.above_sma220() {
            "50+220"
        } else {
            "FAIL"
        }
    }

    fn score(&self) -> u8 {
        [
            gt(self.volume_ratio, 1.3),
            gt(self.price_change_5d, 1.0),
            self.macd_bullish(),
            self.above_sma10(),
            self.above_sma20(),
            self.above_sma50(),
            self.above_sma220(),
            gt(self.price_change_10d, 0.0),
        ]
        .into_iter()
        .filter(|hit| *hit)
        .count() as u8
    }

    /// Entry filter: RSI band, volume, momentum, and price above both the 50
    /// and 220 day averages.
    pub fn passes(&self, config: &ScanConfig) -> bool {
        let rsi_in_band = self
            .rsi
            .is_some_and(|r| r >= config.rsi_low && r <= config.rsi_high);
        let volume_ok = gt(self.volume_ratio, config.min_volume_ratio);
        let momentum = gt(self.price_change_5d, -2.0) || self.macd_bullish() || self.above_sma10();

        rsi_in_band && volume_ok && momentum && self.above_sma50() && self.above_sma220()
    }
}

/// Compute the snapshot for the latest bar.
pub fn analyze(history: &PriceHistory) -> Result<TechnicalSnapshot> {
    if history.len() < MIN_BARS {
        return Err(CheckupError::InsufficientData {
            symbol: history.symbol.clone(),
            bars: history.len(),
            required: MIN_BARS,
        });
    }

    let closes = history.closes();
    let volumes = history.volumes();

    let rsi_series = indicators::rsi(&closes, RSI_PERIOD);
    let volume_ma = last(&indicators::sma(&volumes, VOLUME_WINDOW));
    let (macd, signal) = indicators::macd(&closes);

    let close = closes[closes.len() - 1];
    let volume = volumes[volumes.len() - 1];

    let recent_rsi: Vec<f64> = rsi_series[rsi_series.len().saturating_sub(5)..]
        .iter()
        .flatten()
        .copied()
        .collect();
    let rsi_trend = if recent_rsi.len() >= 3 {
        recent_rsi[recent_rsi.len() - 1] - recent_rsi[recent_rsi.len() - 3]
    } else {
        0.0
    };

    let mut snapshot = TechnicalSnapshot {
        symbol: history.symbol.clone(),
        company_name: history.company_name.clone(),
        close,
        rsi: last(&rsi_series),
        rsi_trend,
        volume_ratio: volume_ma.filter(|ma| *ma > 0.0).map(|ma| volume / ma),
        price_change_5d: last(&indicators::pct_change(&closes, 5)),
        price_change_10d: last(&indicators::pct_change(&closes, 10)),
        macd: macd.last().copied().unwrap_or_default(),
        macd_signal: signal.last().copied().unwrap_or_default(),
        sma_10: last(&indicators::sma(&closes, 10)),
        sma_20: last(&indicators::sma(&closes, 20)),
        sma_50: last(&indicators::sma(&closes, 50)),
        sma_220: last(&indicators::sma(&closes, 220)),
        momentum_score: 0,
    };
    snapshot.momentum_score = snapshot.score();
    Ok(snapshot)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanOutcome {
    pub matches: Vec<TechnicalSnapshot>,
    pub analyzed: usize,
    pub skipped: usize,
}

/// Scan `symbols` in order, stopping once `max_results` matches are found.
/// Matches are sorted by momentum score desc, then RSI asc.
pub async fn scan(
    provider: &dyn HistoryProvider,
    symbols: &[String],
    config: &ScanConfig,
) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();

    for symbol in symbols {
        if outcome.matches.len() >= config.max_results {
            break;
        }

        let snapshot = match provider.history(symbol).await.and_then(|h| analyze(&h)) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(%symbol, error = %e, "Skipping symbol");
                outcome.skipped += 1;
                continue;
            }
        };
        outcome.analyzed += 1;

        if snapshot.passes(config) {
            tracing::info!(
                %symbol,
                rsi = snapshot.rsi.unwrap_or_default(),
                volume_ratio = snapshot.volume_ratio.unwrap_or_default(),
                score = snapshot.momentum_score,
                "Opportunity"
            );
            outcome.matches.push(snapshot);
        }

        let pause = provider.pause();
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    rank_matches(&mut outcome.matches);
    tracing::info!(
        found = outcome.matches.len(),
        analyzed = outcome.analyzed,
        skipped = outcome.skipped,
        "Scan complete"
    );
    outcome
}

/// Score desc, then RSI asc.
pub fn rank_matches(matches: &mut [TechnicalSnapshot]) {
    matches.sort_by(|a, b| {
        b.momentum_score.cmp(&a.momentum_score).then(
            a.rsi
                .unwrap_or_default()
                .total_cmp(&b.rsi.unwrap_or_default()),
        )
    });
}

/// Merge matches from several lists: score desc, then volume ratio desc.
pub fn combine(lists: Vec<Vec<TechnicalSnapshot>>) -> Vec<TechnicalSnapshot> {
    let mut all: Vec<TechnicalSnapshot> = lists.into_iter().flatten().collect();
    all.sort_by(|a, b| {
        b.momentum_score.cmp(&a.momentum_score).then(
            b.volume_ratio
                .unwrap_or_default()
                .total_cmp(&a.volume_ratio.unwrap_or_default()),
        )
    });
    all
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub symbol: String,
    pub action: &'static str,
    pub rsi: f64,
    pub volume_ratio: f64,
    pub price_change_5d: f64,
    pub momentum_score: u8,
    pub above_sma50: bool,
    pub above_sma220: bool,
}

/// Up to five high-conviction entries from an already ordered list.
pub fn recommendations(snapshots: &[TechnicalSnapshot]) -> Vec<Recommendation> {
    snapshots
        .iter()
        .filter(|s| s.momentum_score >= 5 && gt(s.volume_ratio, 1.2))
        .take(5)
        .map(|s| Recommendation {
            symbol: s.symbol.clone(),
            action: if s.momentum_score >= 6 { "STRONG BUY" } else { "BUY" },
            rsi: s.rsi.unwrap_or_default(),
            volume_ratio: s.volume_ratio.unwrap_or_default(),
            price_change_5d: s.price_change_5d.unwrap_or_default(),
            momentum_score: s.momentum_score,
            above_sma50: s.above_sma50(),
            above_sma220: s.above_sma220(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RsiDirection {
    Rising,
    Falling,
    Flat,
}

impl RsiDirection {
    pub fn arrow(self) -> &'static str {
        match self {
            RsiDirection::Rising => "↗",
            RsiDirection::Falling => "↘",
            RsiDirection::Flat => "→",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OversoldHit {
    pub symbol: String,
    pub price: f64,
    pub rsi: f64,
    pub trend: RsiDirection,
    pub volume_ratio: f64,
    pub date: chrono::NaiveDate,
}

impl OversoldHit {
    pub fn volume_label(&self) -> &'static str {
        if self.volume_ratio > 1.5 {
            "High"
        } else if self.volume_ratio < 0.8 {
            "Low"
        } else {
            "Norm"
        }
    }
}

/// Wilder RSI reading on the latest bar, or `None` when the series is too
/// short to produce one.
pub fn oversold_reading(history: &PriceHistory) -> Option<OversoldHit> {
    let closes = history.closes();
    let volumes = history.volumes();
    let series = indicators::rsi_wilder(&closes, RSI_PERIOD);

    let rsi = last(&series)?;
    let previous = series
        .len()
        .checked_sub(2)
        .and_then(|i| series[i])
        .unwrap_or(rsi);
    let trend = if rsi > previous {
        RsiDirection::Rising
    } else if rsi < previous {
        RsiDirection::Falling
    } else {
        RsiDirection::Flat
    };

    let volume_ratio = match last(&indicators::sma(&volumes, VOLUME_WINDOW)) {
        Some(avg) if avg > 0.0 => volumes.last().copied().unwrap_or_default() / avg,
        _ => 1.0,
    };

    Some(OversoldHit {
        symbol: history.symbol.clone(),
        price: closes.last().copied().unwrap_or_default(),
        rsi,
        trend,
        volume_ratio,
        date: history.last_date()?,
    })
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OversoldOutcome {
    pub hits: Vec<OversoldHit>,
    pub processed: usize,
    pub skipped: usize,
}

impl OversoldOutcome {
    /// Hits in `(low, high]`.
    pub fn between(&self, low: f64, high: f64) -> Vec<&OversoldHit> {
        self.hits
            .iter()
            .filter(|h| h.rsi > low && h.rsi <= high)
            .collect()
    }

    pub fn extremely_oversold(&self) -> Vec<&OversoldHit> {
        self.between(f64::NEG_INFINITY, 20.0)
    }

    pub fn very_oversold(&self) -> Vec<&OversoldHit> {
        self.between(20.0, 25.0)
    }

    pub fn moderately_oversold(&self) -> Vec<&OversoldHit> {
        self.between(25.0, 30.0)
    }

    pub fn lowest_rsi(&self) -> Option<f64> {
        self.hits.iter().map(|h| h.rsi).reduce(f64::min)
    }

    pub fn average_rsi(&self) -> Option<f64> {
        if self.hits.is_empty() {
            return None;
        }
        Some(self.hits.iter().map(|h| h.rsi).sum::<f64>() / self.hits.len() as f64)
    }
}

/// Every symbol with Wilder RSI at or below `threshold`, most oversold first.
pub async fn screen_oversold(
    provider: &dyn HistoryProvider,
    symbols: &[String],
    threshold: f64,
) -> OversoldOutcome {
    let mut outcome = OversoldOutcome::default();

    for symbol in symbols {
        let reading = match provider.history(symbol).await {
            Ok(history) => oversold_reading(&history),
            Err(e) => {
                tracing::warn!(%symbol, error = %e, "Skipping symbol");
                outcome.skipped += 1;
                continue;
            }
        };

        let Some(hit) = reading else {
            tracing::warn!(%symbol, "RSI calculation failed");
            outcome.skipped += 1;
            continue;
        };
        outcome.processed += 1;
        tracing::debug!(%symbol, rsi = hit.rsi, "RSI computed");

        if hit.rsi <= threshold {
            outcome.hits.push(hit);
        }

        let pause = provider.pause();
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    outcome.hits.sort_by(|a, b| a.rsi.total_cmp(&b.rsi));
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::InMemoryProvider;

    /// Gentle uptrend with a small zigzag so RSI lands mid-band, finishing on
    /// a volume spike.
    fn uptrend(symbol: &str, bars: usize) -> PriceHistory {
        let closes: Vec<f64> = (0..bars)
            .map(|i| {
                let zig = if i % 2 == 0 { 1.0 } else { -0.8 };
                100.0 + i as f64 * 0.05 + zig
            })
            .collect();
        let mut volumes = vec![1000.0; bars];
        if let Some(v) = volumes.last_mut() {
            *v = 2000.0;
        }
        InMemoryProvider::series(symbol, &closes, &volumes)
    }

    fn downtrend(symbol: &str, bars: usize) -> PriceHistory {
        let closes: Vec<f64> = (0..bars).map(|i| 500.0 - i as f64).collect();
        InMemoryProvider::series(symbol, &closes, &vec![1000.0; bars])
    }

    #[test]
    fn short_history_is_rejected() {
        let err = analyze(&uptrend("SHORT", 100)).unwrap_err();
        assert!(matches!(
            err,
            CheckupError::InsufficientData { bars: 100, required: 250, .. }
        ));
    }

    #[test]
    fn uptrend_snapshot() {
        let snap = analyze(&uptrend("UP", 300)).unwrap();
        let rsi = snap.rsi.unwrap();
        assert!(rsi > 40.0 && rsi < 60.0, "rsi {}", rsi);
        assert!((snap.volume_ratio.unwrap() - 2000.0 / 1050.0).abs() < 1e-9);
        assert!(snap.above_sma220());
        assert!(snap.above_sma50());
        assert!(snap.momentum_score <= 8);
        assert_eq!(snap.dma_status(), "50+220");
    }

    #[test]
    fn downtrend_fails_filter() {
        let snap = analyze(&downtrend("DOWN", 300)).unwrap();
        assert!(!snap.above_sma50());
        assert!(!snap.passes(&ScanConfig::default()));
        assert_eq!(snap.rsi, Some(0.0));
    }

    #[test]
    fn trend_arrows() {
        let mut snap = analyze(&uptrend("UP", 300)).unwrap();
        snap.rsi_trend = 0.6;
        assert_eq!(snap.trend_arrow(), "↑");
        snap.rsi_trend = -0.6;
        assert_eq!(snap.trend_arrow(), "↓");
        snap.rsi_trend = 0.5;
        assert_eq!(snap.trend_arrow(), "→");
    }

    #[test]
    fn recommendation_rules() {
        let base = analyze(&uptrend("UP", 300)).unwrap();
        let with = |symbol: &str, score: u8, vol: f64| TechnicalSnapshot {
            symbol: symbol.to_string(),
            momentum_score: score,
            volume_ratio: Some(vol),
            ..base.clone()
        };

        let list = combine(vec![
            vec![with("A", 6, 1.5), with("B", 5, 1.3)],
            vec![with("C", 5, 1.1), with("D", 7, 1.25), with("E", 4, 3.0)],
        ]);
        let order: Vec<&str> = list.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(order, vec!["D", "A", "B", "C", "E"]);

        let recs = recommendations(&list);
        let picked: Vec<(&str, &str)> = recs.iter().map(|r| (r.symbol.as_str(), r.action)).collect();
        assert_eq!(
            picked,
            vec![("D", "STRONG BUY"), ("A", "STRONG BUY"), ("B", "BUY")]
        );
    }

    /// Snapshot that passes the default filter, with a fixed volume ratio.
    fn passing() -> TechnicalSnapshot {
        let snap = TechnicalSnapshot {
            volume_ratio: Some(1.5),
            ..analyze(&uptrend("UP", 300)).unwrap()
        };
        assert!(snap.passes(&ScanConfig::default()));
        snap
    }

    #[test]
    fn rsi_band_is_inclusive() {
        let config = ScanConfig::default();
        let with_rsi = |rsi: f64| TechnicalSnapshot {
            rsi: Some(rsi),
            ..passing()
        };
        assert!(with_rsi(40.0).passes(&config));
        assert!(with_rsi(55.0).passes(&config));
        assert!(!with_rsi(39.99).passes(&config));
        assert!(!with_rsi(55.01).passes(&config));

        let undefined = TechnicalSnapshot {
            rsi: None,
            ..passing()
        };
        assert!(!undefined.passes(&config));
    }

    #[test]
    fn volume_ratio_is_strict() {
        let config = ScanConfig::default();
        let with_volume = |ratio: Option<f64>| TechnicalSnapshot {
            volume_ratio: ratio,
            ..passing()
        };
        assert!(!with_volume(Some(1.1)).passes(&config));
        assert!(with_volume(Some(1.1001)).passes(&config));
        assert!(!with_volume(None).passes(&config));
    }

    #[test]
    fn undefined_averages_fail_the_dma_filter() {
        let config = ScanConfig::default();
        let no_220 = TechnicalSnapshot {
            sma_220: None,
            ..passing()
        };
        assert!(!no_220.above_sma220());
        assert!(!no_220.passes(&config));

        let no_50 = TechnicalSnapshot {
            sma_50: None,
            ..passing()
        };
        assert!(!no_50.passes(&config));
    }

    #[test]
    fn matches_rank_by_score_then_rsi() {
        let with = |symbol: &str, score: u8, rsi: f64| TechnicalSnapshot {
            symbol: symbol.to_string(),
            momentum_score: score,
            rsi: Some(rsi),
            ..passing()
        };
        let mut matches = vec![
            with("A", 5, 45.0),
            with("B", 7, 52.0),
            with("C", 5, 41.0),
            with("D", 7, 48.0),
        ];
        rank_matches(&mut matches);
        let order: Vec<&str> = matches.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(order, vec!["D", "B", "C", "A"]);
    }

    #[tokio::test]
    async fn scan_returns_passing_symbols() {
        let provider = InMemoryProvider::new([uptrend("UP", 300), downtrend("DOWN", 300)]);
        let symbols: Vec<String> = vec!["DOWN".into(), "UP".into()];

        let outcome = scan(&provider, &symbols, &ScanConfig::default()).await;
        assert_eq!(outcome.analyzed, 2);
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].symbol, "UP");
    }

    #[tokio::test]
    async fn scan_stops_at_max_results() {
        let provider = InMemoryProvider::new([
            uptrend("UP1", 300),
            uptrend("UP2", 300),
            uptrend("UP3", 300),
        ]);
        let symbols: Vec<String> = vec!["UP1".into(), "UP2".into(), "UP3".into()];
        let config = ScanConfig {
            max_results: 2,
            ..ScanConfig::default()
        };

        let outcome = scan(&provider, &symbols, &config).await;
        assert_eq!(outcome.matches.len(), 2);
        assert_eq!(outcome.analyzed, 2);
    }

    #[test]
    fn oversold_bucket_edges() {
        let date = chrono::NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let hit = |symbol: &str, rsi: f64| OversoldHit {
            symbol: symbol.to_string(),
            price: 100.0,
            rsi,
            trend: RsiDirection::Flat,
            volume_ratio: 1.0,
            date,
        };
        let outcome = OversoldOutcome {
            hits: vec![
                hit("A", 19.9),
                hit("B", 20.0),
                hit("C", 20.1),
                hit("D", 25.0),
                hit("E", 25.1),
                hit("F", 30.0),
            ],
            processed: 6,
            skipped: 0,
        };
        let symbols = |hits: Vec<&OversoldHit>| -> Vec<String> {
            hits.iter().map(|h| h.symbol.clone()).collect()
        };

        assert_eq!(symbols(outcome.extremely_oversold()), vec!["A", "B"]);
        assert_eq!(symbols(outcome.very_oversold()), vec!["C", "D"]);
        assert_eq!(symbols(outcome.moderately_oversold()), vec!["E", "F"]);
        assert_eq!(outcome.lowest_rsi(), Some(19.9));
    }

    #[tokio::test]
    async fn scan_skips_failures_and_short_series() {
        let provider = InMemoryProvider::new([uptrend("UP", 300), uptrend("SHORT", 50)]);
        let symbols: Vec<String> = ["UP", "SHORT", "MISSING"].iter().map(|s| s.to_string()).collect();

        let outcome = scan(&provider, &symbols, &ScanConfig::default()).await;
        assert_eq!(outcome.analyzed, 1);
        assert_eq!(outcome.skipped, 2);
    }

    #[tokio::test]
    async fn oversold_screen_sorts_and_buckets() {
        let provider = InMemoryProvider::new([
            downtrend("FALL", 60),
            uptrend("RISE", 60),
        ]);
        let symbols: Vec<String> = vec!["RISE".into(), "FALL".into(), "NONE".into()];

        let outcome = screen_oversold(&provider, &symbols, 30.0).await;
        assert_eq!(outcome.processed, 2);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.hits.len(), 1);

        let hit = &outcome.hits[0];
        assert_eq!(hit.symbol, "FALL");
        assert_eq!(hit.rsi, 0.0);
        assert_eq!(hit.volume_label(), "Norm");
        assert_eq!(outcome.extremely_oversold().len(), 1);
        assert!(outcome.very_oversold().is_empty());
        assert_eq!(outcome.lowest_rsi(), Some(0.0));
    }
}
