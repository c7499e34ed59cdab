//! Dashboard payload served by the HTTP API.

use serde::Serialize;
use std::collections::HashMap;

use crate::checkpoint::{self, RedFlag};
use crate::error::{CheckupError, Result};
use crate::fundamentals::Fundamentals;
use crate::holdings::{Holding, Portfolio};
use crate::quality::{self, GreenFlag};
use crate::sectors;

const SECTOR_COLORS: [&str; 7] = [
    "#3B82F6", "#10B981", "#F59E0B", "#EF4444", "#8B5CF6", "#06B6D4", "#F97316",
];

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPayload {
    pub total_stocks: usize,
    pub total_invested: f64,
    pub current_value: f64,
    /// Net P&L; negative is a loss.
    pub total_loss: f64,
    pub risk_score: f64,
    pub risk_distribution: RiskDistribution,
    pub stocks_matrix: Vec<MatrixPoint>,
    pub sector_allocation: Vec<SectorSlice>,
}

/// Percent of stocks per risk band.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskDistribution {
    pub high_risk: f64,
    pub medium_risk: f64,
    pub low_risk: f64,
}

/// One stock on the 1-10 quality/risk plane.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MatrixPoint {
    pub symbol: String,
    pub quality: f64,
    pub risk: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SectorSlice {
    pub sector: String,
    pub percentage: f64,
    pub color: &'static str,
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Map a flag count onto 1..=10.
fn scale(count: usize, max: usize) -> f64 {
    1.0 + 9.0 * count as f64 / max as f64
}

fn matrix_point(holding: &Holding, fundamentals: Option<Fundamentals>) -> MatrixPoint {
    let (quality, risk) = match fundamentals {
        Some(f) => (
            scale(quality::screen(&f).count(), GreenFlag::ALL.len()),
            scale(checkpoint::evaluate(&f).count(), RedFlag::ALL.len()),
        ),
        // Without fundamentals, lean on whether the position is in profit.
        None if holding.pnl() > 0.0 => (6.0, 3.0),
        None => (4.5, 4.5),
    };
    MatrixPoint {
        symbol: holding.symbol.clone(),
        quality: round1(quality.clamp(1.0, 10.0)),
        risk: round1(risk.clamp(1.0, 10.0)),
    }
}

fn risk_distribution(points: &[MatrixPoint]) -> RiskDistribution {
    let total = points.len() as f64;
    let high = points.iter().filter(|p| p.risk > 5.0).count() as f64;
    let medium = points
        .iter()
        .filter(|p| p.risk >= 3.0 && p.risk <= 5.0)
        .count() as f64;
    let low = total - high - medium;

    let pct = |n: f64| if total > 0.0 { round1(n / total * 100.0) } else { 0.0 };
    RiskDistribution {
        high_risk: pct(high),
        medium_risk: pct(medium),
        low_risk: pct(low),
    }
}

/// Share of current value per sector, in order of first appearance.
fn sector_allocation(portfolio: &Portfolio) -> Vec<SectorSlice> {
    let total = portfolio.total_current_value();
    let mut order: Vec<String> = Vec::new();
    let mut values: HashMap<String, f64> = HashMap::new();

    for h in &portfolio.holdings {
        let sector = sectors::sector_of(h);
        if !values.contains_key(&sector) {
            order.push(sector.clone());
        }
        *values.entry(sector).or_insert(0.0) += h.current_value();
    }

    order
        .into_iter()
        .enumerate()
        .map(|(i, sector)| {
            let value = values.get(&sector).copied().unwrap_or_default();
            SectorSlice {
                percentage: if total > 0.0 { round1(value / total * 100.0) } else { 0.0 },
                color: SECTOR_COLORS[i % SECTOR_COLORS.len()],
                sector,
            }
        })
        .collect()
}

/// 70 at break-even, moving 3 points per 10% of return, clamped to 0-100.
fn risk_score(portfolio: &Portfolio) -> f64 {
    let invested = portfolio.total_invested();
    if invested == 0.0 {
        return 70.0;
    }
    let return_frac = portfolio.total_pnl() / invested;
    round1((70.0 + return_frac * 30.0).clamp(0.0, 100.0))
}

/// Build the dashboard payload. `lookup` supplies fundamentals where known.
pub fn analyze<F>(portfolio: &Portfolio, lookup: F) -> Result<DashboardPayload>
where
    F: Fn(&str) -> Option<Fundamentals>,
{
    if portfolio.is_empty() {
        return Err(CheckupError::EmptyPortfolio);
    }

    let stocks_matrix: Vec<MatrixPoint> = portfolio
        .holdings
        .iter()
        .map(|h| matrix_point(h, lookup(&h.symbol)))
        .collect();

    Ok(DashboardPayload {
        total_stocks: portfolio.len(),
        total_invested: portfolio.total_invested(),
        current_value: portfolio.total_current_value(),
        total_loss: portfolio.total_pnl(),
        risk_score: risk_score(portfolio),
        risk_distribution: risk_distribution(&stocks_matrix),
        sector_allocation: sector_allocation(portfolio),
        stocks_matrix,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fundamentals::reference;
    use crate::holdings::{api_demo_portfolio, demo_portfolio};

    #[test]
    fn api_demo_payload() {
        let payload = analyze(&api_demo_portfolio(), reference).unwrap();
        assert_eq!(payload.total_stocks, 3);
        assert_eq!(payload.total_invested, 710_000.0);
        assert_eq!(payload.current_value, 735_000.0);
        assert_eq!(payload.total_loss, 25_000.0);
        assert_eq!(payload.risk_score, 71.1);

        let reliance = &payload.stocks_matrix[0];
        assert_eq!((reliance.quality, reliance.risk), (4.5, 4.5));
        let tcs = &payload.stocks_matrix[1];
        assert_eq!((tcs.quality, tcs.risk), (6.0, 3.0));

        assert_eq!(payload.risk_distribution.medium_risk, 100.0);

        let sectors: Vec<(&str, &str)> = payload
            .sector_allocation
            .iter()
            .map(|s| (s.sector.as_str(), s.color))
            .collect();
        assert_eq!(
            sectors,
            vec![("Energy & Utilities", "#3B82F6"), ("Information Technology", "#10B981")]
        );
        assert_eq!(payload.sector_allocation[0].percentage, 32.7);
    }

    #[test]
    fn known_symbols_use_flag_counts() {
        let payload = analyze(&demo_portfolio(), reference).unwrap();
        let point = |sym: &str| payload.stocks_matrix.iter().find(|p| p.symbol == sym).unwrap();
        // 7 of 7 red flags
        assert_eq!(point("NOVAAGRI").risk, 10.0);
        // 2 red flags
        assert_eq!(point("CDSL").risk, 3.6);
        assert!(payload.risk_score < 70.0);

        let d = &payload.risk_distribution;
        assert!((d.high_risk + d.medium_risk + d.low_risk - 100.0).abs() < 0.2);
    }

    #[test]
    fn serializes_camel_case() {
        let payload = analyze(&api_demo_portfolio(), reference).unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("totalStocks").is_some());
        assert!(json["riskDistribution"].get("highRisk").is_some());
        assert!(json["sectorAllocation"][0].get("color").is_some());
    }

    #[test]
    fn empty_portfolio_is_rejected() {
        let err = analyze(&Portfolio::default(), reference).unwrap_err();
        assert!(matches!(err, CheckupError::EmptyPortfolio));
    }

    #[test]
    fn analysis_is_deterministic() {
        let a = analyze(&demo_portfolio(), reference).unwrap();
        let b = analyze(&demo_portfolio(), reference).unwrap();
        assert_eq!(a, b);
    }
}
