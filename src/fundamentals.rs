//! Per-symbol fundamentals feeding the red-flag and green-flag rules.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::holdings::{Holding, Portfolio};

/// Financial ratios for one stock. Percentages are plain numbers
/// (`12.5` means 12.5%). Market cap is in ₹ crore.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Fundamentals {
    // profitability
    pub roe_current: f64,
    pub roe_3y_avg: f64,
    pub roe_5y_avg: f64,
    // balance sheet and ownership
    pub debt_equity: f64,
    pub promoter_holding: f64,
    pub pledged_percentage: f64,
    /// Debt three years back over debt five years back; above 1 means debt grew.
    pub debt_3y_vs_5y: f64,
    // price performance
    pub return_1y: f64,
    pub return_3y: f64,
    // valuation
    pub current_pe: f64,
    pub historical_pe_3y: f64,
    pub historical_pe_5y: f64,
    pub peg_ratio: f64,
    pub eps_growth_3y: f64,
    pub eps_growth_5y: f64,
    pub market_cap: f64,
}

/// Estimated fundamentals for the demo portfolio.
static REFERENCE: Lazy<HashMap<&'static str, Fundamentals>> = Lazy::new(|| {
    // symbol, roe_cur, roe3, roe5, d/e, promoter, pledge, debt3v5, ret1y, ret3y,
    // pe, hist_pe3, hist_pe5, peg, eps3, eps5, mcap
    #[rustfmt::skip]
    let rows: [(&str, [f64; 16]); 13] = [
        ("CDSL",       [26.8, 28.5, 27.2, 0.15, 24.8,  0.0, 0.8, -17.6, -12.5, 32.5, 30.2, 28.8, 1.8, 18.2, 16.8, 18000.0]),
        ("CHENNPETRO", [ 8.7,  9.2,  8.8, 0.42, 58.5,  0.0, 1.2, -31.8, -28.4,  8.9, 10.8, 12.4, 3.2,  2.8,  3.4,  3500.0]),
        ("COCHINSHIP", [14.5, 16.8, 15.4, 0.35, 36.2, 12.5, 1.4, -30.5, -45.2, 14.2, 16.4, 18.6, 2.8,  5.1,  4.2,  2000.0]),
        ("ENGINERSIN", [12.2, 13.5, 12.8, 0.25, 65.8,  0.0, 1.1, -29.8, -35.6, 11.8, 13.9, 15.2, 2.4,  4.9,  4.1,  1500.0]),
        ("FACT",       [11.8, 12.3, 11.9, 0.55, 69.2,  0.0, 1.3, -24.5, -18.7,  9.7, 10.5, 11.8, 1.9,  5.1,  4.8, 12000.0]),
        ("GSFC",       [ 6.9,  7.8,  7.2, 1.25, 52.3,  8.2, 1.6, -36.9, -42.3,  6.2,  8.3,  9.1, 4.1,  1.5,  2.1,   800.0]),
        ("KALYANKJIL", [16.2, 15.2, 14.1, 0.48, 61.4, 22.4, 1.5, -36.9, -25.8, 28.4, 24.8, 22.1, 2.3, 12.4,  8.9,  4500.0]),
        ("MOIL",       [ 7.8,  8.9,  8.1, 0.22, 84.2,  0.0, 0.9, -35.8, -38.9, 12.1, 14.2, 15.8, 3.8,  3.2,  2.8,  4000.0]),
        ("NETWEB",     [24.1, 22.4, 21.8, 0.35, 42.5, 18.7, 1.8,  -6.0,  15.2, 45.8, 41.5, 38.2, 1.5, 30.5, 22.8,  3000.0]),
        ("NOVAAGRI",   [ 3.8,  4.2,  4.0, 1.45, 15.6, 45.8, 2.1, -60.0, -65.4, 15.2, 19.8, 22.4, 5.2, -2.1, -1.8,   400.0]),
        ("PROTEAN",    [ 5.9,  6.8,  6.2, 0.38, 28.4, 38.5, 1.7, -67.4, -72.1,  8.5, 12.3, 14.7, 3.9,  2.2,  1.9,   800.0]),
        ("RITES",      [13.8, 14.7, 13.9, 0.28, 72.1,  0.0, 1.2, -40.5, -28.9, 13.6, 16.1, 18.2, 2.6,  5.2,  4.8,  3000.0]),
        ("SCILAL",     [ 8.4,  9.5,  8.8, 0.62, 18.5, 42.1, 1.4, -55.2, -58.7, 10.4, 14.6, 16.8, 3.4,  3.1,  2.9,  1500.0]),
    ];

    rows.iter()
        .map(|(sym, v)| {
            (
                *sym,
                Fundamentals {
                    roe_current: v[0],
                    roe_3y_avg: v[1],
                    roe_5y_avg: v[2],
                    debt_equity: v[3],
                    promoter_holding: v[4],
                    pledged_percentage: v[5],
                    debt_3y_vs_5y: v[6],
                    return_1y: v[7],
                    return_3y: v[8],
                    current_pe: v[9],
                    historical_pe_3y: v[10],
                    historical_pe_5y: v[11],
                    peg_ratio: v[12],
                    eps_growth_3y: v[13],
                    eps_growth_5y: v[14],
                    market_cap: v[15],
                },
            )
        })
        .collect()
});

/// Built-in fundamentals for `symbol`, if it is one of the demo stocks.
pub fn reference(symbol: &str) -> Option<Fundamentals> {
    REFERENCE.get(symbol.trim().to_uppercase().as_str()).copied()
}

static COMPANY_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("CDSL", "Central Depository Services (India) Ltd"),
        ("CHENNPETRO", "Chennai Petroleum Corporation Ltd"),
        ("COCHINSHIP", "Cochin Shipyard Ltd"),
        ("ENGINERSIN", "Engineers India Ltd"),
        ("FACT", "Fertilisers and Chemicals Travancore Ltd"),
        ("GSFC", "Gujarat State Fertilizers & Chemicals Ltd"),
        ("KALYANKJIL", "Kalyan Jewellers India Ltd"),
        ("MOIL", "MOIL Ltd"),
        ("NETWEB", "Netweb Technologies India Ltd"),
        ("NOVAAGRI", "Nova Agritech Ltd"),
        ("PROTEAN", "Protean eGov Technologies Ltd"),
        ("RITES", "RITES Ltd"),
        ("SCILAL", "Shilpa Medicare Ltd"),
    ])
});

pub fn company_name(symbol: &str) -> Option<&'static str> {
    COMPANY_NAMES.get(symbol.trim().to_uppercase().as_str()).copied()
}

pub fn reference_symbols() -> Vec<&'static str> {
    let mut symbols: Vec<&'static str> = REFERENCE.keys().copied().collect();
    symbols.sort_unstable();
    symbols
}

/// A holding joined with its fundamentals and its share of the portfolio.
#[derive(Debug, Clone, Serialize)]
pub struct StockRecord {
    pub holding: Holding,
    /// Percent of total invested capital.
    pub weight: f64,
    pub fundamentals: Fundamentals,
}

impl StockRecord {
    pub fn symbol(&self) -> &str {
        &self.holding.symbol
    }

    pub fn loss_pct(&self) -> f64 {
        self.holding.pnl_pct()
    }
}

/// Join every holding with its fundamentals. Holdings `lookup` has nothing
/// for are skipped with a warning.
pub fn join<F>(portfolio: &Portfolio, lookup: F) -> Vec<StockRecord>
where
    F: Fn(&str) -> Option<Fundamentals>,
{
    portfolio
        .holdings
        .iter()
        .filter_map(|h| match lookup(&h.symbol) {
            Some(fundamentals) => Some(StockRecord {
                holding: h.clone(),
                weight: portfolio.position_weight(h),
                fundamentals,
            }),
            None => {
                tracing::warn!(symbol = %h.symbol, "No fundamentals available, skipping");
                None
            }
        })
        .collect()
}

/// Records for the demo portfolio against the built-in fundamentals.
pub fn demo_records() -> Vec<StockRecord> {
    join(&crate::holdings::demo_portfolio(), reference)
}
