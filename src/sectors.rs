//! Sector and market-cap exposure.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

use crate::holdings::{Holding, MarketCap, Portfolio};

pub const UNCLASSIFIED: &str = "Others";

/// Positions above this share of invested capital are flagged.
pub const CONCENTRATION_LIMIT: f64 = 15.0;

static SECTOR_MAP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("CDSL", "Financial Services"),
        ("CHENNPETRO", "Oil & Gas"),
        ("COCHINSHIP", "Capital Goods"),
        ("ENGINERSIN", "Capital Goods"),
        ("FACT", "Chemicals"),
        ("GSFC", "Chemicals"),
        ("KALYANKJIL", "Consumer Discretionary"),
        ("MOIL", "Metals & Mining"),
        ("NETWEB", "Technology"),
        ("NOVAAGRI", "Agriculture"),
        ("PROTEAN", "Technology/Services"),
        ("RITES", "Capital Goods"),
        ("SCILAL", "Pharmaceuticals"),
        ("RELIANCE", "Energy & Utilities"),
        ("TCS", "Information Technology"),
        ("INFY", "Information Technology"),
        ("HDFC", "Banking & Financial"),
        ("HDFCBANK", "Banking & Financial"),
        ("ICICIBANK", "Banking & Financial"),
        ("KOTAKBANK", "Banking & Financial"),
        ("BAJFINANCE", "Banking & Financial"),
        ("HINDUNILVR", "Fast Moving Consumer Goods"),
        ("NESTLEIND", "Fast Moving Consumer Goods"),
        ("ASIANPAINT", "Fast Moving Consumer Goods"),
        ("MARUTI", "Automotive"),
        ("TATAMOTORS", "Automotive"),
    ])
});

/// Sector for a holding: its own sector if the source had one, else the
/// built-in map, else "Others".
pub fn sector_of(holding: &Holding) -> String {
    if let Some(sector) = holding.sector.as_deref().filter(|s| !s.is_empty()) {
        return sector.to_string();
    }
    let base = holding.symbol.split('.').next().unwrap_or(&holding.symbol);
    SECTOR_MAP
        .get(base)
        .copied()
        .unwrap_or(UNCLASSIFIED)
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exposure {
    pub name: String,
    pub investment: f64,
    pub current_value: f64,
    pub loss_amount: f64,
    pub stocks: usize,
    pub loss_pct: f64,
    /// Percent of total invested capital.
    pub weight: f64,
    pub symbols: Vec<String>,
}

fn aggregate<F>(portfolio: &Portfolio, key: F) -> Vec<Exposure>
where
    F: Fn(&Holding) -> String,
{
    let total = portfolio.total_invested();
    let mut groups: Vec<Exposure> = Vec::new();

    for h in &portfolio.holdings {
        let name = key(h);
        let idx = match groups.iter().position(|g| g.name == name) {
            Some(idx) => idx,
            None => {
                groups.push(Exposure {
                    name,
                    investment: 0.0,
                    current_value: 0.0,
                    loss_amount: 0.0,
                    stocks: 0,
                    loss_pct: 0.0,
                    weight: 0.0,
                    symbols: Vec::new(),
                });
                groups.len() - 1
            }
        };
        let g = &mut groups[idx];
        g.investment += h.investment_value();
        g.current_value += h.current_value();
        g.loss_amount += h.loss_amount();
        g.stocks += 1;
        g.symbols.push(h.symbol.clone());
    }

    for g in &mut groups {
        g.loss_pct = if g.investment > 0.0 {
            g.loss_amount / g.investment * 100.0
        } else {
            0.0
        };
        g.weight = if total > 0.0 {
            g.investment / total * 100.0
        } else {
            0.0
        };
    }
    groups
}

/// Exposure per sector, largest weight first.
pub fn by_sector(portfolio: &Portfolio) -> Vec<Exposure> {
    let mut groups = aggregate(portfolio, sector_of);
    groups.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    groups
}

/// Exposure per market-cap bucket in Large, Mid, Small, Unknown order.
/// Empty buckets are left out.
pub fn by_market_cap(portfolio: &Portfolio) -> Vec<Exposure> {
    let groups = aggregate(portfolio, |h| h.market_cap.label().to_string());
    [MarketCap::Large, MarketCap::Mid, MarketCap::Small, MarketCap::Unknown]
        .iter()
        .filter_map(|cap| groups.iter().find(|g| g.name == cap.label()).cloned())
        .collect()
}

/// `n` sectors with the deepest percentage loss.
pub fn worst_sectors(exposures: &[Exposure], n: usize) -> Vec<&Exposure> {
    let mut sorted: Vec<&Exposure> = exposures.iter().collect();
    sorted.sort_by(|a, b| b.loss_pct.total_cmp(&a.loss_pct));
    sorted.truncate(n);
    sorted
}

/// Groups whose weight exceeds `limit` percent, heaviest first.
pub fn concentrated(exposures: &[Exposure], limit: f64) -> Vec<&Exposure> {
    let mut over: Vec<&Exposure> = exposures.iter().filter(|e| e.weight > limit).collect();
    over.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    over
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BusinessNote {
    pub business: &'static str,
    pub concern: &'static str,
    pub recovery_potential: &'static str,
}

static BUSINESS_NOTES: Lazy<HashMap<&'static str, BusinessNote>> = Lazy::new(|| {
    let note = |business, concern, recovery_potential| BusinessNote {
        business,
        concern,
        recovery_potential,
    };
    HashMap::from([
        ("CDSL", note("Central depository services", "Regulatory changes, competition from NSDL", "HIGH")),
        ("CHENNPETRO", note("Petroleum refinery under ONGC", "Crude price volatility, margin pressure", "MEDIUM")),
        ("COCHINSHIP", note("Shipyard for defence and commercial vessels", "Execution delays, order book concerns", "MEDIUM")),
        ("ENGINERSIN", note("Engineering consultancy", "Project delays, competition", "MEDIUM")),
        ("FACT", note("Fertilizer manufacturer", "Subsidy delays, raw material costs", "LOW-MEDIUM")),
        ("GSFC", note("State fertilizer company", "Subsidy delays, state PSU issues", "LOW")),
        ("KALYANKJIL", note("Jewellery retailer", "Gold price volatility, competition", "MEDIUM")),
        ("MOIL", note("Manganese ore mining", "Commodity cycle, export restrictions", "LOW")),
        ("NETWEB", note("Data centre and cloud hardware", "High valuation, competition", "HIGH")),
        ("NOVAAGRI", note("Agricultural products trading", "Weather dependency, margin pressure", "VERY LOW")),
        ("PROTEAN", note("eGovernance services", "Execution issues, competitive pressure", "VERY LOW")),
        ("RITES", note("Railway consultancy and export", "Project execution, international exposure", "MEDIUM")),
        ("SCILAL", note("Pharmaceuticals", "US FDA issues, pricing pressure", "LOW")),
    ])
});

pub fn business_note(symbol: &str) -> Option<BusinessNote> {
    BUSINESS_NOTES.get(symbol).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holdings::demo_portfolio;

    #[test]
    fn own_sector_wins_over_map() {
        let h = Holding::new("TCS", 1.0, 1.0, 1.0);
        assert_eq!(sector_of(&h), "Information Technology");
        assert_eq!(sector_of(&h.clone().with_sector("Software")), "Software");
        assert_eq!(sector_of(&Holding::new("TCS.NS", 1.0, 1.0, 1.0)), "Information Technology");
        assert_eq!(sector_of(&Holding::new("ZZZ", 1.0, 1.0, 1.0)), UNCLASSIFIED);
    }

    #[test]
    fn sector_totals_add_up() {
        let portfolio = demo_portfolio();
        let sectors = by_sector(&portfolio);

        let invested: f64 = sectors.iter().map(|s| s.investment).sum();
        assert!((invested - portfolio.total_invested()).abs() < 1e-6);
        let weight: f64 = sectors.iter().map(|s| s.weight).sum();
        assert!((weight - 100.0).abs() < 1e-9);
        let count: usize = sectors.iter().map(|s| s.stocks).sum();
        assert_eq!(count, portfolio.len());

        let capital_goods = sectors.iter().find(|s| s.name == "Capital Goods").unwrap();
        assert_eq!(capital_goods.stocks, 3);
        // Chemicals is the biggest sector
        assert_eq!(sectors[0].name, "Chemicals");
    }

    #[test]
    fn market_cap_order() {
        let caps = by_market_cap(&demo_portfolio());
        let names: Vec<&str> = caps.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Large Cap", "Mid Cap", "Small Cap"]);
    }

    #[test]
    fn worst_sector_is_technology_services() {
        let sectors = by_sector(&demo_portfolio());
        let worst = worst_sectors(&sectors, 3);
        assert_eq!(worst.len(), 3);
        assert_eq!(worst[0].name, "Technology/Services");
        assert!(worst[0].loss_pct >= worst[1].loss_pct);
    }

    #[test]
    fn chemicals_is_the_only_concentrated_sector() {
        let sectors = by_sector(&demo_portfolio());
        let over = concentrated(&sectors, CONCENTRATION_LIMIT);
        assert_eq!(over.len(), 1);
        assert_eq!(over[0].name, "Chemicals");
        assert!((over[0].weight - 29.77).abs() < 0.01);

        // strictly above the limit
        let at_limit = concentrated(&sectors, over[0].weight);
        assert!(at_limit.is_empty());
    }

    #[test]
    fn reported_pnl_drives_sector_loss() {
        let mut h = Holding::new("TCS", 10.0, 100.0, 90.0);
        h.reported_pnl = Some(-250.0);
        let portfolio = Portfolio::new(vec![h]);

        let sectors = by_sector(&portfolio);
        assert_eq!(sectors[0].loss_amount, 250.0);
        assert_eq!(sectors[0].loss_amount, portfolio.holdings[0].loss_amount());
    }

    #[test]
    fn notes_cover_demo() {
        for h in &demo_portfolio().holdings {
            assert!(business_note(&h.symbol).is_some(), "{}", h.symbol);
        }
    }
}
