//! Red-flag checkpoint evaluation.
//!
//! Seven independent threshold checks over a stock's fundamentals. The number
//! of raised flags maps to a risk category and an exit priority; weighting the
//! buckets by portfolio share gives a portfolio-level health score.

use serde::Serialize;

use crate::fundamentals::{Fundamentals, StockRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RedFlag {
    LowRoe,
    HighLeverage,
    LowPromoterHolding,
    HighPledge,
    RisingDebt,
    PoorReturn3y,
    PoorReturn1y,
}

impl RedFlag {
    pub const ALL: [RedFlag; 7] = [
        RedFlag::LowRoe,
        RedFlag::HighLeverage,
        RedFlag::LowPromoterHolding,
        RedFlag::HighPledge,
        RedFlag::RisingDebt,
        RedFlag::PoorReturn3y,
        RedFlag::PoorReturn1y,
    ];

    pub fn criterion(self) -> &'static str {
        match self {
            RedFlag::LowRoe => "Average ROE 3Years < 10%",
            RedFlag::HighLeverage => "Debt to Equity > 1.0",
            RedFlag::LowPromoterHolding => "Promoter Holding < 20%",
            RedFlag::HighPledge => "Pledged Percentage > 30%",
            RedFlag::RisingDebt => "Debt increasing (3Y back > 5Y back by 30%)",
            RedFlag::PoorReturn3y => "Stock Return 3Years < 10%",
            RedFlag::PoorReturn1y => "Stock Return 1Year < 10%",
        }
    }

    pub fn is_raised(self, f: &Fundamentals) -> bool {
        match self {
            RedFlag::LowRoe => f.roe_3y_avg < 10.0,
            RedFlag::HighLeverage => f.debt_equity > 1.0,
            RedFlag::LowPromoterHolding => f.promoter_holding < 20.0,
            RedFlag::HighPledge => f.pledged_percentage > 30.0,
            RedFlag::RisingDebt => f.debt_3y_vs_5y > 1.3,
            RedFlag::PoorReturn3y => f.return_3y < 10.0,
            RedFlag::PoorReturn1y => f.return_1y < 10.0,
        }
    }

    /// One-line explanation quoting the offending value.
    pub fn detail(self, f: &Fundamentals) -> String {
        match self {
            RedFlag::LowRoe => format!("Low ROE: {:.1}%", f.roe_3y_avg),
            RedFlag::HighLeverage => format!("High D/E: {:.2}", f.debt_equity),
            RedFlag::LowPromoterHolding => format!("Low Promoter: {:.1}%", f.promoter_holding),
            RedFlag::HighPledge => format!("High Pledge: {:.1}%", f.pledged_percentage),
            RedFlag::RisingDebt => {
                format!("Rising Debt: {:.0}% increase", (f.debt_3y_vs_5y - 1.0) * 100.0)
            }
            RedFlag::PoorReturn3y => format!("Poor 3Y Return: {:.1}%", f.return_3y),
            RedFlag::PoorReturn1y => format!("Poor 1Y Return: {:.1}%", f.return_1y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RiskCategory {
    Low,
    LowMedium,
    Medium,
    MediumHigh,
    High,
    ExtremelyHigh,
}

impl RiskCategory {
    pub fn from_count(red_flags: usize) -> Self {
        match red_flags {
            0 => RiskCategory::Low,
            1 => RiskCategory::LowMedium,
            2 => RiskCategory::Medium,
            3 => RiskCategory::MediumHigh,
            4 => RiskCategory::High,
            _ => RiskCategory::ExtremelyHigh,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskCategory::Low => "LOW RISK",
            RiskCategory::LowMedium => "LOW-MEDIUM RISK",
            RiskCategory::Medium => "MEDIUM RISK",
            RiskCategory::MediumHigh => "MEDIUM-HIGH RISK",
            RiskCategory::High => "HIGH RISK",
            RiskCategory::ExtremelyHigh => "EXTREMELY HIGH RISK",
        }
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// What to do with a position given its red-flag count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ExitPriority {
    /// 5+ flags, week 1
    Immediate,
    /// exactly 4 flags, weeks 2-3
    HighPriority,
    /// exactly 3 flags, month 2, cut 50-70%
    ReviewAndReduce,
    /// 2 or fewer flags
    ConditionalHold,
}

impl ExitPriority {
    pub const ALL: [ExitPriority; 4] = [
        ExitPriority::Immediate,
        ExitPriority::HighPriority,
        ExitPriority::ReviewAndReduce,
        ExitPriority::ConditionalHold,
    ];

    pub fn from_count(red_flags: usize) -> Self {
        match red_flags {
            0..=2 => ExitPriority::ConditionalHold,
            3 => ExitPriority::ReviewAndReduce,
            4 => ExitPriority::HighPriority,
            _ => ExitPriority::Immediate,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExitPriority::Immediate => "IMMEDIATE EXIT (5+ Red Flags)",
            ExitPriority::HighPriority => "HIGH PRIORITY EXIT (4 Red Flags)",
            ExitPriority::ReviewAndReduce => "REVIEW & REDUCE (3 Red Flags)",
            ExitPriority::ConditionalHold => "CONDITIONAL HOLD (<=2 Red Flags)",
        }
    }

    pub fn timeline(self) -> &'static str {
        match self {
            ExitPriority::Immediate => "WEEK 1",
            ExitPriority::HighPriority => "WEEK 2-3",
            ExitPriority::ReviewAndReduce => "MONTH 2",
            ExitPriority::ConditionalHold => "MONTH 3+",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskFlags {
    pub raised: Vec<RedFlag>,
    pub details: Vec<String>,
}

impl RiskFlags {
    pub fn count(&self) -> usize {
        self.raised.len()
    }

    pub fn category(&self) -> RiskCategory {
        RiskCategory::from_count(self.count())
    }

    pub fn priority(&self) -> ExitPriority {
        ExitPriority::from_count(self.count())
    }

    pub fn has(&self, flag: RedFlag) -> bool {
        self.raised.contains(&flag)
    }
}

/// Run all seven checks in rule order.
pub fn evaluate(f: &Fundamentals) -> RiskFlags {
    let raised: Vec<RedFlag> = RedFlag::ALL
        .into_iter()
        .filter(|flag| flag.is_raised(f))
        .collect();
    let details = raised.iter().map(|flag| flag.detail(f)).collect();
    RiskFlags { raised, details }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckpointRow {
    pub symbol: String,
    pub weight: f64,
    pub loss_pct: f64,
    pub flags: RiskFlags,
}

/// Evaluate every record and order by red flags, then weight, both descending.
pub fn assess(records: &[StockRecord]) -> Vec<CheckpointRow> {
    let mut rows: Vec<CheckpointRow> = records
        .iter()
        .map(|r| CheckpointRow {
            symbol: r.symbol().to_string(),
            weight: r.weight,
            loss_pct: r.loss_pct(),
            flags: evaluate(&r.fundamentals),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.flags
            .count()
            .cmp(&a.flags.count())
            .then(b.weight.total_cmp(&a.weight))
    });
    rows
}

pub fn with_priority(rows: &[CheckpointRow], priority: ExitPriority) -> Vec<&CheckpointRow> {
    rows.iter()
        .filter(|r| r.flags.priority() == priority)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HealthScorecard {
    /// weight in stocks with 4+ flags
    pub high_risk_weight: f64,
    /// weight in stocks with exactly 3 flags
    pub medium_risk_weight: f64,
    /// weight in stocks with 2 or fewer flags
    pub low_risk_weight: f64,
    pub score: f64,
    pub grade: char,
}

pub fn health_scorecard(rows: &[CheckpointRow]) -> HealthScorecard {
    let weight_where = |pred: fn(usize) -> bool| -> f64 {
        rows.iter()
            .filter(|r| pred(r.flags.count()))
            .map(|r| r.weight)
            .sum()
    };

    let high = weight_where(|n| n >= 4);
    let medium = weight_where(|n| n == 3);
    let low = weight_where(|n| n <= 2);
    let total: f64 = rows.iter().map(|r| r.weight).sum();

    let score = if total > 0.0 {
        (low + medium * 0.5) / total * 100.0
    } else {
        0.0
    };

    let grade = if score >= 80.0 {
        'A'
    } else if score >= 60.0 {
        'B'
    } else if score >= 40.0 {
        'C'
    } else if score >= 20.0 {
        'D'
    } else {
        'F'
    };

    HealthScorecard {
        high_risk_weight: high,
        medium_risk_weight: medium,
        low_risk_weight: low,
        score,
        grade,
    }
}
