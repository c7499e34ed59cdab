//! The 3x3 risk-quality matrix.
//!
//! Red-flag and green-flag counts are reduced to three tiers each. Every cell
//! carries a fixed recommended action and a place in the priority order used
//! to sort positions from most to least attractive.

use serde::Serialize;

use crate::checkpoint::{self, RedFlag, RiskFlags};
use crate::fundamentals::StockRecord;
use crate::quality::{self, GreenFlag, QualityFlags};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn from_red_flags(n: usize) -> Self {
        match n {
            5.. => RiskTier::High,
            3..=4 => RiskTier::Medium,
            _ => RiskTier::Low,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskTier::Low => "Low Risk",
            RiskTier::Medium => "Medium Risk",
            RiskTier::High => "High Risk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum QualityTier {
    High,
    Medium,
    Low,
}

impl QualityTier {
    pub fn from_green_flags(n: usize) -> Self {
        match n {
            7.. => QualityTier::High,
            5..=6 => QualityTier::Medium,
            _ => QualityTier::Low,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityTier::High => "High Quality",
            QualityTier::Medium => "Medium Quality",
            QualityTier::Low => "Low Quality",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MatrixCell {
    pub risk: RiskTier,
    pub quality: QualityTier,
}

/// Cells from most to least attractive.
pub const PRIORITY_ORDER: [MatrixCell; 9] = [
    MatrixCell::new(RiskTier::Low, QualityTier::High),
    MatrixCell::new(RiskTier::Low, QualityTier::Medium),
    MatrixCell::new(RiskTier::Medium, QualityTier::High),
    MatrixCell::new(RiskTier::Medium, QualityTier::Medium),
    MatrixCell::new(RiskTier::Low, QualityTier::Low),
    MatrixCell::new(RiskTier::Medium, QualityTier::Low),
    MatrixCell::new(RiskTier::High, QualityTier::High),
    MatrixCell::new(RiskTier::High, QualityTier::Medium),
    MatrixCell::new(RiskTier::High, QualityTier::Low),
];

impl MatrixCell {
    pub const fn new(risk: RiskTier, quality: QualityTier) -> Self {
        Self { risk, quality }
    }

    pub fn classify(red_flags: usize, green_flags: usize) -> Self {
        Self::new(
            RiskTier::from_red_flags(red_flags),
            QualityTier::from_green_flags(green_flags),
        )
    }

    pub fn action(self) -> &'static str {
        use QualityTier as Q;
        use RiskTier as R;
        match (self.risk, self.quality) {
            (R::Low, Q::High) => "STRONG BUY/INCREASE",
            (R::Low, Q::Medium) => "BUY/HOLD",
            (R::Low, Q::Low) => "HOLD/REVIEW",
            (R::Medium, Q::High) => "CONDITIONAL BUY",
            (R::Medium, Q::Medium) => "HOLD/MONITOR",
            (R::Medium, Q::Low) => "REDUCE/EXIT",
            (R::High, Q::High) => "TURNAROUND PLAY",
            (R::High, Q::Medium) => "HIGH RISK/REDUCE",
            (R::High, Q::Low) => "IMMEDIATE EXIT",
        }
    }

    /// Zero is the most attractive cell.
    pub fn priority(self) -> usize {
        PRIORITY_ORDER
            .iter()
            .position(|c| *c == self)
            .unwrap_or(PRIORITY_ORDER.len())
    }

    /// e.g. "Low Risk + High Quality"
    pub fn label(self) -> String {
        format!("{} + {}", self.risk.label(), self.quality.label())
    }

    pub fn bucket(self) -> Bucket {
        use QualityTier as Q;
        use RiskTier as R;
        match (self.risk, self.quality) {
            (R::Low, Q::High) => Bucket::Ideal,
            (R::Low, Q::Medium) | (R::Medium, Q::High) => Bucket::Good,
            (R::Medium, Q::Medium) => Bucket::Acceptable,
            _ => Bucket::Problematic,
        }
    }
}

/// Where a position sits relative to the target portfolio shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Bucket {
    Ideal,
    Good,
    Acceptable,
    Problematic,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [
        Bucket::Ideal,
        Bucket::Good,
        Bucket::Acceptable,
        Bucket::Problematic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Bucket::Ideal => "Ideal (Low Risk + High Quality)",
            Bucket::Good => "Good (Low Risk + Medium Quality, Medium Risk + High Quality)",
            Bucket::Acceptable => "Acceptable (Medium Risk + Medium Quality)",
            Bucket::Problematic => "Problematic (High Risk or Low Quality)",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatrixRow {
    pub symbol: String,
    pub weight: f64,
    pub loss_pct: f64,
    pub risk: RiskFlags,
    pub quality: QualityFlags,
    pub cell: MatrixCell,
}

impl MatrixRow {
    pub fn red_count(&self) -> usize {
        self.risk.count()
    }

    pub fn green_count(&self) -> usize {
        self.quality.count()
    }

    pub fn action(&self) -> &'static str {
        self.cell.action()
    }

    /// Suggested weight once the rebalance is done: ideal positions are
    /// scaled up (capped at 20%), immediate exits go to zero, everything
    /// else keeps its current weight.
    pub fn target_weight(&self) -> f64 {
        match (self.cell.risk, self.cell.quality) {
            (RiskTier::Low, QualityTier::High) => (self.weight * 1.5).min(20.0),
            (RiskTier::High, QualityTier::Low) => 0.0,
            _ => self.weight,
        }
    }
}

/// Classify every record and sort by cell priority, then weight desc.
pub fn build(records: &[StockRecord]) -> Vec<MatrixRow> {
    let mut rows: Vec<MatrixRow> = records
        .iter()
        .map(|r| {
            let risk = checkpoint::evaluate(&r.fundamentals);
            let quality = quality::screen(&r.fundamentals);
            let cell = MatrixCell::classify(risk.count(), quality.count());
            MatrixRow {
                symbol: r.symbol().to_string(),
                weight: r.weight,
                loss_pct: r.loss_pct(),
                risk,
                quality,
                cell,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        a.cell
            .priority()
            .cmp(&b.cell.priority())
            .then(b.weight.total_cmp(&a.weight))
    });
    rows
}

pub fn in_cell(rows: &[MatrixRow], cell: MatrixCell) -> Vec<&MatrixRow> {
    rows.iter().filter(|r| r.cell == cell).collect()
}

pub fn in_bucket(rows: &[MatrixRow], bucket: Bucket) -> Vec<&MatrixRow> {
    rows.iter().filter(|r| r.cell.bucket() == bucket).collect()
}

pub fn bucket_weight(rows: &[MatrixRow], bucket: Bucket) -> f64 {
    in_bucket(rows, bucket).iter().map(|r| r.weight).sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatrixScorecard {
    pub risk_score: f64,
    pub quality_score: f64,
    pub balance_score: f64,
    pub composite: f64,
    pub grade: char,
}

pub fn scorecard(rows: &[MatrixRow]) -> MatrixScorecard {
    if rows.is_empty() {
        return MatrixScorecard {
            risk_score: 0.0,
            quality_score: 0.0,
            balance_score: 0.0,
            composite: 0.0,
            grade: 'D',
        };
    }

    let n = rows.len() as f64;
    let avg_red = rows.iter().map(|r| r.red_count() as f64).sum::<f64>() / n;
    let avg_green = rows.iter().map(|r| r.green_count() as f64).sum::<f64>() / n;

    let risk_score = 100.0 - avg_red / RedFlag::ALL.len() as f64 * 100.0;
    let quality_score = avg_green / GreenFlag::ALL.len() as f64 * 100.0;

    let total_weight: f64 = rows.iter().map(|r| r.weight).sum();
    let share = |bucket| {
        if total_weight > 0.0 {
            bucket_weight(rows, bucket) / total_weight * 100.0
        } else {
            0.0
        }
    };
    let balance_score = 100.0 - (50.0 - share(Bucket::Ideal) - share(Bucket::Good)).abs();

    let composite = risk_score * 0.4 + quality_score * 0.4 + balance_score * 0.2;
    let grade = match composite {
        c if c >= 80.0 => 'A',
        c if c >= 60.0 => 'B',
        c if c >= 40.0 => 'C',
        _ => 'D',
    };

    MatrixScorecard {
        risk_score,
        quality_score,
        balance_score,
        composite,
        grade,
    }
}
