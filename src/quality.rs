//! Green-flag quality screening.

use serde::Serialize;

use crate::fundamentals::{Fundamentals, StockRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GreenFlag {
    PeBelow5yHistory,
    PeBelow3yHistory,
    PegBelowTwo,
    PeVs3yGrowth,
    PeVs5yGrowth,
    LargeMarketCap,
    StrongReturn1y,
    StrongReturn3y,
    HighRoe3y,
    HighRoe5y,
    StrongCurrentRoe,
}

impl GreenFlag {
    pub const ALL: [GreenFlag; 11] = [
        GreenFlag::PeBelow5yHistory,
        GreenFlag::PeBelow3yHistory,
        GreenFlag::PegBelowTwo,
        GreenFlag::PeVs3yGrowth,
        GreenFlag::PeVs5yGrowth,
        GreenFlag::LargeMarketCap,
        GreenFlag::StrongReturn1y,
        GreenFlag::StrongReturn3y,
        GreenFlag::HighRoe3y,
        GreenFlag::HighRoe5y,
        GreenFlag::StrongCurrentRoe,
    ];

    pub fn label(self) -> &'static str {
        match self {
            GreenFlag::PeBelow5yHistory => "PE vs 5Y History",
            GreenFlag::PeBelow3yHistory => "PE vs 3Y History",
            GreenFlag::PegBelowTwo => "PEG < 2.0",
            GreenFlag::PeVs3yGrowth => "PE vs 3Y Growth",
            GreenFlag::PeVs5yGrowth => "PE vs 5Y Growth",
            GreenFlag::LargeMarketCap => "Large Market Cap",
            GreenFlag::StrongReturn1y => "Strong 1Y Returns",
            GreenFlag::StrongReturn3y => "Strong 3Y Returns",
            GreenFlag::HighRoe3y => "High ROE 3Y",
            GreenFlag::HighRoe5y => "High ROE 5Y",
            GreenFlag::StrongCurrentRoe => "Strong Current ROE",
        }
    }

    pub fn passes(self, f: &Fundamentals) -> bool {
        match self {
            GreenFlag::PeBelow5yHistory => f.current_pe < f.historical_pe_5y,
            GreenFlag::PeBelow3yHistory => f.current_pe < f.historical_pe_3y,
            GreenFlag::PegBelowTwo => f.peg_ratio < 2.0,
            GreenFlag::PeVs3yGrowth => {
                f.eps_growth_3y > 0.0 && f.current_pe < 2.0 * f.eps_growth_3y
            }
            GreenFlag::PeVs5yGrowth => {
                f.eps_growth_5y > 0.0 && f.current_pe < 5.0 * f.eps_growth_5y
            }
            GreenFlag::LargeMarketCap => f.market_cap > 300.0,
            GreenFlag::StrongReturn1y => f.return_1y > 10.0,
            GreenFlag::StrongReturn3y => f.return_3y > 10.0,
            GreenFlag::HighRoe3y => f.roe_3y_avg > 20.0,
            GreenFlag::HighRoe5y => f.roe_5y_avg > 20.0,
            GreenFlag::StrongCurrentRoe => f.roe_current > 12.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum QualityGrade {
    BelowAverage,
    Average,
    Good,
    High,
    Exceptional,
}

impl QualityGrade {
    pub fn from_count(green_flags: usize) -> Self {
        match green_flags {
            9.. => QualityGrade::Exceptional,
            7..=8 => QualityGrade::High,
            5..=6 => QualityGrade::Good,
            3..=4 => QualityGrade::Average,
            _ => QualityGrade::BelowAverage,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityGrade::Exceptional => "EXCEPTIONAL QUALITY",
            QualityGrade::High => "HIGH QUALITY",
            QualityGrade::Good => "GOOD QUALITY",
            QualityGrade::Average => "AVERAGE QUALITY",
            QualityGrade::BelowAverage => "BELOW AVERAGE",
        }
    }
}

impl std::fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityFlags {
    pub passed: Vec<GreenFlag>,
}

impl QualityFlags {
    pub fn count(&self) -> usize {
        self.passed.len()
    }

    pub fn grade(&self) -> QualityGrade {
        QualityGrade::from_count(self.count())
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.passed.iter().map(|flag| flag.label()).collect()
    }
}

pub fn screen(f: &Fundamentals) -> QualityFlags {
    QualityFlags {
        passed: GreenFlag::ALL
            .into_iter()
            .filter(|flag| flag.passes(f))
            .collect(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityRow {
    pub symbol: String,
    pub weight: f64,
    pub loss_pct: f64,
    pub fundamentals: Fundamentals,
    pub flags: QualityFlags,
}

/// Screen every record, best first: green flags desc, then weight desc.
pub fn rank(records: &[StockRecord]) -> Vec<QualityRow> {
    let mut rows: Vec<QualityRow> = records
        .iter()
        .map(|r| QualityRow {
            symbol: r.symbol().to_string(),
            weight: r.weight,
            loss_pct: r.loss_pct(),
            fundamentals: r.fundamentals,
            flags: screen(&r.fundamentals),
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

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityProfile {
    pub high_quality_weight: f64,
    pub good_quality_weight: f64,
    /// Percent of total weight in stocks with 5 or more green flags.
    pub score: f64,
    pub grade: &'static str,
}

pub fn quality_profile(rows: &[QualityRow]) -> QualityProfile {
    let high: f64 = rows
        .iter()
        .filter(|r| r.flags.count() >= 7)
        .map(|r| r.weight)
        .sum();
    let good: f64 = rows
        .iter()
        .filter(|r| (5..=6).contains(&r.flags.count()))
        .map(|r| r.weight)
        .sum();
    let total: f64 = rows.iter().map(|r| r.weight).sum();

    let score = if total > 0.0 {
        (high + good) / total * 100.0
    } else {
        0.0
    };

    let grade = match score {
        s if s >= 80.0 => "A+",
        s if s >= 60.0 => "A",
        s if s >= 40.0 => "B",
        s if s >= 20.0 => "C",
        _ => "D",
    };

    QualityProfile {
        high_quality_weight: high,
        good_quality_weight: good,
        score,
        grade,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fundamentals::{demo_records, reference};

    #[test]
    fn grade_boundaries_are_closed_below() {
        let grades: Vec<&str> = (0..=11).map(|n| QualityGrade::from_count(n).label()).collect();
        assert_eq!(grades[2], "BELOW AVERAGE");
        assert_eq!(grades[3], "AVERAGE QUALITY");
        assert_eq!(grades[5], "GOOD QUALITY");
        assert_eq!(grades[6], "GOOD QUALITY");
        assert_eq!(grades[7], "HIGH QUALITY");
        assert_eq!(grades[8], "HIGH QUALITY");
        assert_eq!(grades[9], "EXCEPTIONAL QUALITY");
        assert_eq!(grades[11], "EXCEPTIONAL QUALITY");
    }

    #[test]
    fn growth_flags_need_positive_growth() {
        let f = Fundamentals {
            current_pe: -5.0,
            eps_growth_3y: -1.0,
            eps_growth_5y: -1.0,
            ..Default::default()
        };
        let flags = screen(&f);
        assert!(!flags.passed.contains(&GreenFlag::PeVs3yGrowth));
        assert!(!flags.passed.contains(&GreenFlag::PeVs5yGrowth));
    }

    #[test]
    fn cdsl_is_high_quality() {
        let flags = screen(&reference("CDSL").unwrap());
        assert_eq!(flags.count(), 7);
        assert_eq!(flags.grade(), QualityGrade::High);
        assert_eq!(
            flags.labels(),
            vec![
                "PEG < 2.0",
                "PE vs 3Y Growth",
                "PE vs 5Y Growth",
                "Large Market Cap",
                "High ROE 3Y",
                "High ROE 5Y",
                "Strong Current ROE",
            ]
        );
    }

    #[test]
    fn demo_ranking() {
        let rows = rank(&demo_records());
        let count = |sym: &str| rows.iter().find(|r| r.symbol == sym).unwrap().flags.count();
        assert_eq!(count("NETWEB"), 8);
        assert_eq!(count("FACT"), 6);
        assert_eq!(count("GSFC"), 4);
        assert_eq!(count("NOVAAGRI"), 3);
        assert_eq!(rows[0].symbol, "NETWEB");
    }

    #[test]
    fn profile_scores_weight_share() {
        let rows = rank(&demo_records());
        let profile = quality_profile(&rows);
        assert!(profile.score >= 0.0 && profile.score <= 100.0);
        assert!(profile.high_quality_weight > 0.0);
        assert_eq!(quality_profile(&[]).grade, "D");
    }

    #[test]
    fn screening_is_deterministic() {
        let a = rank(&demo_records());
        let b = rank(&demo_records());
        let syms = |rows: &[QualityRow]| rows.iter().map(|r| r.symbol.clone()).collect::<Vec<_>>();
        assert_eq!(syms(&a), syms(&b));
    }
}
