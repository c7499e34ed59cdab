//! Console reports.
//!
//! Every report writes to any `io::Write` so the CLI can print to stdout and
//! tests can capture into a buffer.

use std::io::{self, Write};

use crate::checkpoint::{self, CheckpointRow, ExitPriority, HealthScorecard};
use crate::holdings::{GainType, LossBucket, Portfolio};
use crate::matrix::{self, Bucket, MatrixCell, MatrixRow, MatrixScorecard, QualityTier, RiskTier};
use crate::quality::{QualityProfile, QualityRow};
use crate::scanner::{OversoldOutcome, Recommendation, TechnicalSnapshot};
use crate::sectors::{self, Exposure};

const WIDE: usize = 80;

fn banner<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    writeln!(out, "{}", "=".repeat(WIDE))?;
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", "=".repeat(WIDE))
}

fn rule<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", "-".repeat(WIDE))
}

/// Whole rupees with thousands separators, e.g. "₹1,234,567".
pub fn money(amount: f64) -> String {
    let rounded = amount.abs().round() as u64;
    let digits = rounded.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0.0 && rounded > 0 {
        format!("-₹{}", grouped)
    } else {
        format!("₹{}", grouped)
    }
}

pub fn write_portfolio<W: Write>(out: &mut W, portfolio: &Portfolio) -> io::Result<()> {
    banner(out, "PORTFOLIO OVERVIEW")?;
    writeln!(out, "Holdings:        {}", portfolio.len())?;
    writeln!(out, "Total invested:  {}", money(portfolio.total_invested()))?;
    writeln!(out, "Current value:   {}", money(portfolio.total_current_value()))?;
    writeln!(
        out,
        "Net P&L:         {} ({:.2}%)",
        money(portfolio.total_pnl()),
        portfolio.total_pnl_pct()
    )?;
    writeln!(
        out,
        "LTCG / STCG:     {} / {}",
        portfolio.count_gain_type(GainType::Ltcg),
        portfolio.count_gain_type(GainType::Stcg)
    )?;
    writeln!(out)?;

    writeln!(out, "LOSS DISTRIBUTION")?;
    rule(out)?;
    for bucket in LossBucket::ALL {
        let holdings = portfolio.in_bucket(bucket);
        if holdings.is_empty() {
            continue;
        }
        let symbols: Vec<&str> = holdings.iter().map(|h| h.symbol.as_str()).collect();
        writeln!(out, "{:<26} {:>2}  {}", bucket.label(), holdings.len(), symbols.join(", "))?;
    }
    writeln!(out)?;

    writeln!(out, "WORST PERFORMERS")?;
    writeln!(
        out,
        "{:<12} {:>10} {:>14} {:>14} {:>10}",
        "Symbol", "P&L %", "Invested", "Loss", "Recovery"
    )?;
    rule(out)?;
    for h in portfolio.worst_performers(5) {
        let recovery = h
            .recovery_needed_pct()
            .map(|r| format!("{:.1}%", r))
            .unwrap_or_else(|| "n/a".to_string());
        writeln!(
            out,
            "{:<12} {:>9.2}% {:>14} {:>14} {:>10}",
            h.symbol,
            h.pnl_pct(),
            money(h.investment_value()),
            money(h.loss_amount()),
            recovery
        )?;
    }
    writeln!(out)?;

    let concentrated = portfolio.concentrated(sectors::CONCENTRATION_LIMIT);
    if !concentrated.is_empty() {
        writeln!(out, "[WARN] Positions above {:.0}% of capital:", sectors::CONCENTRATION_LIMIT)?;
        for (h, weight) in concentrated {
            writeln!(out, "  {:<12} {:.1}%", h.symbol, weight)?;
        }
        writeln!(out)?;
    }

    let exit = portfolio.exit_worst(3);
    writeln!(out, "SCENARIO: exit the 3 worst positions ({})", exit.exited.join(", "))?;
    writeln!(out, "  Loss booked:        {}", money(exit.loss_booked))?;
    writeln!(out, "  Remaining invested: {}", money(exit.remaining_investment))?;
    writeln!(out, "  Remaining value:    {}", money(exit.remaining_value))?;
    writeln!(out, "  Remaining loss:     {:.2}%", exit.remaining_loss_pct)?;
    Ok(())
}

fn exposure_table<W: Write>(out: &mut W, label: &str, rows: &[Exposure]) -> io::Result<()> {
    writeln!(
        out,
        "{:<26} {:>6} {:>8} {:>9} {:>14}",
        label, "Stocks", "Weight", "Loss %", "Loss"
    )?;
    rule(out)?;
    for e in rows {
        writeln!(
            out,
            "{:<26} {:>6} {:>7.2}% {:>8.2}% {:>14}",
            e.name,
            e.stocks,
            e.weight,
            e.loss_pct,
            money(e.loss_amount)
        )?;
    }
    writeln!(out)
}

pub fn write_sectors<W: Write>(out: &mut W, portfolio: &Portfolio) -> io::Result<()> {
    let by_sector = sectors::by_sector(portfolio);
    banner(out, "SECTOR EXPOSURE & PERFORMANCE")?;
    exposure_table(out, "Sector", &by_sector)?;

    writeln!(out, "MARKET CAP EXPOSURE")?;
    exposure_table(out, "Market Cap", &sectors::by_market_cap(portfolio))?;

    let over = sectors::concentrated(&by_sector, sectors::CONCENTRATION_LIMIT);
    if !over.is_empty() {
        writeln!(out, "SECTOR CONCENTRATION")?;
        rule(out)?;
        for sector in over {
            writeln!(
                out,
                "[WARN] {}: {:.1}% (Reduce to <{:.0}%)",
                sector.name,
                sector.weight,
                sectors::CONCENTRATION_LIMIT
            )?;
        }
        writeln!(out)?;
    }

    writeln!(out, "SECTOR-WISE CONCERNS")?;
    rule(out)?;
    for sector in sectors::worst_sectors(&by_sector, 3) {
        writeln!(
            out,
            "[SECTOR] {} - Loss: {:.1}% ({})",
            sector.name,
            sector.loss_pct,
            money(sector.loss_amount)
        )?;
        for symbol in &sector.symbols {
            if let Some(note) = sectors::business_note(symbol) {
                writeln!(out, "   {}: {}", symbol, note.concern)?;
                writeln!(out, "   Recovery potential: {}", note.recovery_potential)?;
            }
        }
    }
    Ok(())
}

pub fn write_checkpoint<W: Write>(
    out: &mut W,
    rows: &[CheckpointRow],
    card: &HealthScorecard,
) -> io::Result<()> {
    banner(out, "FUNDAMENTAL CHECKPOINT ANALYSIS")?;
    writeln!(
        out,
        "{:<12} {:>7} {:>8} {:>6}  {}",
        "Symbol", "Weight", "P&L %", "Flags", "Risk"
    )?;
    rule(out)?;
    for r in rows {
        writeln!(
            out,
            "{:<12} {:>6.2}% {:>7.2}% {:>4}/7  {}",
            r.symbol,
            r.weight,
            r.loss_pct,
            r.flags.count(),
            r.flags.category()
        )?;
    }
    writeln!(out)?;

    for priority in ExitPriority::ALL {
        let group = checkpoint::with_priority(rows, priority);
        if group.is_empty() {
            continue;
        }
        writeln!(out, "{} [{}]", priority.label(), priority.timeline())?;
        for r in group {
            writeln!(out, "  {:<12} {:.2}% of portfolio", r.symbol, r.weight)?;
            for detail in &r.flags.details {
                writeln!(out, "    - {}", detail)?;
            }
        }
        writeln!(out)?;
    }

    writeln!(out, "PORTFOLIO HEALTH SCORECARD")?;
    rule(out)?;
    writeln!(out, "High risk (4+ flags):   {:>6.2}%", card.high_risk_weight)?;
    writeln!(out, "Medium risk (3 flags):  {:>6.2}%", card.medium_risk_weight)?;
    writeln!(out, "Low risk (<=2 flags):   {:>6.2}%", card.low_risk_weight)?;
    writeln!(out, "Health score:           {:>6.1}/100 (Grade {})", card.score, card.grade)
}

pub fn write_quality<W: Write>(out: &mut W, rows: &[QualityRow], profile: &QualityProfile) -> io::Result<()> {
    banner(out, "VALUATION & QUALITY SCREENING")?;
    writeln!(
        out,
        "{:<12} {:>7} {:>7} {:>8} {:>6}  {}",
        "Symbol", "Weight", "PE", "ROE 3Y", "Flags", "Grade"
    )?;
    rule(out)?;
    for r in rows {
        writeln!(
            out,
            "{:<12} {:>6.2}% {:>7.1} {:>7.1}% {:>3}/11  {}",
            r.symbol,
            r.weight,
            r.fundamentals.current_pe,
            r.fundamentals.roe_3y_avg,
            r.flags.count(),
            r.flags.grade()
        )?;
        if !r.flags.passed.is_empty() {
            writeln!(out, "{:>14}{}", "", r.flags.labels().join(", "))?;
        }
    }
    writeln!(out)?;
    writeln!(out, "High quality weight (7+): {:.2}%", profile.high_quality_weight)?;
    writeln!(out, "Good quality weight (5-6): {:.2}%", profile.good_quality_weight)?;
    writeln!(out, "Quality score: {:.1}/100 (Grade {})", profile.score, profile.grade)
}

pub fn write_matrix<W: Write>(out: &mut W, rows: &[MatrixRow], card: &MatrixScorecard) -> io::Result<()> {
    banner(out, "RISK vs QUALITY MATRIX")?;

    let qualities = [QualityTier::High, QualityTier::Medium, QualityTier::Low];
    write!(out, "{:<14}", "")?;
    for q in qualities {
        write!(out, "{:>16}", q.label())?;
    }
    writeln!(out)?;
    for risk in [RiskTier::Low, RiskTier::Medium, RiskTier::High] {
        write!(out, "{:<14}", risk.label())?;
        for q in qualities {
            let n = matrix::in_cell(rows, MatrixCell::new(risk, q)).len();
            write!(out, "{:>16}", n)?;
        }
        writeln!(out)?;
    }
    writeln!(out)?;

    writeln!(
        out,
        "{:<12} {:>7} {:>5} {:>6}  {:<22} {}",
        "Symbol", "Weight", "Red", "Green", "Action", "Target"
    )?;
    rule(out)?;
    for r in rows {
        writeln!(
            out,
            "{:<12} {:>6.2}% {:>5} {:>6}  {:<22} {:.1}%",
            r.symbol,
            r.weight,
            r.red_count(),
            r.green_count(),
            r.action(),
            r.target_weight()
        )?;
    }
    writeln!(out)?;

    writeln!(out, "PORTFOLIO SHAPE")?;
    rule(out)?;
    for bucket in Bucket::ALL {
        let members = matrix::in_bucket(rows, bucket);
        let weight = matrix::bucket_weight(rows, bucket);
        writeln!(out, "{:<62} {:>2} {:>6.2}%", bucket.label(), members.len(), weight)?;
    }
    writeln!(out)?;
    writeln!(out, "Risk score:      {:>5.1}", card.risk_score)?;
    writeln!(out, "Quality score:   {:>5.1}", card.quality_score)?;
    writeln!(out, "Balance score:   {:>5.1}", card.balance_score)?;
    writeln!(out, "Composite:       {:>5.1} (Grade {})", card.composite, card.grade)
}

pub fn write_scan<W: Write>(out: &mut W, title: &str, matches: &[TechnicalSnapshot]) -> io::Result<()> {
    if matches.is_empty() {
        return writeln!(out, "No opportunities found for {}", title);
    }
    banner(out, title)?;
    writeln!(
        out,
        "{:<12} {:<25} {:<6} {:<6} {:<6} {:<6} {:<6} {:<6}",
        "Symbol", "Company", "RSI", "Trend", "Vol", "Score", "5d%", "DMA"
    )?;
    rule(out)?;
    for s in matches {
        let company: String = s
            .company_name
            .as_deref()
            .unwrap_or(&s.symbol)
            .chars()
            .take(25)
            .collect();
        writeln!(
            out,
            "{:<12} {:<25} {:5.1} {:<6} {:5.1} {:5}/8 {:5.1} {:<6}",
            s.symbol,
            company,
            s.rsi.unwrap_or_default(),
            s.trend_arrow(),
            s.volume_ratio.unwrap_or_default(),
            s.momentum_score,
            s.price_change_5d.unwrap_or_default(),
            s.dma_status()
        )?;
    }
    Ok(())
}

pub fn write_recommendations<W: Write>(out: &mut W, recs: &[Recommendation]) -> io::Result<()> {
    banner(out, "TRADING RECOMMENDATIONS")?;
    if recs.is_empty() {
        return writeln!(out, "No high-quality opportunities found with current criteria");
    }
    writeln!(out, "HIGH QUALITY OPPORTUNITIES (Score >=5, Volume >1.2x):")?;
    rule(out)?;
    for (i, r) in recs.iter().enumerate() {
        writeln!(out, "{}. {} - {}", i + 1, r.symbol, r.action)?;
        writeln!(out, "   RSI: {:.1} (Target: 70)", r.rsi)?;
        writeln!(out, "   Volume: {:.1}x average", r.volume_ratio)?;
        writeln!(out, "   5-day return: {:.1}%", r.price_change_5d)?;
        writeln!(out, "   Momentum score: {}/8", r.momentum_score)?;
        writeln!(out, "   Above 50/220 DMA: {}/{}", r.above_sma50, r.above_sma220)?;
    }
    Ok(())
}

pub fn write_oversold<W: Write>(
    out: &mut W,
    outcome: &OversoldOutcome,
    threshold: f64,
    source: &str,
) -> io::Result<()> {
    banner(out, "RSI OVERSOLD SCREENING RESULTS")?;
    writeln!(out, "Source: {}", source)?;
    writeln!(out, "RSI threshold: <= {}", threshold)?;
    writeln!(out, "Processed: {} (skipped {})", outcome.processed, outcome.skipped)?;
    writeln!(out)?;

    if outcome.hits.is_empty() {
        return writeln!(out, "No stocks found with RSI <= {}", threshold);
    }

    writeln!(out, "{:<20} {:<12} {:<8} {:<8} {:<8}", "SYMBOL", "PRICE", "RSI", "TREND", "VOLUME")?;
    rule(out)?;
    for hit in &outcome.hits {
        writeln!(
            out,
            "{:<20} ₹{:<11.2} {:<8.1} {:<8} {:<8}",
            hit.symbol,
            hit.price,
            hit.rsi,
            hit.trend.arrow(),
            hit.volume_label()
        )?;
    }
    rule(out)?;
    writeln!(out, "Total oversold stocks: {}", outcome.hits.len())?;
    if let (Some(lowest), Some(avg)) = (outcome.lowest_rsi(), outcome.average_rsi()) {
        writeln!(out, "Lowest RSI: {:.1}", lowest)?;
        writeln!(out, "Average RSI: {:.1}", avg)?;
    }

    let buckets = [
        ("Extremely oversold (<=20)", outcome.extremely_oversold().len()),
        ("Very oversold (20-25)", outcome.very_oversold().len()),
        ("Moderately oversold (25-30)", outcome.moderately_oversold().len()),
    ];
    for (label, n) in buckets {
        if n > 0 {
            writeln!(out, "{}: {}", label, n)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fundamentals::demo_records;
    use crate::holdings::demo_portfolio;

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn money_grouping() {
        assert_eq!(money(0.0), "₹0");
        assert_eq!(money(999.4), "₹999");
        assert_eq!(money(1_234_567.0), "₹1,234,567");
        assert_eq!(money(-10_000.0), "-₹10,000");
    }

    #[test]
    fn portfolio_report_mentions_concentration() {
        let text = render(|out| write_portfolio(out, &demo_portfolio()));
        assert!(text.contains("PORTFOLIO OVERVIEW"));
        assert!(text.contains("Severe Losses (>50%)"));
        // FACT is about 27% of capital
        assert!(text.contains("[WARN] Positions above 15% of capital"));
        assert!(text.contains("FACT"));
    }

    #[test]
    fn sector_report_warns_on_heavy_sectors() {
        let text = render(|out| write_sectors(out, &demo_portfolio()));
        assert!(text.contains("SECTOR CONCENTRATION"));
        assert!(text.contains("[WARN] Chemicals: 29.8% (Reduce to <15%)"));
        assert!(!text.contains("[WARN] Metals & Mining"));
    }

    #[test]
    fn checkpoint_report_groups_priorities() {
        let rows = checkpoint::assess(&demo_records());
        let card = checkpoint::health_scorecard(&rows);
        let text = render(|out| write_checkpoint(out, &rows, &card));
        assert!(text.contains("IMMEDIATE EXIT (5+ Red Flags)"));
        assert!(text.contains("Rising Debt: 60% increase"));
        assert!(text.contains("EXTREMELY HIGH RISK"));
    }

    #[test]
    fn matrix_report_has_grid_and_shape() {
        let rows = matrix::build(&demo_records());
        let card = matrix::scorecard(&rows);
        let text = render(|out| write_matrix(out, &rows, &card));
        assert!(text.contains("STRONG BUY/INCREASE"));
        assert!(text.contains("PORTFOLIO SHAPE"));
        assert!(text.contains("Composite:"));
    }

    #[test]
    fn empty_scan_prints_notice() {
        let text = render(|out| write_scan(out, "NIFTY 50", &[]));
        assert_eq!(text.trim(), "No opportunities found for NIFTY 50");
    }
}
