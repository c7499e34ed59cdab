//! CSV exports of the screening and scan results.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fundamentals::{self, StockRecord};
use crate::matrix::MatrixRow;
use crate::scanner::{OversoldOutcome, TechnicalSnapshot};
use crate::sectors;

/// One line of the full screening export. Field order is the column order.
#[derive(Debug, Serialize)]
struct ScreeningLine<'a> {
    #[serde(rename = "Symbol")]
    symbol: &'a str,
    #[serde(rename = "Company_Name")]
    company_name: &'a str,
    #[serde(rename = "Sector")]
    sector: String,
    #[serde(rename = "Market_Cap")]
    market_cap: f64,
    #[serde(rename = "Portfolio_Weight")]
    portfolio_weight: f64,
    #[serde(rename = "Current_Loss_Pct")]
    current_loss_pct: f64,
    #[serde(rename = "Current_PE")]
    current_pe: f64,
    #[serde(rename = "Historical_PE_5Y")]
    historical_pe_5y: f64,
    #[serde(rename = "Historical_PE_3Y")]
    historical_pe_3y: f64,
    #[serde(rename = "PEG_Ratio")]
    peg_ratio: f64,
    #[serde(rename = "EPS_Growth_3Y")]
    eps_growth_3y: f64,
    #[serde(rename = "EPS_Growth_5Y")]
    eps_growth_5y: f64,
    #[serde(rename = "Return_1Y")]
    return_1y: f64,
    #[serde(rename = "Return_3Y")]
    return_3y: f64,
    #[serde(rename = "ROE_Current")]
    roe_current: f64,
    #[serde(rename = "ROE_3Y_Avg")]
    roe_3y_avg: f64,
    #[serde(rename = "ROE_5Y_Avg")]
    roe_5y_avg: f64,
    #[serde(rename = "Debt_Equity")]
    debt_equity: f64,
    #[serde(rename = "Promoter_Holding")]
    promoter_holding: f64,
    #[serde(rename = "Pledged_Percentage")]
    pledged_percentage: f64,
    #[serde(rename = "Debt_3Y_vs_5Y_Ratio")]
    debt_3y_vs_5y: f64,
    #[serde(rename = "Red_Flag_Count")]
    red_flag_count: usize,
    #[serde(rename = "Green_Flag_Count")]
    green_flag_count: usize,
    #[serde(rename = "Risk_Category")]
    risk_category: &'static str,
    #[serde(rename = "Quality_Grade")]
    quality_grade: &'static str,
    #[serde(rename = "Matrix_Classification")]
    matrix_classification: String,
    #[serde(rename = "Recommended_Action")]
    recommended_action: &'static str,
    #[serde(rename = "Investment_Value")]
    investment_value: f64,
    #[serde(rename = "Current_Value")]
    current_value: f64,
    #[serde(rename = "Loss_Amount")]
    loss_amount: f64,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Write the full per-stock screening. `rows` and `records` are matched by
/// symbol; rows without a record are skipped.
pub fn write_screening<W: Write>(
    writer: W,
    records: &[StockRecord],
    rows: &[MatrixRow],
) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut written = 0;

    for row in rows {
        let Some(record) = records.iter().find(|r| r.symbol() == row.symbol) else {
            continue;
        };
        let f = &record.fundamentals;
        let h = &record.holding;

        wtr.serialize(ScreeningLine {
            symbol: &row.symbol,
            company_name: fundamentals::company_name(&row.symbol).unwrap_or(&row.symbol),
            sector: sectors::sector_of(h),
            market_cap: f.market_cap,
            portfolio_weight: round2(record.weight),
            current_loss_pct: round2(record.loss_pct()),
            current_pe: f.current_pe,
            historical_pe_5y: f.historical_pe_5y,
            historical_pe_3y: f.historical_pe_3y,
            peg_ratio: f.peg_ratio,
            eps_growth_3y: f.eps_growth_3y,
            eps_growth_5y: f.eps_growth_5y,
            return_1y: f.return_1y,
            return_3y: f.return_3y,
            roe_current: f.roe_current,
            roe_3y_avg: f.roe_3y_avg,
            roe_5y_avg: f.roe_5y_avg,
            debt_equity: f.debt_equity,
            promoter_holding: f.promoter_holding,
            pledged_percentage: f.pledged_percentage,
            debt_3y_vs_5y: f.debt_3y_vs_5y,
            red_flag_count: row.red_count(),
            green_flag_count: row.green_count(),
            risk_category: row.risk.category().label(),
            quality_grade: row.quality.grade().label(),
            matrix_classification: row.cell.label(),
            recommended_action: row.action(),
            investment_value: round2(h.investment_value()),
            current_value: round2(h.current_value()),
            loss_amount: round2(h.loss_amount()),
        })?;
        written += 1;
    }

    wtr.flush()?;
    Ok(written)
}

pub fn export_screening(path: &Path, records: &[StockRecord], rows: &[MatrixRow]) -> Result<usize> {
    let file = std::fs::File::create(path)?;
    let written = write_screening(file, records, rows)?;
    tracing::info!(path = %path.display(), rows = written, "Screening exported");
    Ok(written)
}

#[derive(Debug, Serialize)]
struct ScanLine<'a> {
    symbol: &'a str,
    company_name: &'a str,
    current_rsi: f64,
    rsi_trend: f64,
    current_price: f64,
    volume_ratio: f64,
    momentum_score: u8,
    price_change_5d: f64,
    price_change_10d: f64,
    macd_bullish: bool,
    above_sma10: bool,
    above_sma20: bool,
    above_sma50: bool,
    above_sma220: bool,
}

pub fn write_scan<W: Write>(writer: W, matches: &[TechnicalSnapshot]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for s in matches {
        wtr.serialize(ScanLine {
            symbol: &s.symbol,
            company_name: s.company_name.as_deref().unwrap_or(&s.symbol),
            current_rsi: round2(s.rsi.unwrap_or_default()),
            rsi_trend: round2(s.rsi_trend),
            current_price: round2(s.close),
            volume_ratio: round2(s.volume_ratio.unwrap_or_default()),
            momentum_score: s.momentum_score,
            price_change_5d: round2(s.price_change_5d.unwrap_or_default()),
            price_change_10d: round2(s.price_change_10d.unwrap_or_default()),
            macd_bullish: s.macd_bullish(),
            above_sma10: s.above_sma10(),
            above_sma20: s.above_sma20(),
            above_sma50: s.above_sma50(),
            above_sma220: s.above_sma220(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct OversoldLine<'a> {
    symbol: &'a str,
    price: f64,
    rsi: f64,
    rsi_trend: &'static str,
    volume_ratio: f64,
    date: String,
    source_file: &'a str,
    rsi_threshold: f64,
    scan_date: String,
}

pub fn write_oversold<W: Write>(
    writer: W,
    outcome: &OversoldOutcome,
    source: &str,
    threshold: f64,
    scanned_at: DateTime<Local>,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    let scan_date = scanned_at.format("%Y-%m-%d %H:%M:%S").to_string();
    for hit in &outcome.hits {
        wtr.serialize(OversoldLine {
            symbol: &hit.symbol,
            price: round2(hit.price),
            rsi: round2(hit.rsi),
            rsi_trend: hit.trend.arrow(),
            volume_ratio: round2(hit.volume_ratio),
            date: hit.date.format("%Y-%m-%d").to_string(),
            source_file: source,
            rsi_threshold: threshold,
            scan_date: scan_date.clone(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// `<dir>/<prefix>_<YYYYmmdd_HHMM>.csv`
pub fn timestamped_path(dir: &Path, prefix: &str, at: DateTime<Local>) -> PathBuf {
    dir.join(format!("{}_{}.csv", prefix, at.format("%Y%m%d_%H%M")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fundamentals::demo_records;
    use crate::matrix;
    use chrono::TimeZone;

    #[test]
    fn screening_has_fixed_layout() {
        let records = demo_records();
        let rows = matrix::build(&records);
        let mut buf = Vec::new();
        let written = write_screening(&mut buf, &records, &rows).unwrap();
        assert_eq!(written, 13);

        let text = String::from_utf8(buf).unwrap();
        let mut rdr = csv::Reader::from_reader(text.as_bytes());
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.len(), 30);
        assert_eq!(&headers[0], "Symbol");
        assert_eq!(&headers[21], "Red_Flag_Count");
        assert_eq!(&headers[29], "Loss_Amount");

        let gsfc = rdr
            .records()
            .map(|r| r.unwrap())
            .find(|r| &r[0] == "GSFC")
            .unwrap();
        assert_eq!(&gsfc[1], "Gujarat State Fertilizers & Chemicals Ltd");
        assert_eq!(&gsfc[21], "5");
        assert_eq!(&gsfc[23], "EXTREMELY HIGH RISK");
        assert_eq!(&gsfc[26], "IMMEDIATE EXIT");
    }

    #[test]
    fn screening_reimports_as_fundamentals() {
        let records = demo_records();
        let rows = matrix::build(&records);
        let mut buf = Vec::new();
        write_screening(&mut buf, &records, &rows).unwrap();

        let table = crate::ingest::read_fundamentals(buf.as_slice()).unwrap();
        assert_eq!(table.len(), 13);
        assert_eq!(table["CDSL"], records[0].fundamentals);
    }

    #[test]
    fn export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screening.csv");
        let records = demo_records();
        let rows = matrix::build(&records);

        assert_eq!(export_screening(&path, &records, &rows).unwrap(), 13);
        let loaded = crate::ingest::load_fundamentals(&path).unwrap();
        assert!(loaded.contains_key("NOVAAGRI"));
    }

    #[test]
    fn timestamped_names() {
        let at = Local.with_ymd_and_hms(2025, 3, 9, 14, 5, 0).unwrap();
        let path = timestamped_path(Path::new("out"), "rsi_opportunities_all", at);
        assert_eq!(path, PathBuf::from("out/rsi_opportunities_all_20250309_1405.csv"));
    }
}
