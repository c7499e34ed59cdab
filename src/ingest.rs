//! CSV loaders for holdings, symbol lists and fundamentals.
//!
//! Brokers export holdings with wildly different headers, so columns are
//! matched by a normalized name against a list of accepted variants.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{CheckupError, Result};
use crate::fundamentals::Fundamentals;
use crate::holdings::{GainType, Holding, MarketCap, Portfolio};

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());
static NUMBER_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,₹$%\s]").unwrap());

/// "Avg. Price " -> "avgprice", "P&L" -> "pl"
fn normalize_header(raw: &str) -> String {
    NON_ALNUM.replace_all(&raw.to_lowercase(), "").into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Field {
    Symbol,
    Quantity,
    AvgPrice,
    CurrentPrice,
    Investment,
    CurrentValue,
    Pnl,
    Sector,
    MarketCap,
    GainType,
}

impl Field {
    const ALL: [Field; 10] = [
        Field::Symbol,
        Field::Quantity,
        Field::AvgPrice,
        Field::CurrentPrice,
        Field::Investment,
        Field::CurrentValue,
        Field::Pnl,
        Field::Sector,
        Field::MarketCap,
        Field::GainType,
    ];

    fn name(self) -> &'static str {
        match self {
            Field::Symbol => "symbol",
            Field::Quantity => "quantity",
            Field::AvgPrice => "avg price",
            Field::CurrentPrice => "current price",
            Field::Investment => "investment",
            Field::CurrentValue => "current value",
            Field::Pnl => "P&L",
            Field::Sector => "sector",
            Field::MarketCap => "market cap",
            Field::GainType => "gain type",
        }
    }

    fn variants(self) -> &'static [&'static str] {
        match self {
            Field::Symbol => &["Symbol", "Stock", "Ticker", "Company", "Stock Symbol"],
            Field::Quantity => &["Quantity", "Qty", "Shares", "Units"],
            Field::AvgPrice => &[
                "Avg Price",
                "Average Price",
                "Buy Price",
                "Purchase Price",
                "Avg Cost",
            ],
            Field::CurrentPrice => &["Current Price", "LTP", "Market Price", "Price"],
            Field::Investment => &["Investment", "Invested Amount", "Cost"],
            Field::CurrentValue => &["Current Value", "Market Value", "Value"],
            Field::Pnl => &["P&L", "PnL", "Profit/Loss", "Gain/Loss"],
            Field::Sector => &["Sector", "Industry"],
            Field::MarketCap => &["Market Cap", "Market Cap Category", "Cap"],
            Field::GainType => &["Gain Type", "Tax Type", "LTCG/STCG"],
        }
    }

    fn missing(self) -> CheckupError {
        CheckupError::MissingColumn {
            column: self.name().to_string(),
            accepted: self.variants().join(", "),
        }
    }
}

/// Column index per field. The first header matching any variant wins.
fn map_columns(headers: &csv::StringRecord) -> HashMap<Field, usize> {
    let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
    let mut columns = HashMap::new();
    for field in Field::ALL {
        let wanted: Vec<String> = field.variants().iter().map(|v| normalize_header(v)).collect();
        if let Some(idx) = normalized.iter().position(|h| wanted.contains(h)) {
            columns.insert(field, idx);
        }
    }
    columns
}

fn parse_number(raw: &str, row: usize, column: &'static str) -> Result<Option<f64>> {
    let cleaned = NUMBER_NOISE.replace_all(raw, "");
    if cleaned.is_empty() || cleaned == "-" {
        return Ok(None);
    }
    cleaned
        .parse::<f64>()
        .map(Some)
        .map_err(|_| CheckupError::InvalidValue {
            row,
            column,
            value: raw.to_string(),
        })
}

/// Accept "csv" files only. Spreadsheets are rejected with a hint to export.
pub fn ensure_csv(file_name: &str) -> Result<()> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => Ok(()),
        other => Err(CheckupError::UnsupportedFile(if other.is_empty() {
            file_name.to_string()
        } else {
            other.to_string()
        })),
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader)
}

/// Parse a holdings table. Rows with a blank symbol are skipped.
///
/// Either quantity and average price, or an investment column, must be
/// present; likewise quantity and current price, or a current value column.
pub fn read_holdings<R: Read>(reader: R) -> Result<Portfolio> {
    let mut rdr = csv_reader(reader);
    let columns = map_columns(rdr.headers()?);

    let has = |f: Field| columns.contains_key(&f);
    if !has(Field::Symbol) {
        return Err(Field::Symbol.missing());
    }
    if !has(Field::Investment) && !(has(Field::Quantity) && has(Field::AvgPrice)) {
        return Err(if has(Field::Quantity) {
            Field::AvgPrice.missing()
        } else {
            Field::Quantity.missing()
        });
    }
    if !has(Field::CurrentValue) && !(has(Field::Quantity) && has(Field::CurrentPrice)) {
        return Err(if has(Field::Quantity) {
            Field::CurrentPrice.missing()
        } else {
            Field::CurrentValue.missing()
        });
    }

    let mut holdings = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // header is line 1
        let row = i + 2;
        let text = |f: Field| columns.get(&f).and_then(|&idx| record.get(idx)).unwrap_or("");
        let number = |f: Field| parse_number(text(f), row, f.name());

        let symbol = text(Field::Symbol);
        if symbol.is_empty() {
            continue;
        }

        let mut holding = Holding::new(
            symbol,
            number(Field::Quantity)?.unwrap_or(0.0),
            number(Field::AvgPrice)?.unwrap_or(0.0),
            number(Field::CurrentPrice)?.unwrap_or(0.0),
        );
        holding.investment = number(Field::Investment)?;
        holding.market_value = number(Field::CurrentValue)?;
        holding.reported_pnl = number(Field::Pnl)?;

        let sector = text(Field::Sector);
        if !sector.is_empty() {
            holding.sector = Some(sector.to_string());
        }
        holding.market_cap = MarketCap::parse(text(Field::MarketCap));
        holding.gain_type = GainType::parse(text(Field::GainType));

        holdings.push(holding);
    }

    if holdings.is_empty() {
        return Err(CheckupError::EmptyPortfolio);
    }
    tracing::debug!(count = holdings.len(), "Parsed holdings");
    Ok(Portfolio::new(holdings))
}

pub fn load_holdings(path: &Path) -> Result<Portfolio> {
    ensure_csv(&path.to_string_lossy())?;
    let portfolio = read_holdings(File::open(path)?)?;
    tracing::info!(path = %path.display(), holdings = portfolio.len(), "Loaded portfolio");
    Ok(portfolio)
}

const SYMBOL_COLUMNS: [&str; 4] = ["symbol", "symbols", "ticker", "stock"];

/// Symbols from the first column named symbol/symbols/ticker/stock (any
/// case), with `suffix` appended where missing.
pub fn read_symbols<R: Read>(reader: R, suffix: &str) -> Result<Vec<String>> {
    let mut rdr = csv_reader(reader);
    let idx = rdr
        .headers()?
        .iter()
        .position(|h| SYMBOL_COLUMNS.contains(&h.to_lowercase().as_str()))
        .ok_or_else(|| CheckupError::MissingColumn {
            column: "symbol".to_string(),
            accepted: "Symbol, symbol, ticker, stock".to_string(),
        })?;

    let mut symbols = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let Some(raw) = record.get(idx).map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };
        let symbol = if suffix.is_empty() || raw.ends_with(suffix) {
            raw.to_string()
        } else {
            format!("{}{}", raw, suffix)
        };
        symbols.push(symbol);
    }
    Ok(symbols)
}

pub fn load_symbols(path: &Path, suffix: &str) -> Result<Vec<String>> {
    let symbols = read_symbols(File::open(path)?, suffix)?;
    tracing::info!(path = %path.display(), count = symbols.len(), "Loaded symbols");
    Ok(symbols)
}

/// One row of a fundamentals table, using the screening export's headers.
#[derive(Debug, Deserialize)]
struct FundamentalsRow {
    #[serde(rename = "Symbol")]
    symbol: String,
    #[serde(rename = "ROE_Current", default)]
    roe_current: f64,
    #[serde(rename = "ROE_3Y_Avg")]
    roe_3y_avg: f64,
    #[serde(rename = "ROE_5Y_Avg", default)]
    roe_5y_avg: f64,
    #[serde(rename = "Debt_Equity")]
    debt_equity: f64,
    #[serde(rename = "Promoter_Holding")]
    promoter_holding: f64,
    #[serde(rename = "Pledged_Percentage", default)]
    pledged_percentage: f64,
    #[serde(rename = "Debt_3Y_vs_5Y_Ratio", default)]
    debt_3y_vs_5y: f64,
    #[serde(rename = "Return_1Y")]
    return_1y: f64,
    #[serde(rename = "Return_3Y")]
    return_3y: f64,
    #[serde(rename = "Current_PE", default)]
    current_pe: f64,
    #[serde(rename = "Historical_PE_3Y", default)]
    historical_pe_3y: f64,
    #[serde(rename = "Historical_PE_5Y", default)]
    historical_pe_5y: f64,
    #[serde(rename = "PEG_Ratio", default)]
    peg_ratio: f64,
    #[serde(rename = "EPS_Growth_3Y", default)]
    eps_growth_3y: f64,
    #[serde(rename = "EPS_Growth_5Y", default)]
    eps_growth_5y: f64,
    #[serde(rename = "Market_Cap", default)]
    market_cap: f64,
}

impl From<FundamentalsRow> for Fundamentals {
    fn from(r: FundamentalsRow) -> Self {
        Fundamentals {
            roe_current: r.roe_current,
            roe_3y_avg: r.roe_3y_avg,
            roe_5y_avg: r.roe_5y_avg,
            debt_equity: r.debt_equity,
            promoter_holding: r.promoter_holding,
            pledged_percentage: r.pledged_percentage,
            debt_3y_vs_5y: r.debt_3y_vs_5y,
            return_1y: r.return_1y,
            return_3y: r.return_3y,
            current_pe: r.current_pe,
            historical_pe_3y: r.historical_pe_3y,
            historical_pe_5y: r.historical_pe_5y,
            peg_ratio: r.peg_ratio,
            eps_growth_3y: r.eps_growth_3y,
            eps_growth_5y: r.eps_growth_5y,
            market_cap: r.market_cap,
        }
    }
}

/// Fundamentals keyed by uppercase symbol. Extra columns are ignored.
pub fn read_fundamentals<R: Read>(reader: R) -> Result<HashMap<String, Fundamentals>> {
    let mut rdr = csv_reader(reader);
    let mut table = HashMap::new();
    for row in rdr.deserialize::<FundamentalsRow>() {
        let row = row?;
        table.insert(row.symbol.trim().to_uppercase(), Fundamentals::from(row));
    }
    Ok(table)
}

pub fn load_fundamentals(path: &Path) -> Result<HashMap<String, Fundamentals>> {
    let table = read_fundamentals(File::open(path)?)?;
    tracing::info!(path = %path.display(), symbols = table.len(), "Loaded fundamentals");
    Ok(table)
}
