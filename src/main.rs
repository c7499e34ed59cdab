use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use portfolio_checkup::config::Config;
use portfolio_checkup::fundamentals::{self, Fundamentals, StockRecord};
use portfolio_checkup::holdings::{demo_portfolio, Portfolio};
use portfolio_checkup::market::YahooProvider;
use portfolio_checkup::{
    checkpoint, export, ingest, logging, matrix, quality, report, scanner, server,
};

#[derive(Parser, Debug)]
#[command(name = "portfolio-checkup", version, about = "Stock portfolio risk and quality checkup")]
struct Cli {
    /// JSON config file (defaults to ./portfolio_checkup.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Where holdings and fundamentals come from. Both default to the built-in tables.
#[derive(Args, Debug)]
struct Source {
    /// Holdings CSV
    #[arg(long)]
    input: Option<PathBuf>,

    /// Fundamentals CSV in the screening export layout
    #[arg(long)]
    fundamentals: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Portfolio overview: totals, loss buckets, worst performers
    Portfolio {
        #[command(flatten)]
        source: Source,
    },

    /// Sector and market-cap exposure
    Sectors {
        #[command(flatten)]
        source: Source,
    },

    /// Red-flag risk checkpoint
    Checkpoint {
        #[command(flatten)]
        source: Source,
    },

    /// Green-flag quality screen
    Quality {
        #[command(flatten)]
        source: Source,
    },

    /// Risk-quality matrix with actions
    Matrix {
        #[command(flatten)]
        source: Source,
    },

    /// Write the full screening as CSV
    Export {
        #[command(flatten)]
        source: Source,

        /// Output file
        #[arg(long, default_value = "stock_analysis.csv")]
        output: PathBuf,
    },

    /// RSI momentum scan over one or more symbol lists
    Scan {
        /// Symbol list CSV; repeat for several lists
        #[arg(long, required = true)]
        input: Vec<PathBuf>,

        /// Stop each list after this many matches
        #[arg(long)]
        max_results: Option<usize>,

        /// Directory for the result CSVs
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Wilder RSI oversold screen over a symbol list
    Oversold {
        /// Symbol list CSV
        #[arg(long)]
        input: PathBuf,

        /// Report symbols with RSI at or below this
        #[arg(long)]
        threshold: Option<f64>,

        /// Directory for the result CSV
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Run the JSON HTTP service
    Serve {
        /// Fundamentals CSV used ahead of the built-in table
        #[arg(long)]
        fundamentals: Option<PathBuf>,

        #[arg(long)]
        port: Option<u16>,
    },
}

fn load_portfolio(source: &Source) -> Result<Portfolio> {
    match &source.input {
        Some(path) => ingest::load_holdings(path)
            .with_context(|| format!("loading holdings from {}", path.display())),
        None => Ok(demo_portfolio()),
    }
}

fn load_table(path: Option<&Path>) -> Result<HashMap<String, Fundamentals>> {
    match path {
        Some(p) => ingest::load_fundamentals(p)
            .with_context(|| format!("loading fundamentals from {}", p.display())),
        None => Ok(HashMap::new()),
    }
}

fn load_records(source: &Source) -> Result<Vec<StockRecord>> {
    let portfolio = load_portfolio(source)?;
    let table = load_table(source.fundamentals.as_deref())?;
    let records = fundamentals::join(&portfolio, |symbol| {
        table
            .get(symbol)
            .copied()
            .or_else(|| fundamentals::reference(symbol))
    });
    if records.is_empty() {
        anyhow::bail!("none of the {} holdings have fundamentals", portfolio.len());
    }
    Ok(records)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("symbols")
        .to_string()
}

async fn run_scan(
    config: &Config,
    inputs: &[PathBuf],
    max_results: Option<usize>,
    output_dir: &Path,
) -> Result<()> {
    let provider = YahooProvider::new(config.market.clone())?;
    let mut scan_config = config.scan.clone();
    if let Some(max) = max_results {
        scan_config.max_results = max;
    }

    let mut out = io::stdout();
    let mut lists = Vec::new();
    for input in inputs {
        let symbols = ingest::load_symbols(input, "")?;
        let name = file_stem(input);
        println!("[SCAN] {} symbols from {}", symbols.len(), input.display());

        let outcome = scanner::scan(&provider, &symbols, &scan_config).await;
        report::write_scan(&mut out, &name.to_uppercase(), &outcome.matches)?;

        if !outcome.matches.is_empty() {
            std::fs::create_dir_all(output_dir)?;
            let path = export::timestamped_path(
                output_dir,
                &format!("rsi_opportunities_{}", name),
                chrono::Local::now(),
            );
            export::write_scan(std::fs::File::create(&path)?, &outcome.matches)?;
            println!("[SAVED] {}", path.display());
        }
        lists.push(outcome.matches);
    }

    let combined = scanner::combine(lists);
    report::write_recommendations(&mut out, &scanner::recommendations(&combined))?;
    out.flush()?;
    Ok(())
}

async fn run_oversold(
    config: &Config,
    input: &Path,
    threshold: Option<f64>,
    output_dir: &Path,
) -> Result<()> {
    let provider = YahooProvider::new(config.market.clone())?;
    let threshold = threshold.unwrap_or(config.scan.oversold_threshold);
    let symbols = ingest::load_symbols(input, "")?;
    let source = input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    println!("[SCAN] {} symbols, RSI <= {}", symbols.len(), threshold);

    let outcome = scanner::screen_oversold(&provider, &symbols, threshold).await;
    let mut out = io::stdout();
    report::write_oversold(&mut out, &outcome, threshold, &source)?;

    if !outcome.hits.is_empty() {
        std::fs::create_dir_all(output_dir)?;
        let now = chrono::Local::now();
        let path = export::timestamped_path(
            output_dir,
            &format!("rsi_oversold_{}", file_stem(input)),
            now,
        );
        export::write_oversold(std::fs::File::create(&path)?, &outcome, &source, threshold, now)?;
        writeln!(out, "[SAVED] {}", path.display())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    logging::init_logging(&config.logging.level, &config.logging.format);

    let mut out = io::stdout();
    match cli.command {
        Command::Portfolio { source } => {
            report::write_portfolio(&mut out, &load_portfolio(&source)?)?;
        }
        Command::Sectors { source } => {
            report::write_sectors(&mut out, &load_portfolio(&source)?)?;
        }
        Command::Checkpoint { source } => {
            let rows = checkpoint::assess(&load_records(&source)?);
            let card = checkpoint::health_scorecard(&rows);
            report::write_checkpoint(&mut out, &rows, &card)?;
        }
        Command::Quality { source } => {
            let rows = quality::rank(&load_records(&source)?);
            let profile = quality::quality_profile(&rows);
            report::write_quality(&mut out, &rows, &profile)?;
        }
        Command::Matrix { source } => {
            let rows = matrix::build(&load_records(&source)?);
            let card = matrix::scorecard(&rows);
            report::write_matrix(&mut out, &rows, &card)?;
        }
        Command::Export { source, output } => {
            let records = load_records(&source)?;
            let rows = matrix::build(&records);
            let written = export::export_screening(&output, &records, &rows)?;
            writeln!(out, "[SAVED] {} stocks to {}", written, output.display())?;
        }
        Command::Scan {
            input,
            max_results,
            output_dir,
        } => {
            run_scan(&config, &input, max_results, &output_dir).await?;
        }
        Command::Oversold {
            input,
            threshold,
            output_dir,
        } => {
            run_oversold(&config, &input, threshold, &output_dir).await?;
        }
        Command::Serve { fundamentals, port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            let state = server::AppState::new(config.server.upload_dir.clone())
                .with_fundamentals(load_table(fundamentals.as_deref())?);
            server::serve(&config, state).await?;
        }
    }
    Ok(())
}
