//! Stock portfolio checkup: red-flag risk checks, quality screening, the
//! risk-quality matrix, an RSI momentum scanner, console reports, CSV export
//! and a small JSON service.

pub mod analysis;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod export;
pub mod fundamentals;
pub mod holdings;
pub mod indicators;
pub mod ingest;
pub mod logging;
pub mod market;
pub mod matrix;
pub mod quality;
pub mod report;
pub mod scanner;
pub mod sectors;
pub mod server;

pub use config::Config;
pub use error::{CheckupError, Result};
pub use server::{build_router, AppState};
