//! JSON HTTP service.
//!
//! Three routes: a health check, the dashboard for the built-in demo
//! portfolio, and analysis of an uploaded holdings CSV. Uploads are written
//! to the configured upload directory, parsed, and removed again before the
//! response goes out.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::analysis::{self, DashboardPayload};
use crate::config::Config;
use crate::error::{CheckupError, Result};
use crate::fundamentals::{self, Fundamentals};
use crate::holdings::{api_demo_portfolio, Portfolio};
use crate::ingest;

const SERVICE_NAME: &str = "portfolio-checkup";
const UPLOAD_FIELD: &str = "file";

#[derive(Clone)]
pub struct AppState {
    pub upload_dir: PathBuf,
    /// Loaded fundamentals; symbols missing here fall back to the built-in table.
    pub fundamentals: Arc<HashMap<String, Fundamentals>>,
}

impl AppState {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            fundamentals: Arc::new(HashMap::new()),
        }
    }

    pub fn with_fundamentals(mut self, table: HashMap<String, Fundamentals>) -> Self {
        self.fundamentals = Arc::new(table);
        self
    }

    fn lookup(&self, symbol: &str) -> Option<Fundamentals> {
        let key = symbol.trim().to_uppercase();
        self.fundamentals
            .get(&key)
            .copied()
            .or_else(|| fundamentals::reference(&key))
    }
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    data: T,
    message: String,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            message: message.into(),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/demo-data", get(demo_data))
        .route("/api/analyze", post(analyze_upload))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Local::now().to_rfc3339(),
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn demo_data(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DashboardPayload>>> {
    let payload = analysis::analyze(&api_demo_portfolio(), |s| state.lookup(s))?;
    Ok(ApiResponse::ok(payload, "Demo data loaded successfully"))
}

/// Keep only the final path component of a client-supplied name.
fn safe_file_name(raw: &str) -> Option<String> {
    Path::new(raw)
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

/// Write an upload under `dir` as `portfolio_<timestamp>_<random>_<name>`.
/// The file is removed when the returned handle drops.
fn stage_upload(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<NamedTempFile> {
    std::fs::create_dir_all(dir)?;
    let prefix = format!("portfolio_{}_", Local::now().format("%Y%m%d_%H%M%S"));
    let suffix = format!("_{}", file_name);
    let mut file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(&suffix)
        .tempfile_in(dir)?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}

fn parse_upload(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<Portfolio> {
    let staged = stage_upload(dir, file_name, bytes)?;
    let portfolio = ingest::load_holdings(staged.path());
    if let Err(e) = staged.close() {
        tracing::warn!(file = %file_name, error = %e, "Could not remove upload");
    }
    portfolio
}

async fn analyze_upload(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<DashboardPayload>>> {
    let mut multipart =
        multipart.map_err(|e| CheckupError::InvalidRequest(e.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| CheckupError::InvalidRequest(e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .and_then(safe_file_name)
            .ok_or_else(|| CheckupError::InvalidRequest("No file selected".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| CheckupError::InvalidRequest(e.body_text()))?;
        upload = Some((file_name, bytes));
        break;
    }

    let (file_name, bytes) = upload
        .ok_or_else(|| CheckupError::InvalidRequest("No file uploaded".to_string()))?;
    ingest::ensure_csv(&file_name)?;

    tracing::info!(file = %file_name, bytes = bytes.len(), "Upload received");

    let dir = state.upload_dir.clone();
    let portfolio = tokio::task::spawn_blocking(move || parse_upload(&dir, &file_name, &bytes))
        .await
        .map_err(std::io::Error::other)??;

    let payload = analysis::analyze(&portfolio, |s| state.lookup(s))?;
    let message = format!(
        "Successfully analyzed portfolio with {} stocks",
        payload.total_stocks
    );
    Ok(ApiResponse::ok(payload, message))
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: &Config, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = build_router(state);

    tracing::info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_lose_directories() {
        assert_eq!(safe_file_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(safe_file_name("holdings.csv").as_deref(), Some("holdings.csv"));
        assert_eq!(safe_file_name(""), None);
        assert_eq!(safe_file_name("/"), None);
    }

    #[test]
    fn same_name_uploads_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = stage_upload(dir.path(), "mine.csv", b"first").unwrap();
        let b = stage_upload(dir.path(), "mine.csv", b"second").unwrap();

        assert_ne!(a.path(), b.path());
        assert_eq!(std::fs::read(a.path()).unwrap(), b"first");
        assert_eq!(std::fs::read(b.path()).unwrap(), b"second");

        let name = a.path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("portfolio_"));
        assert!(name.ends_with("_mine.csv"));

        drop(a);
        drop(b);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn parsed_uploads_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let portfolio =
            parse_upload(dir.path(), "h.csv", b"Symbol,Qty,Avg Price,LTP\nTCS,1,10,11\n").unwrap();
        assert_eq!(portfolio.len(), 1);

        let err = parse_upload(dir.path(), "h.csv", b"Name\nx\n").unwrap_err();
        assert!(matches!(err, CheckupError::MissingColumn { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn loaded_fundamentals_override_reference() {
        let mut table = HashMap::new();
        let custom = Fundamentals {
            roe_3y_avg: 99.0,
            ..Fundamentals::default()
        };
        table.insert("CDSL".to_string(), custom);
        let state = AppState::new("uploads").with_fundamentals(table);

        assert_eq!(state.lookup("cdsl"), Some(custom));
        assert!(state.lookup("GSFC").is_some());
        assert!(state.lookup("RELIANCE").is_none());
    }
}
