#![cfg(feature = "web")]

use axum::{
    Json, Router,
    extract::{FromRef, Query, State},
    http::{StatusCode, header},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::cache::{CACHE_TTL, WorkbookCache};
use crate::config::Config;
use crate::downloader;
use crate::error::{Result, ViewerError};
use crate::fetcher::{FETCH_TIMEOUT, HttpFetcher};
use crate::login::{self, LoginGate};
use crate::matcher::{MatchResult, Table};
use crate::query::Intent;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Shared state handed to every handler
///
/// Cloning is cheap: all three parts sit behind `Arc`s, so every request sees
/// the same workbook cache and the same session map.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Arc<WorkbookCache<HttpFetcher>>,
    pub gate: Arc<LoginGate>,
}

impl AppState {
    /// Build the HTTP fetcher, the workbook cache and the login gate for `config`.
    ///
    /// # Returns
    /// * `Result<AppState>` - The state, or a `Config` error when the HTTP
    ///   client or the password hash cannot be built
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(FETCH_TIMEOUT)?;
        let cache = WorkbookCache::new(fetcher, config.workbook_url.clone(), CACHE_TTL);
        let gate = LoginGate::new(&config.password)?;
        Ok(AppState {
            config: Arc::new(config),
            cache: Arc::new(cache),
            gate: Arc::new(gate),
        })
    }
}

impl FromRef<AppState> for Arc<LoginGate> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.gate)
    }
}

/// Body of `POST /api/query`
#[derive(Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// Query string of `GET /api/export`
#[derive(Deserialize)]
pub struct ExportParams {
    /// The query to run, as typed
    pub q: String,
    /// `csv` (default) or `xlsx`
    pub format: Option<String>,
}

/// JSON body returned by `/api/query`.
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryResponse {
    Ok {
        intent: Intent,
        kind: ResultKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        table: Option<Table>,
    },
    NotFound {
        intent: Intent,
        message: String,
    },
    Invalid {
        message: String,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Scalar,
    Table,
}

/// Route, load and match one query; never fetches for an invalid query.
pub async fn answer(state: &AppState, raw: &str) -> Result<(Intent, MatchResult)> {
    state.cache.answer(raw).await
}

impl QueryResponse {
    /// Map a lookup outcome to its HTTP status and JSON body.
    ///
    /// Not-found and invalid queries are ordinary answers (`200`); download
    /// and parse failures are `502`.
    pub fn from_outcome(outcome: Result<(Intent, MatchResult)>) -> (StatusCode, Self) {
        match outcome {
            Ok((intent, MatchResult::Scalar(message))) => (
                StatusCode::OK,
                QueryResponse::Ok {
                    intent,
                    kind: ResultKind::Scalar,
                    message: Some(message),
                    table: None,
                },
            ),
            Ok((intent, MatchResult::Rows(table))) => (
                StatusCode::OK,
                QueryResponse::Ok {
                    intent,
                    kind: ResultKind::Table,
                    message: None,
                    table: Some(table),
                },
            ),
            Err(err) => Self::from_error(err),
        }
    }

    fn from_error(err: ViewerError) -> (StatusCode, Self) {
        let message = err.to_string();
        match err {
            ViewerError::NotFound(intent) => {
                (StatusCode::OK, QueryResponse::NotFound { intent, message })
            }
            ViewerError::InvalidQuery => (StatusCode::OK, QueryResponse::Invalid { message }),
            err if err.is_upstream() => (StatusCode::BAD_GATEWAY, QueryResponse::Error { message }),
            ViewerError::SheetNotFound(_) => (StatusCode::OK, QueryResponse::Error { message }),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                QueryResponse::Error { message },
            ),
        }
    }
}

/// Build the application router around `state`
///
/// `/`, `/api/query` and `/api/export` sit behind [`login::require_auth`];
/// `/login`, `/logout`, `/healthz` and `/static` are always reachable. Static
/// files are served from `state.config.static_dir`.
///
/// # Arguments
/// * `state` - Shared state; its gate decides whether a password is required
///
/// # Returns
/// * `Router` - A router with its state applied, ready for `axum::serve`
pub fn router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();

    let protected = Router::new()
        .route("/", get(serve_viewer))
        .route("/api/query", axum::routing::post(run_query))
        .route("/api/export", get(export_result))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            login::require_auth,
        ));

    Router::new()
        .merge(protected)
        .route(
            "/login",
            get(login::serve_login_page).post(login::handle_login),
        )
        .route("/logout", get(login::handle_logout))
        .route("/healthz", get(|| async { "ok" }))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
}

/// Bind `config.bind_addr` and serve the viewer until the process stops.
pub async fn run(config: Config) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let bind_addr = config.bind_addr;
    let gate_on = config.gate_enabled();
    let state = AppState::new(config)?;
    let app = router(state);

    let listener = TcpListener::bind(bind_addr).await?;
    log::info!(
        "Listening on http://{} (password gate {})",
        bind_addr,
        if gate_on { "on" } else { "off" }
    );
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_viewer() -> Html<&'static str> {
    Html(include_str!("./static/index.html"))
}

async fn run_query(
    State(state): State<AppState>,
    Json(payload): Json<QueryRequest>,
) -> impl IntoResponse {
    let (status, body) = QueryResponse::from_outcome(answer(&state, &payload.query).await);
    (status, Json(body))
}

async fn export_result(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> Response {
    let format = params.format.as_deref().unwrap_or("csv");
    if format != "csv" && format != "xlsx" {
        return (
            StatusCode::BAD_REQUEST,
            format!("Unsupported export format: {}", format),
        )
            .into_response();
    }

    let result = match answer(&state, &params.q).await {
        Ok((_, result)) => result,
        Err(err) => {
            let (status, body) = QueryResponse::from_error(err);
            return (status, Json(body)).into_response();
        }
    };
    let table = downloader::as_table(&result);
    let disposition = format!(
        "attachment; filename=\"{}.{}\"",
        table.sheet.to_lowercase(),
        format
    );

    if format == "csv" {
        return (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            downloader::to_csv(&table),
        )
            .into_response();
    }

    match downloader::to_xlsx(&table) {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            bytes,
        )
            .into_response(),
        Err(err) => {
            let (status, body) = QueryResponse::from_error(err);
            (status, Json(body)).into_response()
        }
    }
}
