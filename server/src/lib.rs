//! HTTP front end of the jobs.ch scraper.
//!
//! `GET /scrape` runs one complete scrape per request with its own browser
//! and answers with the collected jobs. `GET /healthz` is a liveness probe.

pub mod config;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use config::{parse_page_count, Config};
use jobsch_common::{ErrorBody, HealthBody, ScrapeMeta, ScrapeResponse};
use jobsch_scraper::config::{DEFAULT_TERM, META_SOURCE, PUBLICATION_DATE_DAYS};
use jobsch_scraper::{scrape_jobs, BrowserLauncher, ScrapeError, ScrapeOptions};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub launcher: Arc<dyn BrowserLauncher>,
}

impl AppState {
    pub fn new(config: Config, launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            config: Arc::new(config),
            launcher,
        }
    }
}

/// Query parameters for `GET /scrape`.
#[derive(Debug, Default, Deserialize)]
pub struct ScrapeParams {
    pub term: Option<String>,
    #[serde(rename = "maxPages")]
    pub max_pages: Option<String>,
}

impl ScrapeParams {
    /// The trimmed term, or the default search when blank.
    pub fn term(&self) -> String {
        self.term
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TERM)
            .to_string()
    }

    pub fn max_pages(&self, default: u32) -> u32 {
        self.max_pages
            .as_deref()
            .and_then(parse_page_count)
            .unwrap_or(default)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Scrape(#[from] ScrapeError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self, "scrape request failed");
        let body = ErrorBody {
            error: "Scrape failed".to_string(),
            message: self.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/scrape", get(scrape))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok".to_string(),
    })
}

/// Handler for GET /scrape?term=<keywords>&maxPages=<n>
async fn scrape(
    State(state): State<AppState>,
    Query(params): Query<ScrapeParams>,
) -> Result<Json<ScrapeResponse>, ApiError> {
    let options = ScrapeOptions {
        term: params.term(),
        max_pages: params.max_pages(state.config.max_pages),
        base_url: state.config.base_url.clone(),
    };

    let data = scrape_jobs(state.launcher.as_ref(), &options).await?;

    Ok(Json(ScrapeResponse {
        meta: ScrapeMeta {
            term: options.term,
            max_pages: options.max_pages,
            publication_date_days: PUBLICATION_DATE_DAYS,
            count: data.len(),
            source: META_SOURCE.to_string(),
        },
        data,
    }))
}
