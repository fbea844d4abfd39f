//! jobs.ch scraper server
//!
//! Serves `GET /scrape` and `GET /healthz`, driving headless Chromium for
//! every scrape request.

use jobsch_scraper::ChromiumLauncher;
use jobsch_server::config::Config;
use jobsch_server::{router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "jobsch=info,tower_http=debug";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = Config::from_env();
    let launcher = Arc::new(ChromiumLauncher::new(config.browser.clone()));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(
        max_pages = config.max_pages,
        base_url = %config.base_url,
        "starting jobs.ch scraper"
    );

    let app = router(AppState::new(config, launcher));
    let listener = TcpListener::bind(addr).await?;
    info!("listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
