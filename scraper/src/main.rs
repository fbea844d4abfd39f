//! One-shot jobs.ch scrape
//!
//! Runs a single scrape with headless Chromium and saves the jobs to
//! data/jobs.json.

use anyhow::{Context, Result};
use clap::Parser;
use jobsch_common::JobSummary;
use jobsch_scraper::config::{DEFAULT_MAX_PAGES, DEFAULT_TERM};
use jobsch_scraper::{scrape_jobs, BrowserSettings, ChromiumLauncher, ScrapeOptions};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "jobsch-scraper", about = "Scrape jobs.ch search results into data/jobs.json")]
struct Cli {
    /// Search term
    #[arg(default_value = DEFAULT_TERM)]
    term: String,

    /// Maximum number of results pages to visit
    #[arg(default_value_t = DEFAULT_MAX_PAGES, value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: u32,

    /// Chromium executable (looked up on PATH when unset)
    #[arg(long, env = "CHROME_PATH")]
    chrome_path: Option<PathBuf>,
}

impl Cli {
    fn options(&self) -> ScrapeOptions {
        let term = self.term.trim();
        ScrapeOptions {
            term: if term.is_empty() { DEFAULT_TERM } else { term }.to_string(),
            max_pages: self.max_pages,
            ..ScrapeOptions::default()
        }
    }
}

fn save_jobs(data_dir: &Path, jobs: &[JobSummary]) -> Result<PathBuf> {
    // Create data directory if it doesn't exist
    fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;

    let output_path = data_dir.join("jobs.json");
    let json_output = serde_json::to_string_pretty(jobs).context("failed to serialize jobs")?;
    fs::write(&output_path, json_output)
        .with_context(|| format!("failed to write {}", output_path.display()))?;
    Ok(output_path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jobsch=info")),
        )
        .init();

    let settings = BrowserSettings {
        executable: cli.chrome_path.clone(),
        ..BrowserSettings::default()
    };

    let jobs = scrape_jobs(&ChromiumLauncher::new(settings), &cli.options())
        .await
        .context("scrape failed")?;
    let output_path = save_jobs(Path::new("data"), &jobs)?;
    info!(count = jobs.len(), path = %output_path.display(), "saved jobs");
    Ok(())
}
