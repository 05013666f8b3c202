//! # Newsletter Curator
//!
//! Scrapes a configurable list of news sources, summarizes and tags every new
//! article with an LLM, and appends the results to an Airtable base for
//! editorial review.
//!
//! ## Usage
//!
//! ```sh
//! newsletter_curator run
//! newsletter_curator serve --bind 0.0.0.0:3000 --interval-secs 86400
//! ```
//!
//! ## Architecture
//!
//! Each run follows a sequential pipeline:
//! 1. **Sources**: read `Name`/`URL`/`Category` rows from the sources table
//! 2. **Listing**: pull at most five article stubs from each source's page
//! 3. **Content**: download each article's body text
//! 4. **Curation**: summarize and tag each article through the LLM
//! 5. **Persist**: append the articles whose URL is not stored yet

use awful_aj::{config, config_dir};
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod ai;
mod api;
mod cli;
mod error;
mod models;
mod persist;
mod pipeline;
mod registry;
mod scrapers;
mod server;
mod store;
mod utils;
mod worker;

use api::{AwfulAsk, RetryAsk, load_asker};
use cli::{Cli, Command, Settings};
use pipeline::{Curator, Pipeline, Tables};
use scrapers::HttpFetcher;
use store::airtable::AirtableStore;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

type AppCurator = Curator<AirtableStore, HttpFetcher, RetryAsk<AwfulAsk>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = dotenvy::dotenv();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(command = ?args.command, base = %args.settings.airtable_base_id, "Parsed CLI arguments");

    match args.command {
        Command::Run => {
            let curator = build_curator(&args.settings).await?;
            let report = curator.run().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Serve {
            bind,
            interval_secs,
        } => {
            let settings = args.settings.clone();
            let handle = worker::spawn(move || async move { build_curator(&settings).await }).await?;

            if let Some(secs) = interval_secs {
                info!(every_secs = secs, "Scheduling periodic runs");
                server::spawn_schedule(handle.clone(), Duration::from_secs(secs));
            }
            server::serve(&bind, server::AppState::new(handle, interval_secs)).await?;
        }
    }

    Ok(())
}

/// Wire the production collaborators from `settings`.
async fn build_curator(settings: &Settings) -> Result<AppCurator, Box<dyn Error>> {
    let conf_file = match &settings.config {
        Some(path) => PathBuf::from(path),
        None => config_dir()?.join("config.yaml"),
    };
    let config_path = conf_file.to_str().ok_or("AI config path is not valid UTF-8")?;
    let ai_config = Arc::new(config::load_config(config_path)?);
    info!(config_path, "Loaded AI configuration");

    let summarizer = load_asker(Arc::clone(&ai_config), &settings.summary_template, settings.ai_retries).await?;
    let tagger = load_asker(ai_config, &settings.tags_template, settings.ai_retries).await?;

    let store = AirtableStore::new(
        reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?,
        settings.airtable_url.as_str(),
        settings.airtable_base_id.as_str(),
        settings.airtable_api_key.as_str(),
    );
    let fetcher = HttpFetcher::new(HTTP_TIMEOUT)?;
    let tables = Tables {
        sources: settings.sources_table.clone(),
        articles: settings.articles_table.clone(),
    };

    Ok(Curator::new(store, fetcher, summarizer, tagger, tables))
}
