//! Pipeline orchestration.
//!
//! One run walks these stages strictly in order:
//! 1. **Sources**: read the registry table
//! 2. **Gathering**: per source, fetch the listing, extract stubs, fetch each
//!    stub's content (pausing after every content fetch)
//! 3. **Curation**: per article, summarize then tag (pausing after each article)
//! 4. **Persist**: hand everything to the dedup/persist gate in one call
//!
//! Failures of one source, one article page or one model call are logged and
//! absorbed. Only registry and persistence failures fail the run.

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::ai::{generate_tags, summarize_article};
use crate::api::AskAsync;
use crate::error::{CurateError, SourceError};
use crate::models::{Article, CuratedRecord, RunReport, Source};
use crate::persist::persist;
use crate::registry::fetch_sources;
use crate::scrapers::PageFetcher;
use crate::scrapers::content::fetch_content;
use crate::scrapers::listing::extract_stubs;
use crate::store::RecordStore;
use crate::utils::now_rfc3339;

/// Flat pauses between remote calls to stay under upstream rate limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub after_content_fetch: Duration,
    pub after_ai: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            after_content_fetch: Duration::from_secs(1),
            after_ai: Duration::from_millis(500),
        }
    }
}

/// Table names in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
    pub sources: String,
    pub articles: String,
}

/// Anything that can perform one full curation run.
pub trait Pipeline {
    async fn run(&self) -> Result<RunReport, CurateError>;
}

/// The production pipeline, generic over its collaborators.
#[derive(Debug)]
pub struct Curator<S, F, A> {
    store: S,
    fetcher: F,
    summarizer: A,
    tagger: A,
    tables: Tables,
    pacing: Pacing,
}

impl<S, F, A> Curator<S, F, A>
where
    S: RecordStore,
    F: PageFetcher,
    A: AskAsync<Response = String>,
{
    /// Create a curator with the default [`Pacing`].
    ///
    /// # Arguments
    ///
    /// * `store` - Holds both the sources and the articles table
    /// * `fetcher` - Fetches listing and article pages
    /// * `summarizer` - Asker bound to the summary template
    /// * `tagger` - Asker bound to the tags template
    /// * `tables` - Table names inside `store`
    pub fn new(store: S, fetcher: F, summarizer: A, tagger: A, tables: Tables) -> Self {
        Self {
            store,
            fetcher,
            summarizer,
            tagger,
            tables,
            pacing: Pacing::default(),
        }
    }

    /// Replace the pauses taken between remote calls.
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Articles from every source, in registry order.
    async fn gather(&self, sources: &[Source]) -> Vec<Article> {
        let mut articles = Vec::new();
        for source in sources {
            info!(source = %source.name, category = %source.category, "Fetching articles from source");
            match self.articles_from_source(source).await {
                Ok(found) => articles.extend(found),
                Err(e) => error!(source = %source.name, error = %e, "Skipping source"),
            }
        }
        articles
    }

    #[instrument(level = "info", skip_all, fields(source = %source.name))]
    async fn articles_from_source(&self, source: &Source) -> Result<Vec<Article>, SourceError> {
        let listing = self.fetcher.fetch_page(&source.url).await?;
        let stubs = extract_stubs(source, &listing)?;

        let mut articles = Vec::with_capacity(stubs.len());
        for stub in stubs {
            let content = match fetch_content(&self.fetcher, &stub.url, source.rules.content).await {
                Ok(content) => content,
                Err(e) => {
                    warn!(url = %stub.url, error = %e, "Error fetching article content; continuing without it");
                    String::new()
                }
            };
            articles.push(Article::new(stub, content));
            sleep(self.pacing.after_content_fetch).await;
        }
        Ok(articles)
    }

    /// Summarize and tag each article, one at a time.
    async fn curate(&self, articles: Vec<Article>) -> Vec<CuratedRecord> {
        let total = articles.len();
        let mut records = Vec::with_capacity(total);

        for (index, article) in articles.into_iter().enumerate() {
            let stub = &article.stub;
            let summary = summarize_article(&self.summarizer, &article.content).await;
            let tags = generate_tags(&self.tagger, &stub.title, &article.content, &stub.category).await;
            info!(index, total, url = %stub.url, tags = tags.len(), "Processed article");

            records.push(CuratedRecord {
                article,
                summary,
                tags,
            });
            sleep(self.pacing.after_ai).await;
        }
        records
    }
}

impl<S, F, A> Pipeline for Curator<S, F, A>
where
    S: RecordStore,
    F: PageFetcher,
    A: AskAsync<Response = String>,
{
    #[instrument(level = "info", skip_all)]
    async fn run(&self) -> Result<RunReport, CurateError> {
        let t0 = Instant::now();
        info!("Starting newsletter curation run");

        let sources = fetch_sources(&self.store, &self.tables.sources)
            .await
            .map_err(CurateError::Registry)?;
        if sources.is_empty() {
            error!(table = %self.tables.sources, "No sources found; check the sources table");
            return Ok(RunReport {
                processed: 0,
                written: 0,
                timestamp: now_rfc3339(),
            });
        }

        let articles = self.gather(&sources).await;
        info!(count = articles.len(), sources = sources.len(), "Fetched articles from sources");

        let records = self.curate(articles).await;
        let written = persist(&self.store, &self.tables.articles, &records)
            .await
            .map_err(CurateError::Persist)?;

        let report = RunReport {
            processed: records.len(),
            written,
            timestamp: now_rfc3339(),
        };
        info!(
            processed = report.processed,
            written = report.written,
            elapsed_ms = t0.elapsed().as_millis(),
            "Curation run complete"
        );
        Ok(report)
    }
}
