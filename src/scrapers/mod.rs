//! Fetching and parsing of news source pages.
//!
//! Every source goes through the same two-phase pattern:
//!
//! 1. **Listing**: download the source URL and pull up to five article stubs
//!    out of it with the source's [`rules::ExtractionRules`] ([`listing`])
//! 2. **Content**: download each stub's page and keep the text under the
//!    content selector ([`content`])
//!
//! Page downloads go through [`PageFetcher`] so the pipeline can be driven
//! from canned HTML in tests.

pub mod content;
pub mod listing;
pub mod rules;

use std::time::Duration;

use tracing::{debug, instrument};

use crate::error::FetchError;

const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; newsletter_curator/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Something that can turn a URL into an HTML document.
pub trait PageFetcher {
    /// Download `url` and return its body as text.
    ///
    /// Non-success HTTP statuses are errors.
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;
}

/// [`PageFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(transport)?;
        debug!(bytes = body.len(), "Downloaded page");
        Ok(body)
    }
}
