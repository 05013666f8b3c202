//! Article body extraction.

use scraper::{Html, Selector};
use tracing::{info, instrument};

use super::PageFetcher;
use crate::error::FetchError;

/// Download `url` and return the text under `content_selector`.
///
/// Download failures propagate. A page where nothing matches (or the selector
/// itself does not parse) yields an empty string.
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn fetch_content<F: PageFetcher>(
    fetcher: &F,
    url: &str,
    content_selector: &str,
) -> Result<String, FetchError> {
    let body = fetcher.fetch_page(url).await?;
    let content = extract_content(&body, content_selector);
    info!(chars = content.chars().count(), "Parsed article content");
    Ok(content)
}

/// Trimmed text of every node matching `content_selector`, in document order.
pub fn extract_content(html: &str, content_selector: &str) -> String {
    let Ok(selector) = Selector::parse(content_selector) else {
        return String::new();
    };
    let document = Html::parse_document(html);

    document
        .select(&selector)
        .map(|node| node.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
