//! Data models flowing through the curation pipeline.
//!
//! - [`Source`]: a configured news source with its resolved [`ExtractionRules`]
//! - [`ArticleStub`]: one candidate article discovered on a listing page
//! - [`Article`]: a stub with its full body text
//! - [`CuratedRecord`]: an article after summarization and tagging
//! - [`RunReport`]: the aggregate outcome of one pipeline run

use serde::Serialize;

use crate::scrapers::rules::ExtractionRules;

/// Placeholder stored when the summarizer fails.
pub const SUMMARY_PLACEHOLDER: &str = "Error generating summary.";

/// Placeholder tag stored when the tagger fails.
pub const TAG_PLACEHOLDER: &str = "Error";

/// A news source read from the registry table.
///
/// Identity is `name`. The rules are derived from `url` when the source is
/// loaded and stay fixed for the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub url: String,
    pub category: String,
    pub rules: ExtractionRules,
}

impl Source {
    pub fn new(name: impl Into<String>, url: impl Into<String>, category: impl Into<String>) -> Self {
        let url = url.into();
        let rules = ExtractionRules::for_url(&url);
        Self {
            name: name.into(),
            url,
            category: category.into(),
            rules,
        }
    }
}

/// A candidate article found on a source's listing page.
///
/// `title` and `url` are never empty; `url` is absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleStub {
    pub title: String,
    pub url: String,
    pub source_name: String,
    pub category: String,
    /// Either the machine-readable `datetime` attribute or the visible date
    /// text. Empty when the listing shows no date.
    pub publish_date: String,
}

/// A stub plus the body text pulled from the article page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    #[serde(flatten)]
    pub stub: ArticleStub,
    /// Empty when the article page could not be fetched.
    pub content: String,
}

impl Article {
    pub fn new(stub: ArticleStub, content: String) -> Self {
        Self { stub, content }
    }
}

/// The unit written to the destination table. Dedup key is `article.stub.url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CuratedRecord {
    #[serde(flatten)]
    pub article: Article,
    pub summary: String,
    pub tags: Vec<String>,
}

impl CuratedRecord {
    pub fn url(&self) -> &str {
        &self.article.stub.url
    }
}

/// Outcome of one successful pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Articles that went through summarization and tagging.
    pub processed: usize,
    /// Records the persist gate actually wrote (after dedup).
    pub written: usize,
    /// RFC 3339 completion time.
    pub timestamp: String,
}

impl RunReport {
    pub fn message(&self) -> String {
        format!(
            "Processed {} articles, added {} new records",
            self.processed, self.written
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_resolves_rules_from_url() {
        let source = Source::new("TC", "https://techcrunch.com/latest", "Tech");
        assert_eq!(source.rules.content, ".article-content");

        let other = Source::new("Blog", "https://blog.example.org", "Misc");
        assert_eq!(other.rules, ExtractionRules::default());
    }

    #[test]
    fn test_curated_record_serializes_flat() {
        let record = CuratedRecord {
            article: Article::new(
                ArticleStub {
                    title: "Title".to_string(),
                    url: "https://example.com/a".to_string(),
                    source_name: "Example".to_string(),
                    category: "Tech".to_string(),
                    publish_date: String::new(),
                },
                "Body".to_string(),
            ),
            summary: "Short".to_string(),
            tags: vec!["AI".to_string()],
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["url"], "https://example.com/a");
        assert_eq!(json["content"], "Body");
        assert_eq!(json["tags"][0], "AI");
        assert_eq!(record.url(), "https://example.com/a");
    }

    #[test]
    fn test_run_report_message() {
        let report = RunReport {
            processed: 7,
            written: 3,
            timestamp: "2025-05-06T06:00:00.000Z".to_string(),
        };
        assert_eq!(report.message(), "Processed 7 articles, added 3 new records");
    }
}
