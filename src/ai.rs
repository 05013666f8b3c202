//! Summarization and tagging on top of [`AskAsync`].
//!
//! Both helpers are infallible from the caller's point of view: any error from
//! the model is logged and replaced by a fixed placeholder.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, instrument, warn};

use crate::api::AskAsync;
use crate::models::{SUMMARY_PLACEHOLDER, TAG_PLACEHOLDER};
use crate::utils::{clamp_words, truncate_chars, truncate_for_log};

/// Characters of article content sent to the summarizer.
pub const SUMMARY_INPUT_CHARS: usize = 10_000;
/// Characters of article content sent to the tagger.
pub const TAG_INPUT_CHARS: usize = 5_000;
pub const SUMMARY_MAX_WORDS: usize = 200;
pub const MAX_TAGS: usize = 5;

/// Leading bullets, numbering, hashes and quotes, and closing quotes (with a
/// period after them) around a tag. Periods inside a tag are kept.
static TAG_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:[-*•]+|\d+[.)])?\s*#?["'`]*|["'`]+\.?$"#).expect("static regex")
});

#[instrument(level = "info", skip_all)]
pub async fn summarize_article<A>(asker: &A, content: &str) -> String
where
    A: AskAsync<Response = String>,
{
    let prompt = format!(
        "Summarize the following article in under {SUMMARY_MAX_WORDS} words:\n\n{}",
        truncate_chars(content, SUMMARY_INPUT_CHARS)
    );

    match asker.ask(&prompt).await {
        Ok(text) => clamp_words(text.trim(), SUMMARY_MAX_WORDS),
        Err(e) => {
            error!(error = %e, "Error summarizing article");
            SUMMARY_PLACEHOLDER.to_string()
        }
    }
}

#[instrument(level = "info", skip_all, fields(%title))]
pub async fn generate_tags<A>(asker: &A, title: &str, content: &str, category: &str) -> Vec<String>
where
    A: AskAsync<Response = String>,
{
    let mut prompt = format!("Title: {title}\n");
    if !category.is_empty() {
        prompt.push_str(&format!("Category: {category}\n"));
    }
    prompt.push_str(&format!(
        "\nContent: {}",
        truncate_chars(content, TAG_INPUT_CHARS)
    ));

    match asker.ask(&prompt).await {
        Ok(text) => {
            let tags = parse_tags(&text);
            if tags.is_empty() {
                warn!(response = %truncate_for_log(&text, 200), "Tagger returned no usable tags");
            }
            tags
        }
        Err(e) => {
            error!(error = %e, "Error generating tags");
            vec![TAG_PLACEHOLDER.to_string()]
        }
    }
}

/// Parse a comma (or newline) separated tag list.
///
/// Decoration is stripped, empties and case-insensitive repeats are dropped,
/// and at most [`MAX_TAGS`] survive in their original order.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split([',', '\n'])
        .map(|tag| TAG_NOISE.replace_all(tag.trim(), "").trim().to_string())
        .filter(|tag| !tag.is_empty())
        .unique_by(|tag| tag.to_lowercase())
        .take(MAX_TAGS)
        .collect()
}
