//! Listing page extraction.
//!
//! Turns a source's listing HTML into at most [`MAX_STUBS_PER_SOURCE`]
//! [`ArticleStub`]s, in document order.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::ExtractError;
use crate::models::{ArticleStub, Source};

/// Hard ceiling on stubs taken from one listing page.
pub const MAX_STUBS_PER_SOURCE: usize = 5;

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        selector: css.to_string(),
        message: e.to_string(),
    })
}

/// Compiled listing selectors for one source.
struct ListingSelectors {
    listing: Selector,
    title: Selector,
    link: Selector,
    date: Selector,
}

impl ListingSelectors {
    fn compile(source: &Source) -> Result<Self, ExtractError> {
        Ok(Self {
            listing: selector(source.rules.listing)?,
            title: selector(source.rules.title)?,
            link: selector(source.rules.link)?,
            date: selector(source.rules.date)?,
        })
    }
}

/// Extract article stubs from `listing_html`.
///
/// Containers that lack a title or a usable link are skipped. Errors only when
/// the source's own URL or selectors are unusable, in which case nothing on
/// the page can be extracted.
#[instrument(level = "info", skip_all, fields(source = %source.name))]
pub fn extract_stubs(source: &Source, listing_html: &str) -> Result<Vec<ArticleStub>, ExtractError> {
    let base = Url::parse(&source.url).map_err(|e| ExtractError::SourceUrl {
        url: source.url.clone(),
        source: e,
    })?;
    let selectors = ListingSelectors::compile(source)?;
    let document = Html::parse_document(listing_html);

    let stubs: Vec<ArticleStub> = document
        .select(&selectors.listing)
        .enumerate()
        .filter_map(|(index, container)| {
            let stub = stub_from_container(source, &base, &selectors, container);
            if stub.is_none() {
                debug!(index, "Skipping container without title or link");
            }
            stub
        })
        .take(MAX_STUBS_PER_SOURCE)
        .collect();

    if stubs.is_empty() {
        let containers = document.select(&selectors.listing).count();
        warn!(containers, selector = source.rules.listing, "No article stubs found on listing page");
    } else {
        info!(count = stubs.len(), "Extracted article stubs");
    }
    Ok(stubs)
}

fn stub_from_container(
    source: &Source,
    base: &Url,
    selectors: &ListingSelectors,
    container: ElementRef<'_>,
) -> Option<ArticleStub> {
    let title_node = container.select(&selectors.title).next()?;
    let title = collapse_whitespace(&title_node.text().collect::<String>());
    if title.is_empty() {
        return None;
    }

    let link_node = title_node
        .select(&selectors.link)
        .next()
        .or_else(|| container.select(&selectors.link).next())?;
    let url = resolve_link(base, link_node.value().attr("href")?)?;

    let publish_date = container
        .select(&selectors.date)
        .next()
        .map(|node| match node.value().attr("datetime") {
            Some(datetime) if !datetime.trim().is_empty() => datetime.trim().to_string(),
            _ => node.text().collect::<String>().trim().to_string(),
        })
        .unwrap_or_default();

    Some(ArticleStub {
        title,
        url,
        source_name: source.name.clone(),
        category: source.category.clone(),
        publish_date,
    })
}

/// Resolve `href` against the listing URL. Only http(s) targets are kept.
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let resolved = base.join(href).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Source {
        Source::new("Example News", "https://news.example.com", "Technology")
    }

    #[test]
    fn test_resolves_relative_link_against_source() {
        let html = r#"
            <article><h2><a href="/foo/bar">Relative story</a></h2></article>
        "#;
        let stubs = extract_stubs(&source(), html).unwrap();
        assert_eq!(stubs.len(), 1);
        assert_eq!(stubs[0].url, "https://news.example.com/foo/bar");
        assert_eq!(stubs[0].title, "Relative story");
        assert_eq!(stubs[0].source_name, "Example News");
        assert_eq!(stubs[0].category, "Technology");
    }

    #[test]
    fn test_absolute_link_kept() {
        let html = r#"<article><h3><a href="https://other.example.org/x">Elsewhere</a></h3></article>"#;
        let stubs = extract_stubs(&source(), html).unwrap();
        assert_eq!(stubs[0].url, "https://other.example.org/x");
    }

    #[test]
    fn test_caps_at_five_stubs_in_document_order() {
        let html: String = (1..=8)
            .map(|i| format!(r#"<article><h2><a href="/a/{i}">Story {i}</a></h2></article>"#))
            .collect();
        let stubs = extract_stubs(&source(), &html).unwrap();
        assert_eq!(stubs.len(), MAX_STUBS_PER_SOURCE);
        let titles: Vec<_> = stubs.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Story 1", "Story 2", "Story 3", "Story 4", "Story 5"]);
    }

    #[test]
    fn test_skips_containers_missing_title_or_link() {
        let html = r#"
            <article><p>No heading</p><a href="/no-title">x</a></article>
            <article><h2>   </h2><a href="/blank-title">x</a></article>
            <article><h2>No link at all</h2></article>
            <article><h2><a>Link without href</a></h2></article>
            <article><h2><a href="mailto:desk@example.com">Mail us</a></h2></article>
            <article><h2><a href="/ok">Good one</a></h2></article>
        "#;
        let stubs = extract_stubs(&source(), html).unwrap();
        assert_eq!(stubs.len(), 1);
        assert_eq!(stubs[0].title, "Good one");
        assert!(stubs.iter().all(|s| !s.title.is_empty() && !s.url.is_empty()));
    }

    #[test]
    fn test_skipped_containers_do_not_count_toward_cap() {
        let mut html = String::from("<article><h2>broken</h2></article>".repeat(3));
        for i in 1..=5 {
            html.push_str(&format!(r#"<article><h2><a href="/s/{i}">S{i}</a></h2></article>"#));
        }
        let stubs = extract_stubs(&source(), &html).unwrap();
        assert_eq!(stubs.len(), 5);
    }

    #[test]
    fn test_link_prefers_title_then_container() {
        let html = r#"
            <article>
                <a href="/section">Section</a>
                <h2><a href="/in-title">Headline</a></h2>
            </article>
            <article>
                <h2>Bare headline</h2>
                <a href="/fallback">Read more</a>
                <a href="/second">Other</a>
            </article>
        "#;
        let stubs = extract_stubs(&source(), html).unwrap();
        assert_eq!(stubs[0].url, "https://news.example.com/in-title");
        assert_eq!(stubs[1].url, "https://news.example.com/fallback");
    }

    #[test]
    fn test_date_prefers_datetime_attribute() {
        let html = r#"
            <article>
                <h2><a href="/1">One</a></h2>
                <time datetime="2025-05-06T10:00:00Z">May 6</time>
            </article>
            <article>
                <h2><a href="/2">Two</a></h2>
                <time> Yesterday </time>
            </article>
            <article><h2><a href="/3">Three</a></h2></article>
        "#;
        let stubs = extract_stubs(&source(), html).unwrap();
        assert_eq!(stubs[0].publish_date, "2025-05-06T10:00:00Z");
        assert_eq!(stubs[1].publish_date, "Yesterday");
        assert_eq!(stubs[2].publish_date, "");
    }

    #[test]
    fn test_title_whitespace_collapsed() {
        let html = "<article><h2><a href=\"/t\">\n  Multi\n   line  title </a></h2></article>";
        let stubs = extract_stubs(&source(), html).unwrap();
        assert_eq!(stubs[0].title, "Multi line title");
    }

    #[test]
    fn test_invalid_source_url_is_an_error() {
        let bad = Source::new("Bad", "not a url", "Misc");
        assert!(matches!(
            extract_stubs(&bad, "<article></article>"),
            Err(ExtractError::SourceUrl { .. })
        ));
    }

    #[test]
    fn test_resolve_link() {
        let base = Url::parse("https://news.example.com/world/").unwrap();
        assert_eq!(
            resolve_link(&base, "story").as_deref(),
            Some("https://news.example.com/world/story")
        );
        assert_eq!(resolve_link(&base, "#top"), None);
        assert_eq!(resolve_link(&base, "javascript:void(0)"), None);
        assert_eq!(resolve_link(&base, ""), None);
    }
}
