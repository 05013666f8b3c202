//! Per-site CSS selector rules.
//!
//! Sites that need their own selectors are listed in [`SITE_PROFILES`] and are
//! matched by host, in order. Everything else uses [`Profile::Default`].
//!
//! | Host | Content selector |
//! |------|------------------|
//! | `techcrunch.com` | `.article-content` |
//! | `theverge.com` | `.c-entry-content` |
//! | anything else | `article, .article-content, .entry-content, .post-content` |

use url::Url;

/// Selectors used to pull stubs from a listing page and text from an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionRules {
    /// One match per article container on the listing page.
    pub listing: &'static str,
    pub title: &'static str,
    pub link: &'static str,
    pub date: &'static str,
    /// Applied to the article page, not the listing.
    pub content: &'static str,
}

/// Named selector set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    TechCrunch,
    TheVerge,
    Default,
}

/// Ordered `(host, profile)` table; first match wins.
pub const SITE_PROFILES: &[(&str, Profile)] = &[
    ("techcrunch.com", Profile::TechCrunch),
    ("theverge.com", Profile::TheVerge),
];

impl Profile {
    /// Pick the profile for a source URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The source's listing URL
    ///
    /// # Returns
    ///
    /// The first entry of [`SITE_PROFILES`] whose domain equals the URL's host
    /// or is a parent of it; [`Profile::Default`] when none does or the URL
    /// does not parse.
    pub fn for_url(url: &str) -> Self {
        let host = match Url::parse(url) {
            Ok(parsed) => parsed.host_str().map(str::to_ascii_lowercase),
            Err(_) => None,
        };
        let Some(host) = host else {
            return Profile::Default;
        };

        SITE_PROFILES
            .iter()
            .find(|(domain, _)| host == *domain || host.ends_with(&format!(".{domain}")))
            .map(|(_, profile)| *profile)
            .unwrap_or(Profile::Default)
    }

    /// Selector set for this profile.
    pub fn rules(self) -> ExtractionRules {
        match self {
            Profile::TechCrunch => ExtractionRules {
                listing: "article",
                title: "h2",
                link: "a",
                date: "time",
                content: ".article-content",
            },
            Profile::TheVerge => ExtractionRules {
                listing: "article",
                title: "h2",
                link: "a",
                date: "time",
                content: ".c-entry-content",
            },
            Profile::Default => ExtractionRules {
                listing: "article",
                title: "h2, h3",
                link: "a",
                date: "time",
                content: "article, .article-content, .entry-content, .post-content",
            },
        }
    }
}

impl ExtractionRules {
    /// Shorthand for `Profile::for_url(url).rules()`.
    pub fn for_url(url: &str) -> Self {
        Profile::for_url(url).rules()
    }
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Profile::Default.rules()
    }
}
