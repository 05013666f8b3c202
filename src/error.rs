//! Error types for each pipeline stage.
//!
//! Item-scoped failures ([`FetchError`], [`ExtractError`]) are normally caught
//! by the orchestrator and logged. [`StoreError`] and anything else that
//! reaches [`CurateError`] fails the whole run.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("invalid selector `{selector}`: {message}")]
    Selector { selector: String, message: String },

    #[error("invalid source URL `{url}`: {source}")]
    SourceUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Why one source produced no articles.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected store response: {0}")]
    Decode(String),

    #[error("batch of {0} records exceeds the per-request limit")]
    BatchTooLarge(usize),
}

#[derive(Error, Debug)]
pub enum CurateError {
    #[error("source registry unavailable: {0}")]
    Registry(#[source] StoreError),

    #[error("persisting records failed: {0}")]
    Persist(#[source] StoreError),

    #[error("pipeline initialization failed: {0}")]
    Init(String),

    #[error("pipeline worker is not running")]
    WorkerGone,
}
