//! LLM API interaction with exponential backoff retry logic.
//!
//! Summaries and tags come from an OpenAI-compatible endpoint reached through
//! `awful_aj`. Each kind of request has its own chat template, so the pipeline
//! holds two askers built from the same configuration.
//!
//! - [`AskAsync`]: core trait for one prompt/response exchange
//! - [`AwfulAsk`]: `awful_aj::api::ask` bound to one chat template
//! - [`RetryAsk`]: decorator adding retries to any [`AskAsync`]

use awful_aj::api::ask;
use awful_aj::{config::AwfulJadeConfig, template, template::ChatTemplate};
use rand::{Rng, rng};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Trait for async LLM interaction.
///
/// Implementors send text to an LLM and return its reply. Decorators such as
/// [`RetryAsk`] wrap another implementor.
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send text to the LLM and receive a response.
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
///
/// The delay between retries follows:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    inner: T,
    /// Retries after the first attempt; zero means a single attempt.
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync,
{
    type Response = T::Response;

    #[instrument(level = "debug", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(text).await {
                Ok(resp) => {
                    return Ok(resp);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis(),
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let shift = (attempt - 1).min(16) as u32;
                    let delay = self
                        .base_delay
                        .saturating_mul(1u32 << shift)
                        .min(self.max_delay);
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// `awful_aj::api::ask` bound to one chat template.
#[derive(Debug)]
pub struct AwfulAsk {
    config: Arc<AwfulJadeConfig>,
    template: ChatTemplate,
    template_name: String,
}

impl AwfulAsk {
    /// Load the named template from the `awful_aj` config directory.
    #[instrument(level = "info", skip(config))]
    pub async fn load(
        config: Arc<AwfulJadeConfig>,
        template_name: &str,
    ) -> Result<Self, Box<dyn Error>> {
        let template = template::load_template(template_name).await?;
        info!(template = template_name, "Loaded chat template");
        Ok(Self {
            config,
            template,
            template_name: template_name.to_string(),
        })
    }
}

impl AskAsync for AwfulAsk {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(template = %self.template_name))]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = ask(&self.config, text.to_string(), &self.template, None, None).await;
        let dt = t0.elapsed();

        match &res {
            Ok(_) => info!(elapsed_ms = dt.as_millis(), "API call succeeded"),
            Err(e) => warn!(elapsed_ms = dt.as_millis(), error = %e, "API call failed"),
        }
        res
    }
}

/// Build a retrying asker for `template_name`.
pub async fn load_asker(
    config: Arc<AwfulJadeConfig>,
    template_name: &str,
    retries: usize,
) -> Result<RetryAsk<AwfulAsk>, Box<dyn Error>> {
    let inner = AwfulAsk::load(config, template_name).await?;
    Ok(RetryAsk::new(inner, retries, StdDuration::from_secs(1)))
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedAsk;
    use super::*;

    #[tokio::test]
    async fn test_retry_recovers_after_failures() {
        let inner = ScriptedAsk::always("done")
            .then(Err("boom"))
            .then(Err("boom again"));
        let api = RetryAsk::new(inner, 3, StdDuration::ZERO);

        assert_eq!(api.ask("hello").await.unwrap(), "done");
        assert_eq!(api.inner.calls(), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let api = RetryAsk::new(ScriptedAsk::failing(), 2, StdDuration::ZERO);
        let err = api.ask("hello").await.unwrap_err();
        assert_eq!(err.to_string(), "upstream unavailable");
        assert_eq!(api.inner.calls(), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_is_single_attempt() {
        let api = RetryAsk::new(ScriptedAsk::failing(), 0, StdDuration::ZERO);
        assert!(api.ask("hello").await.is_err());
        assert_eq!(api.inner.calls(), 1);
    }
}
