//! Command-line interface definitions for the newsletter curator.
//!
//! Every connection setting can come from a flag, an environment variable, or
//! a `.env` file in the working directory.

use clap::{Args, Parser, Subcommand};

use crate::store::airtable::DEFAULT_API_URL;

/// Command-line arguments for the newsletter curator.
///
/// # Examples
///
/// ```sh
/// # One run, e.g. from cron
/// newsletter_curator run
///
/// # HTTP trigger plus a daily self-scheduled run
/// newsletter_curator serve --bind 0.0.0.0:3000 --interval-secs 86400
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the pipeline once and print the report as JSON
    Run,
    /// Serve `GET /api/cron` and `GET /api/status`
    Serve {
        /// Address to listen on
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
        bind: String,

        /// Also trigger a run every N seconds
        #[arg(long, env = "CURATOR_INTERVAL_SECS")]
        interval_secs: Option<u64>,
    },
}

/// Store, table and model settings shared by every subcommand.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Airtable personal access token
    #[arg(long, env = "AIRTABLE_API_KEY", hide_env_values = true)]
    pub airtable_api_key: String,

    /// Airtable base holding the sources and articles tables
    #[arg(long, env = "AIRTABLE_BASE_ID")]
    pub airtable_base_id: String,

    /// Airtable API root
    #[arg(long, env = "AIRTABLE_API_URL", default_value = DEFAULT_API_URL)]
    pub airtable_url: String,

    /// Table receiving curated articles
    #[arg(long, env = "ARTICLES_TABLE", default_value = "Articles")]
    pub articles_table: String,

    /// Table listing news sources (Name, URL, Category)
    #[arg(long, env = "SOURCES_TABLE", default_value = "News Sources")]
    pub sources_table: String,

    /// Path to the awful_aj config.yaml (defaults to the awful_aj config dir)
    #[arg(short, long, env = "CURATOR_AI_CONFIG")]
    pub config: Option<String>,

    /// awful_aj template used for summaries
    #[arg(long, default_value = "article_summary")]
    pub summary_template: String,

    /// awful_aj template used for tags
    #[arg(long, default_value = "article_tags")]
    pub tags_template: String,

    /// Retries per model call before falling back to a placeholder
    #[arg(long, default_value_t = 2)]
    pub ai_retries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREDS: [&str; 5] = [
        "newsletter_curator",
        "--airtable-api-key",
        "key123",
        "--airtable-base-id",
        "appBase",
    ];

    #[test]
    fn test_run_defaults() {
        let mut argv = CREDS.to_vec();
        argv.push("run");
        let cli = Cli::parse_from(argv);

        assert_eq!(cli.command, Command::Run);
        assert_eq!(cli.settings.airtable_api_key, "key123");
        assert_eq!(cli.settings.airtable_base_id, "appBase");
        assert_eq!(cli.settings.articles_table, "Articles");
        assert_eq!(cli.settings.sources_table, "News Sources");
        assert_eq!(cli.settings.summary_template, "article_summary");
        assert_eq!(cli.settings.ai_retries, 2);
    }

    #[test]
    fn test_serve_flags() {
        let mut argv = CREDS.to_vec();
        argv.extend(["--sources-table", "Feeds", "serve", "--bind", "127.0.0.1:8080", "--interval-secs", "3600"]);
        let cli = Cli::parse_from(argv);

        assert_eq!(cli.settings.sources_table, "Feeds");
        assert_eq!(
            cli.command,
            Command::Serve {
                bind: "127.0.0.1:8080".to_string(),
                interval_secs: Some(3600),
            }
        );
    }

    #[test]
    fn test_missing_credentials_rejected() {
        // Only meaningful when the environment does not provide them.
        if std::env::var_os("AIRTABLE_API_KEY").is_none() {
            assert!(Cli::try_parse_from(["newsletter_curator", "run"]).is_err());
        }
    }
}
