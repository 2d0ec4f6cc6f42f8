use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::client::Resource;
use crate::domain::{FilterField, ListQuery};

/// Command-line arguments for the `campus` binary.
#[derive(Debug, Parser)]
#[command(
    name = "campus",
    version,
    about = "Cached client for the campus content API"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "CAMPUS_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Fetch one page of a resource collection.
    List(ListArgs),
    /// Fetch a single entity by id or slug.
    Show(ShowArgs),
    /// Poll a collection through the cache and print every change.
    Watch(WatchArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the API base URL, e.g. <https://campus.example/api>.
    #[arg(long = "api-url", value_name = "URL", value_hint = ValueHint::Url, global = true)]
    pub api_url: Option<String>,

    /// Path to a file containing the bearer token (takes precedence over env).
    #[arg(
        long = "token-file",
        env = "CAMPUS_TOKEN_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub token_file: Option<PathBuf>,

    /// Bearer token from env; hidden so it stays out of help and shell history.
    #[arg(
        long = "api-token",
        env = "CAMPUS_API_TOKEN",
        hide = true,
        hide_env_values = true,
        global = true
    )]
    pub api_token: Option<String>,

    /// Override the HTTP request timeout.
    #[arg(long = "api-timeout-seconds", value_name = "SECONDS", global = true)]
    pub api_timeout_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct ListArgs {
    /// Resource collection, e.g. blogs, tags, domaines, offres-formations.
    pub resource: Resource,

    #[command(flatten)]
    pub filters: FilterArgs,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    pub resource: Resource,

    /// Numeric id or slug.
    pub id: String,
}

#[derive(Debug, Args, Clone)]
pub struct WatchArgs {
    pub resource: Resource,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Seconds between revalidations.
    #[arg(long = "interval-secs", default_value_t = 5)]
    pub interval_secs: u64,

    /// Stop after this many revalidations; runs until interrupted when absent.
    #[arg(long)]
    pub iterations: Option<u32>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct FilterArgs {
    #[arg(long)]
    pub search: Option<String>,

    #[arg(long)]
    pub tag: Option<String>,

    #[arg(long)]
    pub status: Option<String>,

    #[arg(long = "author", value_name = "AUTHOR_ID")]
    pub author_id: Option<String>,

    #[arg(long)]
    pub year: Option<String>,

    #[arg(long, default_value_t = 1)]
    pub page: u32,

    #[arg(long = "per-page")]
    pub per_page: Option<u32>,

    /// Extra query parameter, e.g. `--param domain_id=3`. Repeatable.
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,
}

impl FilterArgs {
    /// Builds the list query, falling back to `default_per_page`.
    pub fn to_query(&self, default_per_page: u32) -> Result<ListQuery, String> {
        let mut query = ListQuery::new()
            .page(self.page)
            .per_page(self.per_page.unwrap_or(default_per_page));

        let fields = [
            (FilterField::Search, &self.search),
            (FilterField::Tag, &self.tag),
            (FilterField::Status, &self.status),
            (FilterField::AuthorId, &self.author_id),
            (FilterField::Year, &self.year),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                query = query.filter(field, value.as_str());
            }
        }

        for raw in &self.params {
            let (key, value) = raw
                .split_once('=')
                .filter(|(key, _)| !key.trim().is_empty())
                .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
            query = query.param(key.trim(), value);
        }
        Ok(query)
    }
}
