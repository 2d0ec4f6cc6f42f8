//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{
    CliArgs, Command, FilterArgs, GlobalOverrides, ListArgs, ShowArgs, WatchArgs,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "campus";
const ENV_PREFIX: &str = "CAMPUS";
const DEFAULT_API_TIMEOUT_SECS: u64 = 15;
pub(crate) const DEFAULT_DEDUPING_INTERVAL_MS: u64 = 2_000;
pub(crate) const DEFAULT_IDLE_TTL_SECS: u64 = 300;
pub(crate) const DEFAULT_MAX_ENTRIES: usize = 256;
pub(crate) const DEFAULT_JANITOR_INTERVAL_SECS: u64 = 60;
const DEFAULT_PER_PAGE: u32 = 10;
const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 400;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub list: ListSettings,
}

#[derive(Clone)]
pub struct ApiSettings {
    /// Required by every network command, optional otherwise.
    pub base_url: Option<Url>,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl ApiSettings {
    pub fn require_base_url(&self) -> Result<&Url, LoadError> {
        self.base_url.as_ref().ok_or_else(|| {
            LoadError::invalid(
                "api.base_url",
                "not set; use --api-url, CAMPUS__API__BASE_URL or campus.toml",
            )
        })
    }
}

impl std::fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSettings")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub deduping_interval_ms: u64,
    pub idle_ttl_seconds: u64,
    pub max_entries: usize,
    pub janitor_interval_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct ListSettings {
    pub per_page: u32,
    pub search_debounce_ms: u64,
}

impl ListSettings {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("failed to read token file `{path}`: {source}")]
    TokenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_global_overrides(&cli.overrides)?;

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    api: RawApiSettings,
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    list: RawListSettings,
}

impl RawSettings {
    fn apply_global_overrides(&mut self, overrides: &GlobalOverrides) -> Result<(), LoadError> {
        if let Some(url) = overrides.api_url.as_ref() {
            self.api.base_url = Some(url.clone());
        }
        if let Some(token) = overrides.api_token.as_ref() {
            self.api.token = Some(token.clone());
        }
        // A token file beats every other token source.
        if let Some(path) = overrides.token_file.as_ref() {
            self.api.token = Some(read_token_file(path)?);
        }
        if let Some(seconds) = overrides.api_timeout_seconds {
            self.api.timeout_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        Ok(())
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            api,
            logging,
            cache,
            list,
        } = raw;

        let api = build_api_settings(api)?;
        let logging = build_logging_settings(logging)?;
        let cache = build_cache_settings(cache)?;
        let list = build_list_settings(list)?;

        Ok(Self {
            api,
            logging,
            cache,
            list,
        })
    }
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let base_url = match non_blank(api.base_url) {
        Some(raw) => {
            let url = Url::parse(&raw)
                .map_err(|err| LoadError::invalid("api.base_url", format!("{raw}: {err}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(LoadError::invalid(
                    "api.base_url",
                    format!("unsupported scheme `{}`", url.scheme()),
                ));
            }
            Some(url)
        }
        None => None,
    };

    let timeout_secs = api.timeout_seconds.unwrap_or(DEFAULT_API_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "api.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ApiSettings {
        base_url,
        token: non_blank(api.token),
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let idle_ttl_seconds = cache.idle_ttl_seconds.unwrap_or(DEFAULT_IDLE_TTL_SECS);
    if idle_ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.idle_ttl_seconds",
            "must be greater than zero",
        ));
    }

    let max_entries = cache.max_entries.unwrap_or(DEFAULT_MAX_ENTRIES as u64);
    let max_entries = usize::try_from(max_entries)
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| LoadError::invalid("cache.max_entries", "must be greater than zero"))?;

    let janitor_interval_seconds = cache
        .janitor_interval_seconds
        .unwrap_or(DEFAULT_JANITOR_INTERVAL_SECS);
    if janitor_interval_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.janitor_interval_seconds",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        deduping_interval_ms: cache
            .deduping_interval_ms
            .unwrap_or(DEFAULT_DEDUPING_INTERVAL_MS),
        idle_ttl_seconds,
        max_entries,
        janitor_interval_seconds,
    })
}

fn build_list_settings(list: RawListSettings) -> Result<ListSettings, LoadError> {
    let per_page = list.per_page.unwrap_or(u64::from(DEFAULT_PER_PAGE));
    let per_page: u32 = per_page
        .try_into()
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| {
            LoadError::invalid("list.per_page", "must be between 1 and u32::MAX")
        })?;

    Ok(ListSettings {
        per_page,
        search_debounce_ms: list
            .search_debounce_ms
            .unwrap_or(DEFAULT_SEARCH_DEBOUNCE_MS),
    })
}

fn read_token_file(path: &Path) -> Result<String, LoadError> {
    let contents = fs::read_to_string(path).map_err(|source| LoadError::TokenFile {
        path: path.to_path_buf(),
        source,
    })?;
    non_blank(Some(contents)).ok_or_else(|| LoadError::invalid("api.token", "token file is empty"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    base_url: Option<String>,
    token: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    deduping_interval_ms: Option<u64>,
    idle_ttl_seconds: Option<u64>,
    max_entries: Option<u64>,
    janitor_interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawListSettings {
    per_page: Option<u64>,
    search_debounce_ms: Option<u64>,
}
