//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "bacheca";
const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/";
const DEFAULT_API_TIMEOUT_SECS: u64 = 10;
const DEFAULT_API_PAGE_SIZE: u32 = 2;
const DEFAULT_QUERY_KEEP_PREVIOUS_DATA: bool = true;
const DEFAULT_QUERY_ENTRY_SLOTS: u64 = 128;
const DEFAULT_QUERY_RETRY_MAX_ATTEMPTS: u32 = 0;
const DEFAULT_QUERY_RETRY_BASE_DELAY_MS: u64 = 200;

/// Command-line arguments for the bacheca binary.
#[derive(Debug, Parser)]
#[command(name = "bacheca", version, about = "Post board browser")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "BACHECA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Browse the board interactively.
    Browse(BrowseArgs),
    /// Print posts and exit.
    List(ListArgs),
    /// Print one post and exit.
    Show(ShowArgs),
    /// Create a post and exit.
    Create(CreateArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct BrowseArgs {
    #[command(flatten)]
    pub overrides: ClientOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub overrides: ClientOverrides,

    /// Fetch a single page instead of the whole board.
    #[arg(long, value_name = "PAGE")]
    pub page: Option<u32>,

    /// Print the raw records as JSON.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    #[command(flatten)]
    pub overrides: ClientOverrides,

    /// Numeric id of the post to show.
    #[arg(value_name = "ID")]
    pub id: i64,

    /// Print the raw record as JSON.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct CreateArgs {
    #[command(flatten)]
    pub overrides: ClientOverrides,

    /// Title of the new post.
    #[arg(value_name = "TITLE")]
    pub title: String,

    /// Body of the new post.
    #[arg(value_name = "BODY", default_value = "")]
    pub body: String,

    /// Print the created record as JSON.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ClientOverrides {
    /// Override the API base URL.
    #[arg(long = "api-base-url", value_name = "URL")]
    pub api_base_url: Option<String>,

    /// Override the page size for paginated requests.
    #[arg(long = "api-page-size", value_name = "COUNT")]
    pub api_page_size: Option<u32>,

    /// Override the request timeout.
    #[arg(long = "api-timeout-seconds", value_name = "SECONDS")]
    pub api_timeout_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Toggle previous-data retention while a page flip loads.
    #[arg(
        long = "query-keep-previous-data",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub query_keep_previous_data: Option<bool>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub query: QuerySettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Base URL with a trailing slash so endpoint joins keep the path.
    pub base_url: Url,
    pub timeout: Duration,
    pub page_size: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct QuerySettings {
    pub keep_previous_data: bool,
    pub entry_slots: usize,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
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

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
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

    builder = builder.add_source(Environment::with_prefix("BACHECA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Browse(args)) => raw.apply_client_overrides(&args.overrides),
        Some(Command::List(args)) => raw.apply_client_overrides(&args.overrides),
        Some(Command::Show(args)) => raw.apply_client_overrides(&args.overrides),
        Some(Command::Create(args)) => raw.apply_client_overrides(&args.overrides),
        None => raw.apply_client_overrides(&ClientOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    api: RawApiSettings,
    query: RawQuerySettings,
    logging: RawLoggingSettings,
}

impl RawSettings {
    fn apply_client_overrides(&mut self, overrides: &ClientOverrides) {
        if let Some(url) = overrides.api_base_url.as_ref() {
            self.api.base_url = Some(url.clone());
        }
        if let Some(size) = overrides.api_page_size {
            self.api.page_size = Some(size);
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
        if let Some(keep) = overrides.query_keep_previous_data {
            self.query.keep_previous_data = Some(keep);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            api,
            query,
            logging,
        } = raw;

        let api = build_api_settings(api)?;
        let query = build_query_settings(query)?;
        let logging = build_logging_settings(logging)?;

        Ok(Self {
            api,
            query,
            logging,
        })
    }
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let raw_url = api
        .base_url
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
    let mut base_url: Url = raw_url
        .trim()
        .parse()
        .map_err(|err| LoadError::invalid("api.base_url", format!("failed to parse: {err}")))?;
    if base_url.cannot_be_a_base() {
        return Err(LoadError::invalid(
            "api.base_url",
            "URL must have a host and path",
        ));
    }
    if !base_url.path().ends_with('/') {
        let path = format!("{}/", base_url.path());
        base_url.set_path(&path);
    }

    let timeout_secs = api.timeout_seconds.unwrap_or(DEFAULT_API_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "api.timeout_seconds",
            "must be greater than zero",
        ));
    }
    let timeout = Duration::from_secs(timeout_secs);

    let page_size_value = api.page_size.unwrap_or(DEFAULT_API_PAGE_SIZE);
    let page_size = non_zero_u32(page_size_value.into(), "api.page_size")?;

    Ok(ApiSettings {
        base_url,
        timeout,
        page_size,
    })
}

fn build_query_settings(query: RawQuerySettings) -> Result<QuerySettings, LoadError> {
    let keep_previous_data = query
        .keep_previous_data
        .unwrap_or(DEFAULT_QUERY_KEEP_PREVIOUS_DATA);

    let entry_slots_value = query.entry_slots.unwrap_or(DEFAULT_QUERY_ENTRY_SLOTS);
    let entry_slots = usize::try_from(entry_slots_value).map_err(|_| {
        LoadError::invalid("query.entry_slots", "value exceeds supported range for usize")
    })?;

    Ok(QuerySettings {
        keep_previous_data,
        entry_slots,
        retry_max_attempts: query
            .retry_max_attempts
            .unwrap_or(DEFAULT_QUERY_RETRY_MAX_ATTEMPTS),
        retry_base_delay_ms: query
            .retry_base_delay_ms
            .unwrap_or(DEFAULT_QUERY_RETRY_BASE_DELAY_MS),
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

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    base_url: Option<String>,
    timeout_seconds: Option<u64>,
    page_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawQuerySettings {
    keep_previous_data: Option<bool>,
    entry_slots: Option<u64>,
    retry_max_attempts: Option<u32>,
    retry_base_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = RawSettings::default();
        raw.api.page_size = Some(5);
        raw.logging.level = Some("info".to_string());

        let overrides = ClientOverrides {
            api_page_size: Some(7),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        raw.apply_client_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.api.page_size.get(), 7);
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    }

    #[test]
    fn base_url_gains_a_trailing_slash() {
        let mut raw = RawSettings::default();
        raw.api.base_url = Some("http://localhost:4000/api".to_string());

        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(settings.api.base_url.as_str(), "http://localhost:4000/api/");
    }

    #[test]
    fn rejects_zero_page_size() {
        let mut raw = RawSettings::default();
        raw.api.page_size = Some(0);

        let error = Settings::from_raw(raw).expect_err("zero page size");
        assert!(matches!(
            error,
            LoadError::Invalid {
                key: "api.page_size",
                ..
            }
        ));
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let mut raw = RawSettings::default();
        raw.api.base_url = Some("not a url".to_string());

        let error = Settings::from_raw(raw).expect_err("bad url");
        assert!(matches!(
            error,
            LoadError::Invalid {
                key: "api.base_url",
                ..
            }
        ));
    }

    #[test]
    fn query_settings_flow_through() {
        let mut raw = RawSettings::default();
        raw.query.entry_slots = Some(9);
        raw.query.retry_max_attempts = Some(3);
        raw.query.keep_previous_data = Some(false);

        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(settings.query.entry_slots, 9);
        assert_eq!(settings.query.retry_max_attempts, 3);
        assert!(!settings.query.keep_previous_data);
        assert_eq!(
            settings.query.retry_base_delay_ms,
            DEFAULT_QUERY_RETRY_BASE_DELAY_MS
        );
    }

    #[test]
    fn cli_json_logging_enforces_format() {
        let mut raw = RawSettings::default();
        let overrides = ClientOverrides {
            log_json: Some(true),
            ..Default::default()
        };

        raw.apply_client_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    fn default_to_browse_command() {
        let args = CliArgs::parse_from(["bacheca"]);
        let command = args
            .command
            .unwrap_or(Command::Browse(BrowseArgs::default()));
        assert!(matches!(command, Command::Browse(_)));
    }

    #[test]
    fn parse_show_arguments() {
        let args = CliArgs::parse_from(["bacheca", "show", "7", "--json"]);

        match args.command.expect("show command") {
            Command::Show(show) => {
                assert_eq!(show.id, 7);
                assert!(show.json);
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn parse_create_arguments() {
        let args = CliArgs::parse_from([
            "bacheca",
            "create",
            "Hello board",
            "first!",
            "--api-base-url",
            "http://localhost:4000/",
        ]);

        match args.command.expect("create command") {
            Command::Create(create) => {
                assert_eq!(create.title, "Hello board");
                assert_eq!(create.body, "first!");
                assert_eq!(
                    create.overrides.api_base_url.as_deref(),
                    Some("http://localhost:4000/")
                );
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn parse_list_page_argument() {
        let args = CliArgs::parse_from(["bacheca", "list", "--page", "2"]);

        match args.command.expect("list command") {
            Command::List(list) => {
                assert_eq!(list.page, Some(2));
                assert!(!list.json);
            }
            _ => panic!("wrong command parsed"),
        }
    }
}
