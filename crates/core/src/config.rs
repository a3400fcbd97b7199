use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Offset, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::PageSize;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub pagination: PaginationConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    /// Unset means the HTTP client's own defaults apply.
    pub timeout_secs: Option<u64>,
    /// Fixed bearer token; when unset the stored session token is used.
    pub token: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub token_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct PaginationConfig {
    pub queue_page_size: usize,
    pub history_page_size: usize,
    pub admin_page_size: usize,
}

#[derive(Clone, Debug)]
pub struct DisplayConfig {
    pub utc_offset_minutes: i32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub api_token: Option<String>,
    pub session_token_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:3000/api".to_string(),
                timeout_secs: None,
                token: None,
            },
            session: SessionConfig { token_path: PathBuf::from(".leavedesk/session.json") },
            pagination: PaginationConfig {
                queue_page_size: PageSize::QUEUE.get(),
                history_page_size: PageSize::HISTORY.get(),
                admin_page_size: PageSize::ADMIN.get(),
            },
            display: DisplayConfig { utc_offset_minutes: 7 * 60 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("leavedesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Offset used to show timestamps and to bucket them into days.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.display.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    pub fn queue_page_size(&self) -> PageSize {
        PageSize::new(self.pagination.queue_page_size).unwrap_or(PageSize::QUEUE)
    }

    pub fn history_page_size(&self) -> PageSize {
        PageSize::new(self.pagination.history_page_size).unwrap_or(PageSize::HISTORY)
    }

    pub fn admin_page_size(&self) -> PageSize {
        PageSize::new(self.pagination.admin_page_size).unwrap_or(PageSize::ADMIN)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(api) = patch.api {
            if let Some(base_url) = api.base_url {
                self.api.base_url = base_url;
            }
            if let Some(timeout_secs) = api.timeout_secs {
                self.api.timeout_secs = Some(timeout_secs);
            }
            if let Some(api_token_value) = api.token {
                self.api.token = Some(secret_value(api_token_value));
            }
        }

        if let Some(session) = patch.session {
            if let Some(token_path) = session.token_path {
                self.session.token_path = token_path;
            }
        }

        if let Some(pagination) = patch.pagination {
            if let Some(size) = pagination.queue_page_size {
                self.pagination.queue_page_size = size;
            }
            if let Some(size) = pagination.history_page_size {
                self.pagination.history_page_size = size;
            }
            if let Some(size) = pagination.admin_page_size {
                self.pagination.admin_page_size = size;
            }
        }

        if let Some(display) = patch.display {
            if let Some(minutes) = display.utc_offset_minutes {
                self.display.utc_offset_minutes = minutes;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("LEAVEDESK_API_BASE_URL") {
            self.api.base_url = value;
        }
        if let Some(value) = read_env("LEAVEDESK_API_TIMEOUT_SECS") {
            self.api.timeout_secs = Some(parse_u64("LEAVEDESK_API_TIMEOUT_SECS", &value)?);
        }
        if let Some(value) = read_env("LEAVEDESK_API_TOKEN") {
            self.api.token = Some(secret_value(value));
        }

        if let Some(value) = read_env("LEAVEDESK_SESSION_TOKEN_PATH") {
            self.session.token_path = PathBuf::from(value);
        }

        if let Some(value) = read_env("LEAVEDESK_QUEUE_PAGE_SIZE") {
            self.pagination.queue_page_size = parse_usize("LEAVEDESK_QUEUE_PAGE_SIZE", &value)?;
        }
        if let Some(value) = read_env("LEAVEDESK_HISTORY_PAGE_SIZE") {
            self.pagination.history_page_size =
                parse_usize("LEAVEDESK_HISTORY_PAGE_SIZE", &value)?;
        }
        if let Some(value) = read_env("LEAVEDESK_ADMIN_PAGE_SIZE") {
            self.pagination.admin_page_size = parse_usize("LEAVEDESK_ADMIN_PAGE_SIZE", &value)?;
        }

        if let Some(value) = read_env("LEAVEDESK_UTC_OFFSET_MINUTES") {
            self.display.utc_offset_minutes = parse_i32("LEAVEDESK_UTC_OFFSET_MINUTES", &value)?;
        }

        let log_level =
            read_env("LEAVEDESK_LOGGING_LEVEL").or_else(|| read_env("LEAVEDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("LEAVEDESK_LOGGING_FORMAT").or_else(|| read_env("LEAVEDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.api_base_url {
            self.api.base_url = base_url;
        }
        if let Some(api_token) = overrides.api_token {
            self.api.token = Some(secret_value(api_token));
        }
        if let Some(token_path) = overrides.session_token_path {
            self.session.token_path = token_path;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_api(&self.api)?;
        validate_session(&self.session)?;
        validate_pagination(&self.pagination)?;
        validate_display(&self.display)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("leavedesk.toml"), PathBuf::from("config/leavedesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_api(api: &ApiConfig) -> Result<(), ConfigError> {
    let base_url = api.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "api.base_url must start with http:// or https://".to_string(),
        ));
    }

    if let Some(timeout_secs) = api.timeout_secs {
        if timeout_secs == 0 || timeout_secs > 300 {
            return Err(ConfigError::Validation(
                "api.timeout_secs must be in range 1..=300 when set".to_string(),
            ));
        }
    }

    if let Some(token) = &api.token {
        let token = token.expose_secret();
        if token.trim().is_empty() || token.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(
                "api.token must be a non-empty bearer token without whitespace".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_session(session: &SessionConfig) -> Result<(), ConfigError> {
    if session.token_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("session.token_path must not be empty".to_string()));
    }
    Ok(())
}

fn validate_pagination(pagination: &PaginationConfig) -> Result<(), ConfigError> {
    let sizes = [
        ("pagination.queue_page_size", pagination.queue_page_size),
        ("pagination.history_page_size", pagination.history_page_size),
        ("pagination.admin_page_size", pagination.admin_page_size),
    ];
    for (key, size) in sizes {
        if size == 0 || size > 100 {
            return Err(ConfigError::Validation(format!("{key} must be in range 1..=100")));
        }
    }
    Ok(())
}

fn validate_display(display: &DisplayConfig) -> Result<(), ConfigError> {
    if !(-12 * 60..=14 * 60).contains(&display.utc_offset_minutes) {
        return Err(ConfigError::Validation(
            "display.utc_offset_minutes must be in range -720..=840".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_i32(key: &str, value: &str) -> Result<i32, ConfigError> {
    value.parse::<i32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    api: Option<ApiPatch>,
    session: Option<SessionPatch>,
    pagination: Option<PaginationPatch>,
    display: Option<DisplayPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    token_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct PaginationPatch {
    queue_page_size: Option<usize>,
    history_page_size: Option<usize>,
    admin_page_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct DisplayPatch {
    utc_offset_minutes: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
