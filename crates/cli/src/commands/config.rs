use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use leavedesk_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct Field {
    key: &'static str,
    env_keys: &'static [&'static str],
    from_flag: bool,
    value: String,
}

pub fn run(options: LoadOptions) -> String {
    let explicit_path = options.config_path.clone();
    let flags = FlagsSet {
        base_url: options.overrides.api_base_url.is_some(),
        token: options.overrides.api_token.is_some(),
        token_path: options.overrides.session_token_path.is_some(),
        log_level: options.overrides.log_level.is_some(),
    };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path(explicit_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    for field in fields(&config, &flags) {
        let source =
            field_source(&field, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(format!("- {} = {} (source: {source})", field.key, field.value));
    }

    lines.join("\n")
}

struct FlagsSet {
    base_url: bool,
    token: bool,
    token_path: bool,
    log_level: bool,
}

fn fields(config: &AppConfig, flags: &FlagsSet) -> Vec<Field> {
    vec![
        Field {
            key: "api.base_url",
            env_keys: &["LEAVEDESK_API_BASE_URL"],
            from_flag: flags.base_url,
            value: config.api.base_url.clone(),
        },
        Field {
            key: "api.timeout_secs",
            env_keys: &["LEAVEDESK_API_TIMEOUT_SECS"],
            from_flag: false,
            value: config
                .api
                .timeout_secs
                .map(|secs| secs.to_string())
                .unwrap_or_else(|| "<unset>".to_string()),
        },
        Field {
            key: "api.token",
            env_keys: &["LEAVEDESK_API_TOKEN"],
            from_flag: flags.token,
            value: if config.api.token.is_some() { "<redacted>" } else { "<unset>" }.to_string(),
        },
        Field {
            key: "session.token_path",
            env_keys: &["LEAVEDESK_SESSION_TOKEN_PATH"],
            from_flag: flags.token_path,
            value: config.session.token_path.display().to_string(),
        },
        Field {
            key: "pagination.queue_page_size",
            env_keys: &["LEAVEDESK_QUEUE_PAGE_SIZE"],
            from_flag: false,
            value: config.pagination.queue_page_size.to_string(),
        },
        Field {
            key: "pagination.history_page_size",
            env_keys: &["LEAVEDESK_HISTORY_PAGE_SIZE"],
            from_flag: false,
            value: config.pagination.history_page_size.to_string(),
        },
        Field {
            key: "pagination.admin_page_size",
            env_keys: &["LEAVEDESK_ADMIN_PAGE_SIZE"],
            from_flag: false,
            value: config.pagination.admin_page_size.to_string(),
        },
        Field {
            key: "display.utc_offset_minutes",
            env_keys: &["LEAVEDESK_UTC_OFFSET_MINUTES"],
            from_flag: false,
            value: config.display.utc_offset_minutes.to_string(),
        },
        Field {
            key: "logging.level",
            env_keys: &["LEAVEDESK_LOGGING_LEVEL", "LEAVEDESK_LOG_LEVEL"],
            from_flag: flags.log_level,
            value: config.logging.level.clone(),
        },
        Field {
            key: "logging.format",
            env_keys: &["LEAVEDESK_LOGGING_FORMAT", "LEAVEDESK_LOG_FORMAT"],
            from_flag: false,
            value: format!("{:?}", config.logging.format).to_ascii_lowercase(),
        },
    ]
}

fn detect_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then_some(path);
    }

    ["leavedesk.toml", "config/leavedesk.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(field: &Field, doc: Option<&Value>, file_path: Option<&Path>) -> String {
    if field.from_flag {
        return "flag".to_string();
    }

    if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if doc.is_some_and(|doc| contains_path(doc, field.key)) {
        let file_path = file_path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "config file".to_string());
        return format!("file ({file_path})");
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
