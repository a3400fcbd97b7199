pub mod audit;
pub mod auth;
pub mod config;
pub mod directory;
pub mod doctor;
pub mod import;
pub mod proxy;
pub mod reference;
pub mod requests;

use std::future::Future;
use std::sync::Arc;

use leavedesk_client::{ApiClient, ApiError, FileSessionStore, HttpLeaveApi, LeaveApi};
use leavedesk_core::config::{AppConfig, LoadOptions};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

pub const EXIT_OK: u8 = 0;
pub const EXIT_RUNTIME: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_VALIDATION: u8 = 3;
pub const EXIT_SESSION: u8 = 4;
pub const EXIT_BACKEND: u8 = 5;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: None,
        };
        Self { exit_code: EXIT_OK, output: serialize_payload(payload) }
    }

    /// Success carrying a command-specific payload under `data`.
    pub fn with_data(command: &str, message: impl Into<String>, data: impl Serialize) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(error) => {
                return Self::failure(command, "serialization", error.to_string(), EXIT_RUNTIME)
            }
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: Some(data),
        };
        Self { exit_code: EXIT_OK, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn config_failure(command: &str, error: impl std::fmt::Display) -> Self {
        Self::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    }

    /// Maps a client failure onto the CLI's error classes and exit codes.
    /// Backend and validation messages are passed through; transport
    /// problems get the generic text.
    pub fn api_failure(command: &str, error: ApiError) -> Self {
        let (error_class, exit_code) = match &error {
            ApiError::SessionExpired => ("session_expired", EXIT_SESSION),
            ApiError::Validation(_) | ApiError::Domain(_) => ("validation", EXIT_VALIDATION),
            ApiError::Session(_) => ("session_store", EXIT_CONFIG),
            ApiError::Http { .. } => ("backend", EXIT_BACKEND),
            ApiError::Transport(_) | ApiError::Decode(_) => ("transport", EXIT_BACKEND),
            ApiError::Incomplete { .. } => ("incomplete", EXIT_BACKEND),
        };

        let correlation_id = Uuid::new_v4().to_string();
        let detail = error.to_string();
        warn!(
            event_name = "cli.command.failed",
            correlation_id = %correlation_id,
            command,
            error_class,
            error = %detail,
            "command failed"
        );

        let message = match error {
            ApiError::Session(_) => detail,
            other => other.into_interface(correlation_id).user_message().to_string(),
        };
        Self::failure(command, error_class, message, exit_code)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// What every backend-facing command needs: the loaded config and a client
/// whose session lives in the configured token file.
pub struct Context {
    pub config: AppConfig,
    pub client: Arc<ApiClient>,
    pub api: Arc<dyn LeaveApi>,
}

impl Context {
    pub fn new(config: AppConfig) -> Result<Self, ApiError> {
        let sessions = Arc::new(FileSessionStore::new(config.session.token_path.clone()));
        let client = Arc::new(ApiClient::from_config(&config, sessions)?);
        let api: Arc<dyn LeaveApi> = Arc::new(HttpLeaveApi::new(client.clone()));
        Ok(Self { config, client, api })
    }
}

/// Loads config, builds the client and drives `body` on a current-thread
/// runtime, turning every failure into a [`CommandResult`].
pub fn execute<F, Fut>(command: &str, options: LoadOptions, body: F) -> CommandResult
where
    F: FnOnce(Context) -> Fut,
    Fut: Future<Output = Result<CommandResult, ApiError>>,
{
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(command, error),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME,
            );
        }
    };

    let result = runtime.block_on(async {
        let context = Context::new(config)?;
        body(context).await
    });

    result.unwrap_or_else(|error| CommandResult::api_failure(command, error))
}
