use std::env;
use std::io::{self, BufRead};

use anyhow::Context as _;

use leavedesk_client::ApiError;
use leavedesk_core::config::LoadOptions;
use secrecy::SecretString;
use serde::Serialize;

use crate::commands::{execute, CommandResult, Context, EXIT_VALIDATION};

pub const PASSWORD_ENV: &str = "LEAVEDESK_PASSWORD";

#[derive(Debug, Serialize)]
struct WhoAmI {
    id: i64,
    display_name: String,
    levels: Vec<u8>,
    is_admin: bool,
    department: Option<String>,
}

/// Password from `LEAVEDESK_PASSWORD`, else the first line of stdin.
pub fn read_password() -> anyhow::Result<SecretString> {
    if let Ok(password) = env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(password));
    }
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).context("reading password from stdin")?;
    Ok(SecretString::from(line.trim_end_matches(['\r', '\n']).to_string()))
}

pub fn login(options: LoadOptions, username: &str, password: SecretString) -> CommandResult {
    if username.trim().is_empty() {
        return CommandResult::failure(
            "login",
            "validation",
            "username is required",
            EXIT_VALIDATION,
        );
    }

    execute("login", options, |context| sign_in(context, username.trim(), password))
}

async fn sign_in(
    context: Context,
    username: &str,
    password: SecretString,
) -> Result<CommandResult, ApiError> {
    let session = context.client.login(username, &password).await?;
    Ok(CommandResult::success(
        "login",
        format!(
            "signed in as {}; session stored at {}",
            session.username.as_deref().unwrap_or(username),
            context.config.session.token_path.display()
        ),
    ))
}

pub fn logout(options: LoadOptions) -> CommandResult {
    execute("logout", options, sign_out)
}

async fn sign_out(context: Context) -> Result<CommandResult, ApiError> {
    context.client.logout().await?;
    Ok(CommandResult::success("logout", "session cleared"))
}

pub fn whoami(options: LoadOptions) -> CommandResult {
    execute("whoami", options, describe_current_user)
}

async fn describe_current_user(context: Context) -> Result<CommandResult, ApiError> {
    let me = context.api.current_user().await?;
    let summary = WhoAmI {
        id: me.id.0,
        display_name: me.display_name.clone(),
        levels: me.levels().into_iter().map(|level| level.number()).collect(),
        is_admin: me.is_admin(),
        department: me.department.clone(),
    };
    let message = format!("signed in as {}", me.display_name);
    Ok(CommandResult::with_data("whoami", message, summary))
}
