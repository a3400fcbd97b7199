use leavedesk_client::{ApiError, SessionStore};
use leavedesk_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

use crate::commands::{
    CommandResult, Context, EXIT_BACKEND, EXIT_CONFIG, EXIT_OK, EXIT_RUNTIME, EXIT_SESSION,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
    #[serde(skip)]
    exit_code: u8,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = report
        .checks
        .iter()
        .find(|check| check.status == CheckStatus::Fail)
        .map_or(EXIT_OK, |check| check.exit_code);

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(pass("config_validation", "configuration loaded and validated"));
            checks.extend(check_session_and_backend(config));
        }
        Err(error) => {
            checks.push(fail("config_validation", error.to_string(), EXIT_CONFIG));
            checks.push(skipped("session"));
            checks.push(skipped("backend_reachability"));
        }
    }

    let any_fail = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_fail { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_fail {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// One `/auth/me` round trip tells apart a missing session, a rejected
/// token and an unreachable backend.
fn check_session_and_backend(config: AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                fail(
                    "session",
                    format!("failed to initialize async runtime: {error}"),
                    EXIT_RUNTIME,
                ),
                skipped("backend_reachability"),
            ];
        }
    };

    let base_url = config.api.base_url.clone();
    let token_path = config.session.token_path.display().to_string();
    let fixed_token = config.api.token.is_some();

    runtime.block_on(async move {
        let context = match Context::new(config) {
            Ok(context) => context,
            Err(error) => {
                return vec![
                    fail("session", error.to_string(), EXIT_CONFIG),
                    skipped("backend_reachability"),
                ];
            }
        };

        let session = if fixed_token {
            pass("session", "using the token from configuration")
        } else {
            match context.client.sessions().load().await {
                Ok(Some(session)) => pass(
                    "session",
                    format!(
                        "session for {} stored at {token_path}",
                        session.username.as_deref().unwrap_or("unknown user")
                    ),
                ),
                Ok(None) => {
                    return vec![
                        fail(
                            "session",
                            format!("no session at {token_path}; run `leavedesk login`"),
                            EXIT_SESSION,
                        ),
                        skipped("backend_reachability"),
                    ];
                }
                Err(error) => {
                    return vec![
                        fail("session", error.to_string(), EXIT_CONFIG),
                        skipped("backend_reachability"),
                    ];
                }
            }
        };

        let backend = match context.api.current_user().await {
            Ok(me) => pass(
                "backend_reachability",
                format!("{base_url} answered; signed in as {}", me.display_name),
            ),
            Err(ApiError::SessionExpired) => fail(
                "backend_reachability",
                format!("{base_url} rejected the session; run `leavedesk login`"),
                EXIT_SESSION,
            ),
            Err(error) => fail(
                "backend_reachability",
                format!("{base_url} is not usable: {error}"),
                EXIT_BACKEND,
            ),
        };

        vec![session, backend]
    })
}

fn pass(name: &'static str, details: impl Into<String>) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Pass, details: details.into(), exit_code: EXIT_OK }
}

fn fail(name: &'static str, details: impl Into<String>, exit_code: u8) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Fail, details: details.into(), exit_code }
}

fn skipped(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because an earlier check failed".to_string(),
        exit_code: EXIT_OK,
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
