use chrono::NaiveDate;
use leavedesk_client::{ApiError, DelegationDirectory};
use leavedesk_core::config::LoadOptions;
use leavedesk_core::domain::approver::ApprovalLevel;
use serde::Serialize;

use crate::commands::{execute, CommandResult, Context, EXIT_BACKEND, EXIT_SESSION};

#[derive(Debug, Serialize)]
struct ApproverRow {
    id: i64,
    display_name: String,
    is_proxy: bool,
}

/// Approvers for `level` on `date`, delegates flagged. A failed lookup is
/// reported with the same alert text the directory produces.
pub fn approvers(options: LoadOptions, level: ApprovalLevel, date: NaiveDate) -> CommandResult {
    execute("approvers", options, |context| list_approvers(context, level, date))
}

async fn list_approvers(
    context: Context,
    level: ApprovalLevel,
    date: NaiveDate,
) -> Result<CommandResult, ApiError> {
    let lookup = DelegationDirectory::new(context.api.clone()).lookup(level, date).await;

    if let Some(failure) = lookup.failure() {
        let (error_class, exit_code) = if failure.requires_login() {
            ("session_expired", EXIT_SESSION)
        } else {
            ("backend", EXIT_BACKEND)
        };
        let message = failure.user_message();
        return Ok(CommandResult::failure("approvers", error_class, message, exit_code));
    }

    let proxies = lookup.proxies().count();
    let rows: Vec<ApproverRow> = lookup
        .into_entries()
        .into_iter()
        .map(|entry| ApproverRow {
            id: entry.approver.id.0,
            display_name: entry.approver.display_name,
            is_proxy: entry.is_proxy,
        })
        .collect();

    let message =
        format!("{} approver(s) for level {level} on {date}, {proxies} by delegation", rows.len());
    Ok(CommandResult::with_data("approvers", message, rows))
}
