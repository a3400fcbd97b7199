use std::path::PathBuf;

use leavedesk_client::{fetch_all_audit_logs, ApiError};
use leavedesk_core::audit::export_csv;
use leavedesk_core::config::LoadOptions;
use tracing::info;

use crate::commands::{execute, CommandResult, Context, EXIT_RUNTIME};

/// Writes the whole audit log as CSV to `output`.
pub fn export(options: LoadOptions, action: Option<String>, output: PathBuf) -> CommandResult {
    execute("audit.export", options, |context| write_export(context, action, output))
}

async fn write_export(
    context: Context,
    action: Option<String>,
    output: PathBuf,
) -> Result<CommandResult, ApiError> {
    let entries =
        fetch_all_audit_logs(&context.api, context.config.admin_page_size(), action).await?;
    let csv = export_csv(&entries, context.config.utc_offset());

    if let Err(error) = tokio::fs::write(&output, csv.as_bytes()).await {
        return Ok(CommandResult::failure(
            "audit.export",
            "output_write",
            format!("could not write {}: {error}", output.display()),
            EXIT_RUNTIME,
        ));
    }

    info!(
        event_name = "audit.export.written",
        rows = entries.len(),
        path = %output.display(),
        "audit log exported"
    );
    Ok(CommandResult::success(
        "audit.export",
        format!("{} entr(ies) written to {}", entries.len(), output.display()),
    ))
}
