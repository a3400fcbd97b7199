use std::path::PathBuf;

use leavedesk_client::{ApiError, ImportUpload};
use leavedesk_core::config::LoadOptions;

use crate::commands::{execute, CommandResult, Context};

/// Uploads one staff workbook. Rows the backend refused come back in the
/// report, not as an error.
pub fn run(options: LoadOptions, files: Vec<PathBuf>) -> CommandResult {
    execute("import", options, |context| upload(context, files))
}

async fn upload(context: Context, files: Vec<PathBuf>) -> Result<CommandResult, ApiError> {
    let upload = ImportUpload::from_paths(&files).await?;
    let report = context.api.import_users(upload).await?;

    let message = if report.has_failures() {
        format!(
            "created {} user(s); {} row(s) failed",
            report.created_count, report.failed_count
        )
    } else {
        format!("created {} user(s)", report.created_count)
    };
    Ok(CommandResult::with_data("import", message, report.summary()))
}
