use chrono::NaiveDate;
use leavedesk_client::{load_reference_data, ApiError};
use leavedesk_core::config::LoadOptions;
use serde::Serialize;

use crate::commands::{execute, CommandResult, Context};

#[derive(Debug, Serialize)]
struct ReferenceSummary {
    departments: usize,
    organizations: usize,
    leave_types: Vec<LeaveTypeRow>,
    holidays: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    working_days: Option<u32>,
}

#[derive(Debug, Serialize)]
struct LeaveTypeRow {
    id: i64,
    name: String,
    max_days: Option<f64>,
}

/// Loads the lookup tables and, given a range, counts its working days
/// against the holiday calendar.
pub fn run(options: LoadOptions, range: Option<(NaiveDate, NaiveDate)>) -> CommandResult {
    execute("reference", options, |context| summarize(context, range))
}

async fn summarize(
    context: Context,
    range: Option<(NaiveDate, NaiveDate)>,
) -> Result<CommandResult, ApiError> {
    let reference = load_reference_data(&context.api).await?;
    let working_days = range.map(|(start, end)| reference.calendar().working_days(start, end));

    let summary = ReferenceSummary {
        departments: reference.departments.len(),
        organizations: reference.organizations.len(),
        leave_types: reference
            .leave_types
            .iter()
            .map(|leave_type| LeaveTypeRow {
                id: leave_type.id,
                name: leave_type.name.clone(),
                max_days: leave_type.max_days,
            })
            .collect(),
        holidays: reference.holidays.len(),
        working_days,
    };

    let message = match (range, working_days) {
        (Some((start, end)), Some(days)) => format!("{days} working day(s) from {start} to {end}"),
        _ => "reference data loaded".to_string(),
    };
    Ok(CommandResult::with_data("reference", message, summary))
}
