use chrono::NaiveDate;
use clap::Args;
use leavedesk_client::{
    load_history, load_holiday_calendar, ActionDispatcher, ApiError, ApprovalInbox, ListSource,
};
use leavedesk_core::config::LoadOptions;
use leavedesk_core::dispatch::{Decision, DecisionDraft};
use leavedesk_core::domain::approver::ApprovalLevel;
use leavedesk_core::domain::leave_request::{
    LeaveRequest, LeaveRequestDraft, LeaveRequestId, RequestDetailId,
};
use leavedesk_core::query::{Page, RequestFilter, RequestView, SortOrder};
use leavedesk_core::queue::{resolve_queue, QueueIdentity};
use leavedesk_core::ValidationError;
use serde::Serialize;

use crate::commands::{execute, CommandResult, Context};

/// Filter, order and page flags shared by the list commands. Empty values
/// mean "any".
#[derive(Debug, Clone, Default, Args)]
pub struct ListArgs {
    #[arg(long, default_value = "", help = "Earliest created day (YYYY-MM-DD)")]
    pub from: String,
    #[arg(long, default_value = "", help = "Latest created day (YYYY-MM-DD)")]
    pub to: String,
    #[arg(long, default_value = "", help = "PENDING, APPROVED, REJECTED, ...")]
    pub status: String,
    #[arg(long = "leave-type", default_value = "")]
    pub leave_type: String,
    #[arg(long, default_value_t = SortOrder::Desc)]
    pub sort: SortOrder,
    #[arg(long, default_value_t = 1)]
    pub page: usize,
}

impl ListArgs {
    fn apply(&self, view: &mut RequestView) -> Result<(), ValidationError> {
        let filter = RequestFilter::from_form(
            &self.from,
            &self.to,
            &self.status,
            &self.leave_type,
            view.filter().offset,
        )?;
        view.set_filter(filter);
        if view.sort() != self.sort {
            view.toggle_sort();
        }
        view.go_to(self.page);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct Listing<'a> {
    level: Option<u8>,
    acting_for: Option<i64>,
    sort: SortOrder,
    page: Page<&'a LeaveRequest>,
}

/// Pending requests for one level. `location` selects the queue the same
/// way the inbox address does (`?proxy=<id>`).
pub fn queue(
    options: LoadOptions,
    level: ApprovalLevel,
    location: &str,
    list: &ListArgs,
) -> CommandResult {
    execute("queue", options, |context| list_queue(context, level, location, list))
}

pub fn history(options: LoadOptions, list: &ListArgs) -> CommandResult {
    execute("history", options, |context| list_history(context, list))
}

pub fn decide(
    options: LoadOptions,
    level: ApprovalLevel,
    detail_id: i64,
    decision: Decision,
    remarks: Option<String>,
    location: &str,
) -> CommandResult {
    let draft = DecisionDraft {
        detail_id: RequestDetailId(detail_id),
        level,
        decision,
        remarks,
        queue: resolve_queue(location),
    };
    execute("decide", options, |context| send_decision(context, draft))
}

pub fn cancel(options: LoadOptions, request_id: i64, remarks: Option<String>) -> CommandResult {
    execute("cancel", options, |context| {
        send_cancel(context, LeaveRequestId(request_id), remarks)
    })
}

#[derive(Debug, Clone)]
pub struct SubmitArgs {
    pub leave_type_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Counted from the holiday calendar when absent.
    pub days: Option<f64>,
    pub reason: String,
}

pub fn submit(options: LoadOptions, args: SubmitArgs) -> CommandResult {
    execute("submit", options, |context| send_request(context, args))
}

async fn list_queue(
    context: Context,
    level: ApprovalLevel,
    location: &str,
    list: &ListArgs,
) -> Result<CommandResult, ApiError> {
    let mut inbox = ApprovalInbox::open(
        context.api.clone(),
        level,
        location,
        context.config.queue_page_size(),
        context.config.utc_offset(),
    )
    .await?;
    list.apply(inbox.view_mut())?;

    let view = inbox.view();
    let listing = Listing {
        level: Some(level.number()),
        acting_for: inbox.identity().proxy_for().map(|user| user.0),
        sort: view.sort(),
        page: view.page(),
    };
    let message = format!(
        "page {} of {}, {} pending at level {level}",
        listing.page.number,
        listing.page.total_pages.max(1),
        listing.page.total_items
    );
    Ok(CommandResult::with_data("queue", message, listing))
}

async fn list_history(context: Context, list: &ListArgs) -> Result<CommandResult, ApiError> {
    let mut view =
        load_history(&context.api, context.config.history_page_size(), context.config.utc_offset())
            .await?;
    list.apply(&mut view)?;

    let listing = Listing { level: None, acting_for: None, sort: view.sort(), page: view.page() };
    let message = format!(
        "page {} of {}, {} request(s)",
        listing.page.number,
        listing.page.total_pages.max(1),
        listing.page.total_items
    );
    Ok(CommandResult::with_data("history", message, listing))
}

/// The CLI holds no list of its own, so reconciliation runs against an
/// empty view.
async fn send_decision(context: Context, draft: DecisionDraft) -> Result<CommandResult, ApiError> {
    let (level, queue, decision, detail_id) =
        (draft.level, draft.queue, draft.decision, draft.detail_id);
    let source = ListSource::Pending { level, queue };
    let mut view = RequestView::new(Vec::new(), context.config.queue_page_size());
    ActionDispatcher::new(context.api.clone(), source).submit_decision(&mut view, draft).await?;

    let on_behalf = match queue {
        QueueIdentity::ActingAsProxy(user) => format!(" on behalf of user {user}"),
        QueueIdentity::SelfQueue => String::new(),
    };
    Ok(CommandResult::success(
        "decide",
        format!("{decision} recorded for step {detail_id} at level {level}{on_behalf}"),
    ))
}

async fn send_cancel(
    context: Context,
    id: LeaveRequestId,
    remarks: Option<String>,
) -> Result<CommandResult, ApiError> {
    let mut view = RequestView::new(Vec::new(), context.config.admin_page_size());
    ActionDispatcher::new(context.api.clone(), ListSource::Mine)
        .cancel_request(&mut view, id, remarks.as_deref())
        .await?;
    Ok(CommandResult::success("cancel", format!("request {id} cancelled")))
}

async fn send_request(context: Context, args: SubmitArgs) -> Result<CommandResult, ApiError> {
    let this_time_days = match args.days {
        Some(days) => days,
        None => {
            let calendar = load_holiday_calendar(&context.api).await?;
            f64::from(calendar.working_days(args.start_date, args.end_date))
        }
    };
    let draft = LeaveRequestDraft {
        leave_type_id: args.leave_type_id,
        start_date: args.start_date,
        end_date: args.end_date,
        this_time_days,
        reason: args.reason,
    };
    draft.validate()?;

    let created = context.api.submit_request(&draft).await?;
    let message = format!("request {} submitted for {this_time_days} day(s)", created.id);
    Ok(CommandResult::with_data("submit", message, created))
}
