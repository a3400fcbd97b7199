use chrono::NaiveDate;
use leavedesk_client::{ApiError, ProxyDesk};
use leavedesk_core::config::LoadOptions;
use leavedesk_core::domain::approver::{ApprovalLevel, UserId};
use leavedesk_core::domain::proxy::{DelegationWindow, ProxyApprovalDraft, ProxyApprovalId};

use crate::commands::{execute, CommandResult, Context};

#[derive(Debug, Clone)]
pub struct GrantArgs {
    pub original_approver_id: i64,
    pub proxy_approver_id: i64,
    pub level: ApprovalLevel,
    pub start_date: NaiveDate,
    /// Single-day grant when absent.
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
}

impl GrantArgs {
    fn draft(&self) -> ProxyApprovalDraft {
        let window = match self.end_date {
            Some(end_date) if end_date != self.start_date => {
                DelegationWindow::range(self.start_date, end_date)
            }
            _ => DelegationWindow::daily(self.start_date),
        };
        ProxyApprovalDraft {
            original_approver_id: UserId(self.original_approver_id),
            proxy_approver_id: UserId(self.proxy_approver_id),
            approver_level: self.level,
            window,
            reason: self.reason.clone().filter(|reason| !reason.trim().is_empty()),
        }
    }
}

pub fn list(options: LoadOptions) -> CommandResult {
    execute("proxy.list", options, list_grants)
}

pub fn create(options: LoadOptions, args: GrantArgs) -> CommandResult {
    execute("proxy.create", options, |context| create_grant(context, args))
}

pub fn update(options: LoadOptions, id: i64, args: GrantArgs) -> CommandResult {
    execute("proxy.update", options, |context| update_grant(context, ProxyApprovalId(id), args))
}

pub fn cancel(options: LoadOptions, id: i64) -> CommandResult {
    execute("proxy.cancel", options, |context| cancel_grant(context, ProxyApprovalId(id)))
}

async fn list_grants(context: Context) -> Result<CommandResult, ApiError> {
    let grants = ProxyDesk::new(context.api.clone()).list().await?;
    let message = format!("{} delegation(s)", grants.len());
    Ok(CommandResult::with_data("proxy.list", message, grants))
}

async fn create_grant(context: Context, args: GrantArgs) -> Result<CommandResult, ApiError> {
    let created = ProxyDesk::new(context.api.clone()).create(&args.draft()).await?;
    let message = format!("delegation {} created", created.id);
    Ok(CommandResult::with_data("proxy.create", message, created))
}

async fn update_grant(
    context: Context,
    id: ProxyApprovalId,
    args: GrantArgs,
) -> Result<CommandResult, ApiError> {
    let updated = ProxyDesk::new(context.api.clone()).update(id, &args.draft()).await?;
    Ok(CommandResult::with_data("proxy.update", format!("delegation {id} updated"), updated))
}

async fn cancel_grant(context: Context, id: ProxyApprovalId) -> Result<CommandResult, ApiError> {
    ProxyDesk::new(context.api.clone()).cancel(id).await?;
    Ok(CommandResult::success("proxy.cancel", format!("delegation {id} cancelled")))
}
