use std::sync::Arc;

use tracing::{debug, warn};

use leavedesk_core::audit::{AuditLogEntry, AuditLogQuery};
use leavedesk_core::query::PageSize;

use crate::api::LeaveApi;
use crate::error::ApiError;

/// Pages the log may grow by while an export is running.
const GROWTH_ALLOWANCE_PAGES: u32 = 10;

/// Walks every page of the audit log in backend order. Fails with
/// `ApiError::Incomplete` rather than returning a partial log when the
/// backend keeps reporting pages well past the total it first announced.
pub async fn fetch_all_audit_logs(
    api: &Arc<dyn LeaveApi>,
    page_size: PageSize,
    action: Option<String>,
) -> Result<Vec<AuditLogEntry>, ApiError> {
    let per_page = u32::try_from(page_size.get()).unwrap_or(u32::MAX);
    let mut query = AuditLogQuery { page: 1, per_page, action };
    let mut entries = Vec::new();
    let mut page_limit = None;

    loop {
        let page = api.audit_logs(&query).await?;
        debug!(
            event_name = "audit.page.fetched",
            page = page.page,
            total = page.total,
            rows = page.data.len(),
            "audit log page fetched"
        );

        let limit = *page_limit
            .get_or_insert_with(|| page.total_pages().saturating_add(GROWTH_ALLOWANCE_PAGES));
        let done = page.data.is_empty() || page.is_last();
        let total = page.total;
        entries.extend(page.data);
        if done {
            break;
        }
        if query.page >= limit {
            warn!(
                event_name = "audit.export.incomplete",
                pages = limit,
                fetched = entries.len(),
                total,
                "audit log kept growing past the page limit"
            );
            return Err(ApiError::Incomplete { fetched: entries.len(), total });
        }
        query.page += 1;
    }

    Ok(entries)
}
