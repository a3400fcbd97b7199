//! Approval queue for one level, following the location it is shown at.

use std::sync::Arc;

use chrono::FixedOffset;
use tracing::info;

use leavedesk_core::dispatch::{Decision, DecisionDraft};
use leavedesk_core::domain::approver::ApprovalLevel;
use leavedesk_core::domain::leave_request::RequestDetailId;
use leavedesk_core::query::{PageSize, RequestFilter, RequestView};
use leavedesk_core::queue::{QueueIdentity, QueueSelector};

use crate::api::LeaveApi;
use crate::dispatcher::{ActionDispatcher, DispatchOutcome, ListSource, ReconcileMode};
use crate::error::ApiError;

pub struct ApprovalInbox {
    api: Arc<dyn LeaveApi>,
    level: ApprovalLevel,
    selector: QueueSelector,
    page_size: PageSize,
    offset: FixedOffset,
    mode: ReconcileMode,
    view: RequestView,
}

impl ApprovalInbox {
    /// Resolves the queue from `location` and fetches it.
    pub async fn open(
        api: Arc<dyn LeaveApi>,
        level: ApprovalLevel,
        location: &str,
        page_size: PageSize,
        offset: FixedOffset,
    ) -> Result<Self, ApiError> {
        let mut inbox = Self {
            api,
            level,
            selector: QueueSelector::new(location),
            page_size,
            offset,
            mode: ReconcileMode::default(),
            view: empty_view(page_size, offset),
        };
        inbox.refresh().await?;
        Ok(inbox)
    }

    pub fn with_mode(mut self, mode: ReconcileMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn level(&self) -> ApprovalLevel {
        self.level
    }

    pub fn identity(&self) -> QueueIdentity {
        self.selector.current()
    }

    pub fn view(&self) -> &RequestView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut RequestView {
        &mut self.view
    }

    /// Fetches the current queue again, keeping filter, order and page.
    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        let identity = self.identity();
        let requests = self.api.pending_requests(self.level, identity).await?;
        info!(
            event_name = "inbox.refresh.completed",
            level = self.level.number(),
            queue = ?identity,
            count = requests.len(),
            "approval queue loaded"
        );
        self.view.replace(requests);
        Ok(())
    }

    /// Re-resolves the queue after the location changed. A different queue
    /// starts from a clean view; returns whether that happened.
    pub async fn navigate(&mut self, location: &str) -> Result<bool, ApiError> {
        if !self.selector.navigate(location) {
            return Ok(false);
        }
        self.view = empty_view(self.page_size, self.offset);
        self.refresh().await?;
        Ok(true)
    }

    /// Decides on one step of the current queue. When acting as a proxy the
    /// represented identity is sent along.
    pub async fn decide(
        &mut self,
        detail_id: RequestDetailId,
        decision: Decision,
        remarks: Option<String>,
    ) -> Result<DispatchOutcome, ApiError> {
        let draft = DecisionDraft {
            detail_id,
            level: self.level,
            decision,
            remarks,
            queue: self.identity(),
        };
        self.dispatcher().submit_decision(&mut self.view, draft).await
    }

    fn dispatcher(&self) -> ActionDispatcher {
        let source = ListSource::Pending { level: self.level, queue: self.identity() };
        ActionDispatcher::new(self.api.clone(), source).with_mode(self.mode)
    }
}

/// The caller's own requests, shown with the history page size.
pub async fn load_history(
    api: &Arc<dyn LeaveApi>,
    page_size: PageSize,
    offset: FixedOffset,
) -> Result<RequestView, ApiError> {
    let requests = api.my_requests().await?;
    info!(event_name = "history.load.completed", count = requests.len(), "own requests loaded");
    Ok(RequestView::new(requests, page_size)
        .with_filter(RequestFilter::default().with_offset(offset)))
}

fn empty_view(page_size: PageSize, offset: FixedOffset) -> RequestView {
    RequestView::new(Vec::new(), page_size)
        .with_filter(RequestFilter::default().with_offset(offset))
}
