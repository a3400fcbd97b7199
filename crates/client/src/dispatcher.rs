//! Sends reviewer decisions and admin cancellations, then brings the local
//! list back in line with the backend.

use std::sync::Arc;

use tracing::{info, warn};

use leavedesk_core::dispatch::{CancelBody, DecisionDraft, DecisionSubmission, RemarksPolicy};
use leavedesk_core::domain::approver::ApprovalLevel;
use leavedesk_core::domain::leave_request::{LeaveRequest, LeaveRequestId};
use leavedesk_core::query::RequestView;
use leavedesk_core::queue::QueueIdentity;

use crate::api::LeaveApi;
use crate::error::ApiError;

/// What happens to the local list after the backend accepted an action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Drop the acted-upon item locally.
    #[default]
    Optimistic,
    /// Fetch the authoritative list again.
    Refetch,
}

/// Where the list shown to the user came from, used for re-fetching.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListSource {
    Pending { level: ApprovalLevel, queue: QueueIdentity },
    Mine,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Request dropped from the local list, if it was there.
    pub removed: Option<LeaveRequestId>,
    pub refetched: bool,
}

pub struct ActionDispatcher {
    api: Arc<dyn LeaveApi>,
    source: ListSource,
    mode: ReconcileMode,
}

impl ActionDispatcher {
    pub fn new(api: Arc<dyn LeaveApi>, source: ListSource) -> Self {
        Self { api, source, mode: ReconcileMode::default() }
    }

    pub fn with_mode(mut self, mode: ReconcileMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> ReconcileMode {
        self.mode
    }

    /// Submits a decision with the remarks policy of its level.
    pub async fn submit_decision(
        &self,
        view: &mut RequestView,
        draft: DecisionDraft,
    ) -> Result<DispatchOutcome, ApiError> {
        let policy = RemarksPolicy::for_level(draft.level);
        self.submit_with_policy(view, draft, policy).await
    }

    /// Validates locally, sends, and reconciles `view` on success. On any
    /// failure `view` is left untouched.
    pub async fn submit_with_policy(
        &self,
        view: &mut RequestView,
        draft: DecisionDraft,
        policy: RemarksPolicy,
    ) -> Result<DispatchOutcome, ApiError> {
        let submission = draft.prepare(policy)?;
        self.send_decision(&submission).await?;

        let detail_id = submission.detail_id;
        let outcome = self
            .reconcile(view, |requests| {
                let request = requests.iter().find(|request| request.has_step(detail_id))?;
                Some(request.id)
            })
            .await;
        Ok(outcome)
    }

    pub async fn cancel_request(
        &self,
        view: &mut RequestView,
        id: LeaveRequestId,
        remarks: Option<&str>,
    ) -> Result<DispatchOutcome, ApiError> {
        let body = CancelBody::new(remarks)?;
        if let Err(error) = self.api.cancel_request(id, &body).await {
            warn!(
                event_name = "dispatch.cancel.failed",
                request_id = %id,
                error = %error,
                "cancellation was not accepted"
            );
            return Err(error);
        }
        info!(event_name = "dispatch.cancel.accepted", request_id = %id, "request cancelled");

        Ok(self
            .reconcile(view, |requests| {
                requests.iter().any(|request| request.id == id).then_some(id)
            })
            .await)
    }

    async fn send_decision(&self, submission: &DecisionSubmission) -> Result<(), ApiError> {
        match self.api.submit_decision(submission).await {
            Ok(()) => {
                info!(
                    event_name = "dispatch.decision.accepted",
                    detail_id = %submission.detail_id,
                    level = submission.level.number(),
                    decision = %submission.decision,
                    on_behalf_of = ?submission.body.proxy_for,
                    "decision accepted"
                );
                Ok(())
            }
            Err(error) => {
                warn!(
                    event_name = "dispatch.decision.failed",
                    detail_id = %submission.detail_id,
                    level = submission.level.number(),
                    decision = %submission.decision,
                    error = %error,
                    "decision was not accepted"
                );
                Err(error)
            }
        }
    }

    /// `locate` names the request the action applied to within the current
    /// list.
    async fn reconcile<F>(&self, view: &mut RequestView, locate: F) -> DispatchOutcome
    where
        F: Fn(&[LeaveRequest]) -> Option<LeaveRequestId>,
    {
        let target = locate(view.requests());

        if self.mode == ReconcileMode::Refetch {
            match self.fetch_source().await {
                Ok(requests) => {
                    view.replace(requests);
                    return DispatchOutcome { removed: target, refetched: true };
                }
                Err(error) => warn!(
                    event_name = "dispatch.refetch.failed",
                    error = %error,
                    "list refresh failed after a successful action; removing locally"
                ),
            }
        }

        let removed = target.and_then(|id| view.remove_request(id)).map(|request| request.id);
        DispatchOutcome { removed, refetched: false }
    }

    async fn fetch_source(&self) -> Result<Vec<LeaveRequest>, ApiError> {
        match self.source {
            ListSource::Pending { level, queue } => self.api.pending_requests(level, queue).await,
            ListSource::Mine => self.api.my_requests().await,
        }
    }
}
