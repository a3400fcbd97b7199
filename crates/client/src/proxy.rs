use std::sync::Arc;

use tracing::info;

use leavedesk_core::domain::proxy::{ProxyApproval, ProxyApprovalDraft, ProxyApprovalId};

use crate::api::LeaveApi;
use crate::error::ApiError;

/// Delegation management with the duplicate check run against the current
/// list before anything is submitted.
pub struct ProxyDesk {
    api: Arc<dyn LeaveApi>,
}

impl ProxyDesk {
    pub fn new(api: Arc<dyn LeaveApi>) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<ProxyApproval>, ApiError> {
        self.api.proxy_approvals().await
    }

    pub async fn create(&self, draft: &ProxyApprovalDraft) -> Result<ProxyApproval, ApiError> {
        draft.validate()?;
        let existing = self.api.proxy_approvals().await?;
        draft.check_against(&existing)?;

        let created = self.api.create_proxy_approval(draft).await?;
        info!(
            event_name = "proxy.created",
            proxy_approval_id = %created.id,
            proxy_approver_id = %created.proxy_approver_id,
            level = created.approver_level.number(),
            "delegation created"
        );
        Ok(created)
    }

    /// The grant being edited is left out of the duplicate check.
    pub async fn update(
        &self,
        id: ProxyApprovalId,
        draft: &ProxyApprovalDraft,
    ) -> Result<ProxyApproval, ApiError> {
        draft.validate()?;
        let others: Vec<ProxyApproval> =
            self.api.proxy_approvals().await?.into_iter().filter(|grant| grant.id != id).collect();
        draft.check_against(&others)?;

        let updated = self.api.update_proxy_approval(id, draft).await?;
        info!(event_name = "proxy.updated", proxy_approval_id = %id, "delegation updated");
        Ok(updated)
    }

    pub async fn cancel(&self, id: ProxyApprovalId) -> Result<(), ApiError> {
        self.api.cancel_proxy_approval(id).await?;
        info!(event_name = "proxy.cancelled", proxy_approval_id = %id, "delegation cancelled");
        Ok(())
    }
}
