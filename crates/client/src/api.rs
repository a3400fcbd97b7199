use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::multipart::{Form, Part};
use reqwest::Method;

use leavedesk_core::audit::{AuditLogPage, AuditLogQuery};
use leavedesk_core::dispatch::{CancelBody, DecisionSubmission};
use leavedesk_core::domain::approver::{ApprovalLevel, Approver, DirectoryEntry};
use leavedesk_core::domain::import::BulkImportReport;
use leavedesk_core::domain::leave_request::{LeaveRequest, LeaveRequestDraft, LeaveRequestId};
use leavedesk_core::domain::proxy::{ProxyApproval, ProxyApprovalDraft, ProxyApprovalId};
use leavedesk_core::domain::reference::{Department, Holiday, LeaveType, Organization};
use leavedesk_core::queue::QueueIdentity;

use crate::error::ApiError;
use crate::http::ApiClient;
use crate::import::ImportUpload;

/// Typed view of the leave-management REST contract.
#[async_trait]
pub trait LeaveApi: Send + Sync {
    async fn current_user(&self) -> Result<Approver, ApiError>;

    async fn approvers_for_level(
        &self,
        level: ApprovalLevel,
        date: NaiveDate,
    ) -> Result<Vec<DirectoryEntry>, ApiError>;

    async fn my_requests(&self) -> Result<Vec<LeaveRequest>, ApiError>;

    async fn submit_request(&self, draft: &LeaveRequestDraft) -> Result<LeaveRequest, ApiError>;

    async fn pending_requests(
        &self,
        level: ApprovalLevel,
        queue: QueueIdentity,
    ) -> Result<Vec<LeaveRequest>, ApiError>;

    async fn submit_decision(&self, submission: &DecisionSubmission) -> Result<(), ApiError>;

    async fn cancel_request(&self, id: LeaveRequestId, body: &CancelBody) -> Result<(), ApiError>;

    async fn proxy_approvals(&self) -> Result<Vec<ProxyApproval>, ApiError>;

    async fn create_proxy_approval(
        &self,
        draft: &ProxyApprovalDraft,
    ) -> Result<ProxyApproval, ApiError>;

    async fn update_proxy_approval(
        &self,
        id: ProxyApprovalId,
        draft: &ProxyApprovalDraft,
    ) -> Result<ProxyApproval, ApiError>;

    async fn cancel_proxy_approval(&self, id: ProxyApprovalId) -> Result<(), ApiError>;

    async fn departments(&self) -> Result<Vec<Department>, ApiError>;

    async fn organizations(&self) -> Result<Vec<Organization>, ApiError>;

    async fn leave_types(&self) -> Result<Vec<LeaveType>, ApiError>;

    async fn holidays(&self) -> Result<Vec<Holiday>, ApiError>;

    async fn audit_logs(&self, query: &AuditLogQuery) -> Result<AuditLogPage, ApiError>;

    async fn import_users(&self, upload: ImportUpload) -> Result<BulkImportReport, ApiError>;
}

pub struct HttpLeaveApi {
    client: Arc<ApiClient>,
}

impl HttpLeaveApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

#[async_trait]
impl LeaveApi for HttpLeaveApi {
    async fn current_user(&self) -> Result<Approver, ApiError> {
        self.client.get_json("/auth/me", &[]).await
    }

    async fn approvers_for_level(
        &self,
        level: ApprovalLevel,
        date: NaiveDate,
    ) -> Result<Vec<DirectoryEntry>, ApiError> {
        let path = format!("/auth/approvers-for-level/{}", level.number());
        self.client.get_list(&path, &[("date", date.format("%Y-%m-%d").to_string())]).await
    }

    async fn my_requests(&self) -> Result<Vec<LeaveRequest>, ApiError> {
        self.client.get_list("/leave-requests/me", &[]).await
    }

    async fn submit_request(&self, draft: &LeaveRequestDraft) -> Result<LeaveRequest, ApiError> {
        self.client.send_json(Method::POST, "/leave-requests", draft).await
    }

    async fn pending_requests(
        &self,
        level: ApprovalLevel,
        queue: QueueIdentity,
    ) -> Result<Vec<LeaveRequest>, ApiError> {
        let path = format!("/leave-requests/pending/level/{}", level.number());
        let query: Vec<(&str, String)> =
            queue.proxy_for().map(|user_id| ("proxy", user_id.to_string())).into_iter().collect();
        self.client.get_list(&path, &query).await
    }

    async fn submit_decision(&self, submission: &DecisionSubmission) -> Result<(), ApiError> {
        let path = format!(
            "/leave-requests/level/{}/{}/{}",
            submission.level.number(),
            submission.detail_id,
            submission.decision.action()
        );
        self.client.send(Method::PATCH, &path, Some(&submission.body)).await
    }

    async fn cancel_request(&self, id: LeaveRequestId, body: &CancelBody) -> Result<(), ApiError> {
        let path = format!("/leave-requests/{id}/cancel");
        self.client.send(Method::PATCH, &path, Some(body)).await
    }

    async fn proxy_approvals(&self) -> Result<Vec<ProxyApproval>, ApiError> {
        self.client.get_list("/proxy-approval", &[]).await
    }

    async fn create_proxy_approval(
        &self,
        draft: &ProxyApprovalDraft,
    ) -> Result<ProxyApproval, ApiError> {
        self.client.send_json(Method::POST, "/proxy-approval", draft).await
    }

    async fn update_proxy_approval(
        &self,
        id: ProxyApprovalId,
        draft: &ProxyApprovalDraft,
    ) -> Result<ProxyApproval, ApiError> {
        self.client.send_json(Method::PUT, &format!("/proxy-approval/{id}"), draft).await
    }

    async fn cancel_proxy_approval(&self, id: ProxyApprovalId) -> Result<(), ApiError> {
        let path = format!("/proxy-approval/{id}/cancel");
        self.client.send::<()>(Method::PATCH, &path, None).await
    }

    async fn departments(&self) -> Result<Vec<Department>, ApiError> {
        self.client.get_list("/admin/departments", &[]).await
    }

    async fn organizations(&self) -> Result<Vec<Organization>, ApiError> {
        self.client.get_list("/admin/organizations", &[]).await
    }

    async fn leave_types(&self) -> Result<Vec<LeaveType>, ApiError> {
        self.client.get_list("/leave-types", &[]).await
    }

    async fn holidays(&self) -> Result<Vec<Holiday>, ApiError> {
        self.client.get_list("/admin/holiday", &[]).await
    }

    async fn audit_logs(&self, query: &AuditLogQuery) -> Result<AuditLogPage, ApiError> {
        let mut params =
            vec![("page", query.page.to_string()), ("perPage", query.per_page.to_string())];
        if let Some(action) = &query.action {
            params.push(("action", action.clone()));
        }
        self.client.get_json("/admin/audit-logs", &params).await
    }

    async fn import_users(&self, upload: ImportUpload) -> Result<BulkImportReport, ApiError> {
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(upload.content_type)?;
        let form = Form::new().part("file", part);
        self.client.send_multipart("/admin/add-user-excel", form).await
    }
}
