use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use tokio::sync::RwLock;

use leavedesk_core::audit::{AuditLogEntry, AuditLogPage, AuditLogQuery};
use leavedesk_core::dispatch::{CancelBody, DecisionSubmission};
use leavedesk_core::domain::approver::{ApprovalLevel, Approver, DirectoryEntry, UserId};
use leavedesk_core::domain::import::BulkImportReport;
use leavedesk_core::domain::leave_request::{
    ApprovalStep, LeaveRequest, LeaveRequestDraft, LeaveRequestId, LeaveStatus, RequestDetailId,
    Requester,
};
use leavedesk_core::domain::proxy::{
    ProxyApproval, ProxyApprovalDraft, ProxyApprovalId, ProxyStatus,
};
use leavedesk_core::domain::reference::{
    Department, Holiday, LeaveType, Organization, ReferenceData,
};
use leavedesk_core::queue::QueueIdentity;

use crate::api::LeaveApi;
use crate::error::ApiError;
use crate::import::ImportUpload;

type QueueKey = (ApprovalLevel, Option<UserId>);

#[derive(Default)]
struct FakeState {
    directory: HashMap<ApprovalLevel, Vec<DirectoryEntry>>,
    pending: HashMap<QueueKey, Vec<LeaveRequest>>,
    mine: Vec<LeaveRequest>,
    proxies: Vec<ProxyApproval>,
    reference: ReferenceData,
    audit: Vec<AuditLogEntry>,
    audit_growth: u64,
    failures: VecDeque<ApiError>,
    failing_calls: HashMap<&'static str, ApiError>,
    decisions: Vec<DecisionSubmission>,
    cancels: Vec<(LeaveRequestId, String)>,
    calls: Vec<&'static str>,
}

/// In-memory stand-in for the backend. Decisions and cancellations remove
/// the affected request from every queue, as the backend would.
#[derive(Default)]
pub struct FakeLeaveApi {
    state: RwLock<FakeState>,
}

impl FakeLeaveApi {
    pub async fn set_directory(&self, level: ApprovalLevel, entries: Vec<DirectoryEntry>) {
        self.state.write().await.directory.insert(level, entries);
    }

    pub async fn set_pending(
        &self,
        level: ApprovalLevel,
        queue: QueueIdentity,
        requests: Vec<LeaveRequest>,
    ) {
        self.state.write().await.pending.insert((level, queue.proxy_for()), requests);
    }

    pub async fn set_mine(&self, requests: Vec<LeaveRequest>) {
        self.state.write().await.mine = requests;
    }

    pub async fn set_proxies(&self, proxies: Vec<ProxyApproval>) {
        self.state.write().await.proxies = proxies;
    }

    pub async fn set_reference(&self, reference: ReferenceData) {
        self.state.write().await.reference = reference;
    }

    pub async fn set_audit(&self, entries: Vec<AuditLogEntry>) {
        self.state.write().await.audit = entries;
    }

    /// Every audit page read appends `rows` new entries, so the log never
    /// runs out while being paged.
    pub async fn grow_audit_per_read(&self, rows: u64) {
        self.state.write().await.audit_growth = rows;
    }

    /// The next call of any kind fails with `error`.
    pub async fn fail_next(&self, error: ApiError) {
        self.state.write().await.failures.push_back(error);
    }

    /// Every call to `call` fails with `error`.
    pub async fn fail_call(&self, call: &'static str, error: ApiError) {
        self.state.write().await.failing_calls.insert(call, error);
    }

    pub async fn decisions(&self) -> Vec<DecisionSubmission> {
        self.state.read().await.decisions.clone()
    }

    pub async fn cancels(&self) -> Vec<(LeaveRequestId, String)> {
        self.state.read().await.cancels.clone()
    }

    pub async fn calls(&self) -> Vec<&'static str> {
        self.state.read().await.calls.clone()
    }

    async fn begin(&self, call: &'static str) -> Result<(), ApiError> {
        let mut state = self.state.write().await;
        state.calls.push(call);
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }
        match state.failing_calls.get(call) {
            Some(error) => Err(clone_error(error)),
            None => Ok(()),
        }
    }
}

fn clone_error(error: &ApiError) -> ApiError {
    match error {
        ApiError::SessionExpired => ApiError::SessionExpired,
        ApiError::Http { status, message } => {
            ApiError::Http { status: *status, message: message.clone() }
        }
        ApiError::Decode(message) => ApiError::Decode(message.clone()),
        ApiError::Validation(error) => ApiError::Validation(error.clone()),
        ApiError::Domain(error) => ApiError::Domain(error.clone()),
        other => ApiError::Transport(other.to_string()),
    }
}

#[async_trait]
impl LeaveApi for FakeLeaveApi {
    async fn current_user(&self) -> Result<Approver, ApiError> {
        self.begin("current_user").await?;
        Ok(directory_entry(4, "Current User", false).approver)
    }

    async fn approvers_for_level(
        &self,
        level: ApprovalLevel,
        _date: NaiveDate,
    ) -> Result<Vec<DirectoryEntry>, ApiError> {
        self.begin("approvers_for_level").await?;
        Ok(self.state.read().await.directory.get(&level).cloned().unwrap_or_default())
    }

    async fn my_requests(&self) -> Result<Vec<LeaveRequest>, ApiError> {
        self.begin("my_requests").await?;
        Ok(self.state.read().await.mine.clone())
    }

    async fn submit_request(&self, draft: &LeaveRequestDraft) -> Result<LeaveRequest, ApiError> {
        self.begin("submit_request").await?;
        let mut state = self.state.write().await;
        let id = state.mine.len() as i64 + 1;
        let mut request = leave_request(id, id * 100, 1);
        request.leave_type_id = draft.leave_type_id;
        request.start_date = draft.start_date;
        request.end_date = draft.end_date;
        request.this_time_days = draft.this_time_days;
        request.reason = draft.reason.clone();
        state.mine.push(request.clone());
        Ok(request)
    }

    async fn pending_requests(
        &self,
        level: ApprovalLevel,
        queue: QueueIdentity,
    ) -> Result<Vec<LeaveRequest>, ApiError> {
        self.begin("pending_requests").await?;
        let state = self.state.read().await;
        Ok(state.pending.get(&(level, queue.proxy_for())).cloned().unwrap_or_default())
    }

    async fn submit_decision(&self, submission: &DecisionSubmission) -> Result<(), ApiError> {
        self.begin("submit_decision").await?;
        let mut state = self.state.write().await;
        state.decisions.push(submission.clone());
        for requests in state.pending.values_mut() {
            requests.retain(|request| !request.has_step(submission.detail_id));
        }
        Ok(())
    }

    async fn cancel_request(&self, id: LeaveRequestId, body: &CancelBody) -> Result<(), ApiError> {
        self.begin("cancel_request").await?;
        let mut state = self.state.write().await;
        state.cancels.push((id, body.remarks.clone()));
        for requests in state.pending.values_mut() {
            requests.retain(|request| request.id != id);
        }
        for request in state.mine.iter_mut().filter(|request| request.id == id) {
            request.status = LeaveStatus::Cancelled;
        }
        Ok(())
    }

    async fn proxy_approvals(&self) -> Result<Vec<ProxyApproval>, ApiError> {
        self.begin("proxy_approvals").await?;
        Ok(self.state.read().await.proxies.clone())
    }

    async fn create_proxy_approval(
        &self,
        draft: &ProxyApprovalDraft,
    ) -> Result<ProxyApproval, ApiError> {
        self.begin("create_proxy_approval").await?;
        let mut state = self.state.write().await;
        let created = proxy_from_draft(ProxyApprovalId(state.proxies.len() as i64 + 1), draft);
        state.proxies.push(created.clone());
        Ok(created)
    }

    async fn update_proxy_approval(
        &self,
        id: ProxyApprovalId,
        draft: &ProxyApprovalDraft,
    ) -> Result<ProxyApproval, ApiError> {
        self.begin("update_proxy_approval").await?;
        let mut state = self.state.write().await;
        let updated = proxy_from_draft(id, draft);
        match state.proxies.iter_mut().find(|grant| grant.id == id) {
            Some(grant) => {
                *grant = updated.clone();
                Ok(updated)
            }
            None => Err(ApiError::Http { status: 404, message: Some("not found".to_string()) }),
        }
    }

    async fn cancel_proxy_approval(&self, id: ProxyApprovalId) -> Result<(), ApiError> {
        self.begin("cancel_proxy_approval").await?;
        let mut state = self.state.write().await;
        for grant in state.proxies.iter_mut().filter(|grant| grant.id == id) {
            grant.status = ProxyStatus::Cancelled;
        }
        Ok(())
    }

    async fn departments(&self) -> Result<Vec<Department>, ApiError> {
        self.begin("departments").await?;
        Ok(self.state.read().await.reference.departments.clone())
    }

    async fn organizations(&self) -> Result<Vec<Organization>, ApiError> {
        self.begin("organizations").await?;
        Ok(self.state.read().await.reference.organizations.clone())
    }

    async fn leave_types(&self) -> Result<Vec<LeaveType>, ApiError> {
        self.begin("leave_types").await?;
        Ok(self.state.read().await.reference.leave_types.clone())
    }

    async fn holidays(&self) -> Result<Vec<Holiday>, ApiError> {
        self.begin("holidays").await?;
        Ok(self.state.read().await.reference.holidays.clone())
    }

    async fn audit_logs(&self, query: &AuditLogQuery) -> Result<AuditLogPage, ApiError> {
        self.begin("audit_logs").await?;
        let mut state = self.state.write().await;
        for _ in 0..state.audit_growth {
            let next = state.audit.last().map_or(1, |entry| entry.id + 1);
            let mut entry = state.audit.last().cloned().ok_or_else(|| {
                ApiError::Decode("audit growth needs a seed entry".to_string())
            })?;
            entry.id = next;
            state.audit.push(entry);
        }
        let per_page = query.per_page.max(1) as usize;
        let skip = (query.page.max(1) as usize - 1) * per_page;
        Ok(AuditLogPage {
            data: state.audit.iter().skip(skip).take(per_page).cloned().collect(),
            page: query.page,
            per_page: query.per_page,
            total: state.audit.len() as u64,
        })
    }

    async fn import_users(&self, upload: ImportUpload) -> Result<BulkImportReport, ApiError> {
        self.begin("import_users").await?;
        Ok(BulkImportReport {
            created_count: u32::from(!upload.bytes.is_empty()),
            failed_count: 0,
            created_users: None,
            failed_users: None,
        })
    }
}

fn proxy_from_draft(id: ProxyApprovalId, draft: &ProxyApprovalDraft) -> ProxyApproval {
    ProxyApproval {
        id,
        original_approver_id: draft.original_approver_id,
        proxy_approver_id: draft.proxy_approver_id,
        approver_level: draft.approver_level,
        window: draft.window,
        status: ProxyStatus::Active,
        reason: draft.reason.clone(),
    }
}

pub fn directory_entry(id: i64, name: &str, is_proxy: bool) -> DirectoryEntry {
    DirectoryEntry {
        approver: Approver {
            id: UserId(id),
            display_name: name.to_string(),
            roles: Default::default(),
            department: None,
            organization: None,
        },
        is_proxy,
    }
}

/// A pending request created on 2024-01-`day` with a single approval step.
pub fn leave_request(id: i64, detail_id: i64, day: u32) -> LeaveRequest {
    LeaveRequest {
        id: LeaveRequestId(id),
        requester: Requester {
            id: UserId(100 + id),
            prefix_name: None,
            first_name: format!("Staff{id}"),
            last_name: "Tester".to_string(),
            department: None,
            organization: None,
        },
        leave_type_id: 1,
        start_date: NaiveDate::from_ymd_opt(2024, 2, 1).expect("valid date"),
        end_date: NaiveDate::from_ymd_opt(2024, 2, 2).expect("valid date"),
        total_days: 10.0,
        this_time_days: 2.0,
        leaved_days: 0.0,
        reason: "personal".to_string(),
        status: LeaveStatus::Pending,
        created_at: Utc.with_ymd_and_hms(2024, 1, day, 3, 0, 0).single().expect("valid time"),
        document_number: None,
        files: Vec::new(),
        steps: vec![ApprovalStep {
            id: RequestDetailId(detail_id),
            reviewer_id: None,
            reviewer_name: None,
            level: Some(ApprovalLevel::DepartmentHead),
            remarks: None,
            status: LeaveStatus::Pending,
            reviewed_at: None,
        }],
    }
}
