pub mod audit;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod query;
pub mod queue;

pub use audit::{export_csv, AuditLogEntry, AuditLogPage, AuditLogQuery};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use dispatch::{
    CancelBody, Decision, DecisionBody, DecisionDraft, DecisionSubmission, RemarksPolicy,
    DEFAULT_APPROVAL_REMARK,
};
pub use domain::approver::{ApprovalLevel, Approver, DirectoryEntry, Role, UserId};
pub use domain::import::{check_upload, BulkImportReport, ImportSummary, MAX_IMPORT_FILE_BYTES};
pub use domain::leave_request::{
    ApprovalChain, ApprovalStep, LeaveRequest, LeaveRequestDraft, LeaveRequestId, LeaveStatus,
    RequestDetailId, Requester,
};
pub use domain::proxy::{
    DelegationWindow, ProxyApproval, ProxyApprovalDraft, ProxyApprovalId, ProxyStatus,
};
pub use domain::reference::{
    Department, Holiday, HolidayCalendar, LeaveType, Organization, ReferenceData,
};
pub use errors::{
    ApplicationError, DomainError, InterfaceError, ValidationError, GENERIC_FAILURE_MESSAGE,
};
pub use query::{filter_and_sort, paginate, Page, PageSize, RequestFilter, RequestView, SortOrder};
pub use queue::{resolve_queue, QueueIdentity, QueueSelector};
