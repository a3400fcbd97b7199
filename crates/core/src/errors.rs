use chrono::NaiveDate;
use thiserror::Error;

use crate::dispatch::Decision;
use crate::domain::approver::{ApprovalLevel, UserId};
use crate::domain::leave_request::RequestDetailId;
use crate::domain::proxy::ProxyApprovalId;

/// Shown when the backend gave no message of its own.
pub const GENERIC_FAILURE_MESSAGE: &str = "เกิดข้อผิดพลาด กรุณาลองใหม่อีกครั้ง";
pub const SESSION_EXPIRED_MESSAGE: &str = "เซสชันหมดอายุ กรุณาเข้าสู่ระบบใหม่";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown leave status `{0}`")]
    UnknownStatus(String),
    #[error("unknown role id {0}")]
    UnknownRole(u8),
    #[error("unknown approval level {0} (expected 1..=5)")]
    UnknownApprovalLevel(u8),
    #[error("approval step {detail_id} has no level")]
    MissingStepLevel { detail_id: RequestDetailId },
    #[error("approval level {level} appears more than once")]
    DuplicateStepLevel { level: ApprovalLevel },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Problems caught locally, before any request leaves the process.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("`{field}` is required")]
    MissingField { field: &'static str },
    #[error("remarks are required to {decision}")]
    MissingRemarks { decision: Decision },
    #[error("document receipt can only be confirmed at the verifier level, not level {level}")]
    ReceiptNotAllowed { level: ApprovalLevel },
    #[error("start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("user {user_id} cannot delegate to themselves")]
    SelfDelegation { user_id: UserId },
    #[error(
        "user {proxy_approver_id} already holds an active level {level} delegation overlapping these dates (#{existing_id})"
    )]
    DuplicateDelegation {
        proxy_approver_id: UserId,
        level: ApprovalLevel,
        existing_id: ProxyApprovalId,
    },
    #[error("expected {expected} file(s), got {actual}")]
    FileCount { expected: usize, actual: usize },
    #[error("`{file_name}` is not an Excel workbook (.xlsx or .xls)")]
    FileType { file_name: String },
    #[error("could not read `{file_name}`: {reason}")]
    UnreadableFile { file_name: String, reason: String },
    #[error("file size {size} bytes is outside 1..={max}")]
    FileSize { size: u64, max: u64 },
    #[error("invalid value `{value}` for filter `{field}`")]
    InvalidFilterValue { field: &'static str, value: String },
    #[error("page size must be greater than zero")]
    ZeroPageSize,
    #[error("leave duration must be positive, got {days}")]
    InvalidDuration { days: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("session expired or not signed in")]
    SessionExpired,
    #[error("backend returned {status}")]
    Backend { status: u16, message: Option<String> },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("incomplete result: {0}")]
    Incomplete(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("session expired")]
    SessionExpired { correlation_id: String },
    #[error("backend rejected the request: {message}")]
    Rejected { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    /// Text for the blocking alert: validation and backend messages verbatim,
    /// everything else the generic fallback.
    pub fn user_message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. } | Self::Rejected { message, .. } => message,
            Self::SessionExpired { .. } => SESSION_EXPIRED_MESSAGE,
            Self::Internal { .. } => GENERIC_FAILURE_MESSAGE,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::SessionExpired { correlation_id }
            | Self::Rejected { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }

    pub fn requires_login(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        match self {
            Self::Domain(error) => {
                InterfaceError::BadRequest { message: error.to_string(), correlation_id }
            }
            Self::Validation(error) => {
                InterfaceError::BadRequest { message: error.to_string(), correlation_id }
            }
            Self::SessionExpired => InterfaceError::SessionExpired { correlation_id },
            Self::Backend { message, .. } => InterfaceError::Rejected {
                message: message
                    .filter(|message| !message.trim().is_empty())
                    .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_owned()),
                correlation_id,
            },
            Self::Transport(_) => InterfaceError::Rejected {
                message: GENERIC_FAILURE_MESSAGE.to_owned(),
                correlation_id,
            },
            Self::Configuration(message) => InterfaceError::Internal { message, correlation_id },
            Self::Incomplete(message) => InterfaceError::Rejected { message, correlation_id },
        }
    }
}
