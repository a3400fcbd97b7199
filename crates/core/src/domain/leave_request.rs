use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::approver::{ApprovalLevel, UserId};
use crate::errors::{DomainError, ValidationError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaveRequestId(pub i64);

/// Identifier of one approval step ("leave request detail") on the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestDetailId(pub i64);

impl fmt::Display for LeaveRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RequestDetailId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl FromStr for LeaveStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "CANCELLED" | "CANCELED" => Ok(Self::Cancelled),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requester {
    pub id: UserId,
    #[serde(default)]
    pub prefix_name: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
}

impl Requester {
    pub fn full_name(&self) -> String {
        let prefix = self.prefix_name.as_deref().unwrap_or("");
        format!("{prefix}{} {}", self.first_name, self.last_name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedFile {
    pub file_name: String,
    pub file_path: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalStep {
    pub id: RequestDetailId,
    #[serde(default)]
    pub reviewer_id: Option<UserId>,
    #[serde(default)]
    pub reviewer_name: Option<String>,
    /// Backends that predate explicit levels omit this; such steps cannot be
    /// placed in an [`ApprovalChain`].
    #[serde(default)]
    pub level: Option<ApprovalLevel>,
    #[serde(default)]
    pub remarks: Option<String>,
    pub status: LeaveStatus,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub id: LeaveRequestId,
    pub requester: Requester,
    pub leave_type_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub total_days: f64,
    #[serde(default)]
    pub this_time_days: f64,
    #[serde(default)]
    pub leaved_days: f64,
    #[serde(default)]
    pub reason: String,
    pub status: LeaveStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub document_number: Option<String>,
    #[serde(default)]
    pub files: Vec<AttachedFile>,
    #[serde(default, rename = "leaveRequestDetails")]
    pub steps: Vec<ApprovalStep>,
}

impl LeaveRequest {
    pub fn approval_chain(&self) -> Result<ApprovalChain, DomainError> {
        ApprovalChain::from_steps(&self.steps)
    }

    pub fn has_step(&self, detail_id: RequestDetailId) -> bool {
        self.steps.iter().any(|step| step.id == detail_id)
    }

    pub fn first_step(&self) -> Option<&ApprovalStep> {
        self.steps.first()
    }
}

/// Approval steps keyed by the level that recorded them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApprovalChain {
    steps: BTreeMap<ApprovalLevel, ApprovalStep>,
}

impl ApprovalChain {
    pub fn from_steps(steps: &[ApprovalStep]) -> Result<Self, DomainError> {
        let mut by_level = BTreeMap::new();
        for step in steps {
            let level = step.level.ok_or(DomainError::MissingStepLevel { detail_id: step.id })?;
            if by_level.insert(level, step.clone()).is_some() {
                return Err(DomainError::DuplicateStepLevel { level });
            }
        }
        Ok(Self { steps: by_level })
    }

    pub fn step(&self, level: ApprovalLevel) -> Option<&ApprovalStep> {
        self.steps.get(&level)
    }

    /// Lowest level still waiting for a decision.
    pub fn pending_step(&self) -> Option<&ApprovalStep> {
        self.steps.values().find(|step| step.status == LeaveStatus::Pending)
    }

    pub fn is_complete(&self) -> bool {
        !self.steps.is_empty() && self.steps.values().all(|step| step.status.is_terminal())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ApprovalLevel, &ApprovalStep)> {
        self.steps.iter()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequestDraft {
    pub leave_type_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub this_time_days: f64,
    pub reason: String,
}

impl LeaveRequestDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.start_date > self.end_date {
            return Err(ValidationError::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if !(self.this_time_days.is_finite() && self.this_time_days > 0.0) {
            return Err(ValidationError::InvalidDuration { days: self.this_time_days.to_string() });
        }
        if self.reason.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "reason" });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{
        ApprovalChain, ApprovalStep, LeaveRequest, LeaveRequestDraft, LeaveRequestId, LeaveStatus,
        RequestDetailId,
    };
    use crate::domain::approver::{ApprovalLevel, UserId};
    use crate::errors::{DomainError, ValidationError};

    fn step(id: i64, level: Option<ApprovalLevel>, status: LeaveStatus) -> ApprovalStep {
        ApprovalStep {
            id: RequestDetailId(id),
            reviewer_id: None,
            reviewer_name: None,
            level,
            remarks: None,
            status,
            reviewed_at: None,
        }
    }

    #[test]
    fn chain_is_keyed_by_explicit_level_not_position() {
        let steps = vec![
            step(30, Some(ApprovalLevel::Approver2), LeaveStatus::Pending),
            step(10, Some(ApprovalLevel::DepartmentHead), LeaveStatus::Approved),
            step(20, Some(ApprovalLevel::Verifier), LeaveStatus::Approved),
        ];

        let chain = ApprovalChain::from_steps(&steps).expect("chain should build");
        assert_eq!(chain.step(ApprovalLevel::Verifier).map(|s| s.id), Some(RequestDetailId(20)));
        assert_eq!(chain.pending_step().map(|s| s.id), Some(RequestDetailId(30)));
        assert!(!chain.is_complete());
    }

    #[test]
    fn chain_rejects_steps_without_level() {
        let steps = vec![step(7, None, LeaveStatus::Pending)];
        assert_eq!(
            ApprovalChain::from_steps(&steps),
            Err(DomainError::MissingStepLevel { detail_id: RequestDetailId(7) })
        );
    }

    #[test]
    fn chain_rejects_duplicate_levels() {
        let steps = vec![
            step(1, Some(ApprovalLevel::Verifier), LeaveStatus::Approved),
            step(2, Some(ApprovalLevel::Verifier), LeaveStatus::Pending),
        ];
        assert_eq!(
            ApprovalChain::from_steps(&steps),
            Err(DomainError::DuplicateStepLevel { level: ApprovalLevel::Verifier })
        );
    }

    #[test]
    fn status_parses_both_cancel_spellings() {
        assert_eq!("cancelled".parse::<LeaveStatus>(), Ok(LeaveStatus::Cancelled));
        assert_eq!("CANCELED".parse::<LeaveStatus>(), Ok(LeaveStatus::Cancelled));
        assert!("archived".parse::<LeaveStatus>().is_err());
    }

    #[test]
    fn deserializes_backend_payload() {
        let raw = r#"{
            "id": 41,
            "requester": {"id": 5, "prefixName": "ดร.", "firstName": "Somchai", "lastName": "Dee"},
            "leaveTypeId": 2,
            "startDate": "2024-01-08",
            "endDate": "2024-01-09",
            "totalDays": 10,
            "thisTimeDays": 2,
            "leavedDays": 3.5,
            "reason": "family",
            "status": "PENDING",
            "createdAt": "2024-01-05T03:00:00Z",
            "leaveRequestDetails": [
                {"id": 900, "level": 1, "status": "PENDING"}
            ]
        }"#;

        let request: LeaveRequest = serde_json::from_str(raw).expect("payload should decode");
        assert_eq!(request.id, LeaveRequestId(41));
        assert_eq!(request.requester.id, UserId(5));
        assert_eq!(request.requester.full_name(), "ดร.Somchai Dee");
        assert_eq!(request.start_date, NaiveDate::from_ymd_opt(2024, 1, 8).expect("date"));
        assert_eq!(
            request.created_at,
            Utc.with_ymd_and_hms(2024, 1, 5, 3, 0, 0).single().expect("timestamp")
        );
        assert_eq!(request.first_step().and_then(|s| s.level), Some(ApprovalLevel::DepartmentHead));
        assert!(request.has_step(RequestDetailId(900)));
        assert!(request.document_number.is_none());
    }

    #[test]
    fn draft_validation_catches_range_duration_and_reason() {
        let date = |day| NaiveDate::from_ymd_opt(2024, 4, day).expect("valid date");
        let mut draft = LeaveRequestDraft {
            leave_type_id: 1,
            start_date: date(3),
            end_date: date(2),
            this_time_days: 1.0,
            reason: "ธุระส่วนตัว".to_string(),
        };
        assert!(matches!(draft.validate(), Err(ValidationError::InvalidDateRange { .. })));

        draft.end_date = date(4);
        draft.this_time_days = 0.0;
        assert!(matches!(draft.validate(), Err(ValidationError::InvalidDuration { .. })));

        draft.this_time_days = 1.5;
        draft.reason = "  ".to_string();
        assert_eq!(draft.validate(), Err(ValidationError::MissingField { field: "reason" }));

        draft.reason = "ธุระส่วนตัว".to_string();
        assert_eq!(draft.validate(), Ok(()));
    }
}
