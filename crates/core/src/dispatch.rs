//! Packaging of reviewer decisions before they are sent.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::approver::{ApprovalLevel, UserId};
use crate::domain::leave_request::RequestDetailId;
use crate::errors::ValidationError;
use crate::queue::QueueIdentity;

/// Remark sent when an approver confirms without typing one.
pub const DEFAULT_APPROVAL_REMARK: &str = "เห็นสมควรอนุมัติ โปรดพิจารณา";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
    /// Document receiver confirms the paperwork arrived.
    ApproveReceipt,
}

impl Decision {
    /// Trailing path segment of the decision endpoint.
    pub fn action(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::ApproveReceipt => "receipt",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::ApproveReceipt => "confirm receipt",
        })
    }
}

impl FromStr for Decision {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            "receipt" | "approve_receipt" => Ok(Self::ApproveReceipt),
            _ => Err(ValidationError::InvalidFilterValue {
                field: "decision",
                value: value.to_string(),
            }),
        }
    }
}

/// How blank remarks are treated at a level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemarksPolicy {
    /// The reviewer must type something before submitting.
    Required,
    /// Blank approvals carry [`DEFAULT_APPROVAL_REMARK`]. Rejections still
    /// need a reason.
    #[default]
    DefaultWhenBlank,
}

impl RemarksPolicy {
    /// Department heads decide in a modal that insists on remarks; the
    /// later levels confirm from the list.
    pub fn for_level(level: ApprovalLevel) -> Self {
        match level {
            ApprovalLevel::DepartmentHead => Self::Required,
            _ => Self::DefaultWhenBlank,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionDraft {
    pub detail_id: RequestDetailId,
    pub level: ApprovalLevel,
    pub decision: Decision,
    pub remarks: Option<String>,
    pub queue: QueueIdentity,
}

/// A decision that passed local checks and is ready to send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionSubmission {
    pub detail_id: RequestDetailId,
    pub level: ApprovalLevel,
    pub decision: Decision,
    pub body: DecisionBody,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionBody {
    pub remarks: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_for: Option<UserId>,
}

impl DecisionDraft {
    pub fn prepare(self, policy: RemarksPolicy) -> Result<DecisionSubmission, ValidationError> {
        if self.decision == Decision::ApproveReceipt && self.level != ApprovalLevel::Verifier {
            return Err(ValidationError::ReceiptNotAllowed { level: self.level });
        }

        let typed = self
            .remarks
            .map(|remarks| remarks.trim().to_string())
            .filter(|remarks| !remarks.is_empty());
        let remarks = match (typed, self.decision, policy) {
            (Some(remarks), _, _) => remarks,
            (None, Decision::Reject, _) | (None, _, RemarksPolicy::Required) => {
                return Err(ValidationError::MissingRemarks { decision: self.decision });
            }
            (None, _, RemarksPolicy::DefaultWhenBlank) => DEFAULT_APPROVAL_REMARK.to_string(),
        };

        Ok(DecisionSubmission {
            detail_id: self.detail_id,
            level: self.level,
            decision: self.decision,
            body: DecisionBody { remarks, proxy_for: self.queue.proxy_for() },
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelBody {
    pub remarks: String,
}

impl CancelBody {
    pub fn new(remarks: Option<&str>) -> Result<Self, ValidationError> {
        let remarks = remarks.map(str::trim).filter(|remarks| !remarks.is_empty());
        match remarks {
            Some(remarks) => Ok(Self { remarks: remarks.to_string() }),
            None => Err(ValidationError::MissingField { field: "remarks" }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CancelBody, Decision, DecisionDraft, RemarksPolicy, DEFAULT_APPROVAL_REMARK};
    use crate::domain::approver::{ApprovalLevel, UserId};
    use crate::domain::leave_request::RequestDetailId;
    use crate::errors::ValidationError;
    use crate::queue::QueueIdentity;

    fn draft(level: ApprovalLevel, decision: Decision, remarks: Option<&str>) -> DecisionDraft {
        DecisionDraft {
            detail_id: RequestDetailId(77),
            level,
            decision,
            remarks: remarks.map(str::to_string),
            queue: QueueIdentity::SelfQueue,
        }
    }

    #[test]
    fn blank_approval_gets_canned_remark_when_policy_allows() {
        let submission = draft(ApprovalLevel::Approver3, Decision::Approve, Some("   "))
            .prepare(RemarksPolicy::DefaultWhenBlank)
            .expect("approval should be prepared");

        assert_eq!(submission.body.remarks, DEFAULT_APPROVAL_REMARK);
        assert_eq!(submission.body.proxy_for, None);
    }

    #[test]
    fn required_policy_blocks_blank_approval() {
        let error = draft(ApprovalLevel::DepartmentHead, Decision::Approve, None)
            .prepare(RemarksPolicy::for_level(ApprovalLevel::DepartmentHead))
            .expect_err("blank remarks should be rejected");

        assert_eq!(error, ValidationError::MissingRemarks { decision: Decision::Approve });
    }

    #[test]
    fn rejection_always_needs_a_reason() {
        let error = draft(ApprovalLevel::Approver2, Decision::Reject, Some(""))
            .prepare(RemarksPolicy::DefaultWhenBlank)
            .expect_err("blank rejection should be blocked");

        assert_eq!(error, ValidationError::MissingRemarks { decision: Decision::Reject });
    }

    #[test]
    fn typed_remarks_are_trimmed_and_kept() {
        let submission = draft(ApprovalLevel::Approver2, Decision::Reject, Some("  ไม่ครบ  "))
            .prepare(RemarksPolicy::Required)
            .expect("rejection with reason should be prepared");

        assert_eq!(submission.body.remarks, "ไม่ครบ");
        assert_eq!(submission.decision.action(), "reject");
    }

    #[test]
    fn receipt_is_only_valid_at_verifier_level() {
        assert!(draft(ApprovalLevel::Verifier, Decision::ApproveReceipt, None)
            .prepare(RemarksPolicy::DefaultWhenBlank)
            .is_ok());

        assert_eq!(
            draft(ApprovalLevel::Approver4, Decision::ApproveReceipt, Some("ok"))
                .prepare(RemarksPolicy::DefaultWhenBlank),
            Err(ValidationError::ReceiptNotAllowed { level: ApprovalLevel::Approver4 })
        );
    }

    #[test]
    fn proxy_queue_is_carried_in_the_body() {
        let mut acting = draft(ApprovalLevel::Approver2, Decision::Approve, Some("ok"));
        acting.queue = QueueIdentity::ActingAsProxy(UserId(11));

        let submission = acting.prepare(RemarksPolicy::DefaultWhenBlank).expect("prepared");
        let body = serde_json::to_value(&submission.body).expect("body should encode");
        assert_eq!(body["proxyFor"], 11);
        assert_eq!(body["remarks"], "ok");
    }

    #[test]
    fn cancel_requires_remarks() {
        assert_eq!(
            CancelBody::new(Some(" ")),
            Err(ValidationError::MissingField { field: "remarks" })
        );
        assert_eq!(CancelBody::new(Some("duplicate")).map(|b| b.remarks), Ok("duplicate".into()));
    }
}
