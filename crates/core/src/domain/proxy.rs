use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::approver::{ApprovalLevel, UserId};
use crate::errors::ValidationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProxyApprovalId(pub i64);

impl fmt::Display for ProxyApprovalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProxyStatus {
    Active,
    Expired,
    Cancelled,
}

/// Days on which a delegation grants authority. Both ends are inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DelegationWindow {
    #[serde(rename_all = "camelCase")]
    Daily { daily_date: NaiveDate },
    #[serde(rename_all = "camelCase")]
    Range { start_date: NaiveDate, end_date: NaiveDate },
}

impl DelegationWindow {
    pub fn daily(date: NaiveDate) -> Self {
        Self::Daily { daily_date: date }
    }

    pub fn range(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self::Range { start_date, end_date }
    }

    pub fn start(&self) -> NaiveDate {
        match self {
            Self::Daily { daily_date } => *daily_date,
            Self::Range { start_date, .. } => *start_date,
        }
    }

    pub fn end(&self) -> NaiveDate {
        match self {
            Self::Daily { daily_date } => *daily_date,
            Self::Range { end_date, .. } => *end_date,
        }
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start() <= date && date <= self.end()
    }

    pub fn overlaps(&self, other: &DelegationWindow) -> bool {
        self.start() <= other.end() && other.start() <= self.end()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyApproval {
    pub id: ProxyApprovalId,
    pub original_approver_id: UserId,
    pub proxy_approver_id: UserId,
    pub approver_level: ApprovalLevel,
    #[serde(flatten)]
    pub window: DelegationWindow,
    pub status: ProxyStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

impl ProxyApproval {
    /// Status as stored; expiry is evaluated by the backend, not here.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.status == ProxyStatus::Active && self.window.covers(date)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyApprovalDraft {
    pub original_approver_id: UserId,
    pub proxy_approver_id: UserId,
    pub approver_level: ApprovalLevel,
    #[serde(flatten)]
    pub window: DelegationWindow,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ProxyApprovalDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.window.start() > self.window.end() {
            return Err(ValidationError::InvalidDateRange {
                start: self.window.start(),
                end: self.window.end(),
            });
        }
        if self.original_approver_id == self.proxy_approver_id {
            return Err(ValidationError::SelfDelegation { user_id: self.proxy_approver_id });
        }
        Ok(())
    }

    /// Best-effort duplicate check run before submission. The backend
    /// remains authoritative and may still reject the draft.
    pub fn conflicts<'a>(&self, existing: &'a [ProxyApproval]) -> Vec<&'a ProxyApproval> {
        existing
            .iter()
            .filter(|grant| grant.status == ProxyStatus::Active)
            .filter(|grant| grant.proxy_approver_id == self.proxy_approver_id)
            .filter(|grant| grant.approver_level == self.approver_level)
            .filter(|grant| grant.window.overlaps(&self.window))
            .collect()
    }

    pub fn check_against(&self, existing: &[ProxyApproval]) -> Result<(), ValidationError> {
        self.validate()?;
        match self.conflicts(existing).first() {
            Some(conflict) => Err(ValidationError::DuplicateDelegation {
                proxy_approver_id: self.proxy_approver_id,
                level: self.approver_level,
                existing_id: conflict.id,
            }),
            None => Ok(()),
        }
    }
}
