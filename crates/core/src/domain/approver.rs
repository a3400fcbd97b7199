use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role bindings as numbered by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Role {
    User,
    Admin,
    Verifier,
    /// Department head.
    Approver1,
    Approver2,
    Approver3,
    Approver4,
}

impl Role {
    pub fn id(self) -> u8 {
        match self {
            Self::User => 1,
            Self::Admin => 2,
            Self::Verifier => 3,
            Self::Approver1 => 4,
            Self::Approver2 => 5,
            Self::Approver3 => 6,
            Self::Approver4 => 7,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::User),
            2 => Some(Self::Admin),
            3 => Some(Self::Verifier),
            4 => Some(Self::Approver1),
            5 => Some(Self::Approver2),
            6 => Some(Self::Approver3),
            7 => Some(Self::Approver4),
            _ => None,
        }
    }

    pub fn approval_level(self) -> Option<ApprovalLevel> {
        ApprovalLevel::ALL.into_iter().find(|level| level.role() == self)
    }
}

impl TryFrom<u8> for Role {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_id(value).ok_or(DomainError::UnknownRole(value))
    }
}

impl From<Role> for u8 {
    fn from(role: Role) -> Self {
        role.id()
    }
}

/// The five ordered positions of the review chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ApprovalLevel {
    DepartmentHead,
    /// Also receives the paper documents and confirms their receipt.
    Verifier,
    Approver2,
    Approver3,
    Approver4,
}

impl ApprovalLevel {
    pub const ALL: [ApprovalLevel; 5] = [
        Self::DepartmentHead,
        Self::Verifier,
        Self::Approver2,
        Self::Approver3,
        Self::Approver4,
    ];

    pub fn number(self) -> u8 {
        match self {
            Self::DepartmentHead => 1,
            Self::Verifier => 2,
            Self::Approver2 => 3,
            Self::Approver3 => 4,
            Self::Approver4 => 5,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.number() == number)
    }

    pub fn role(self) -> Role {
        match self {
            Self::DepartmentHead => Role::Approver1,
            Self::Verifier => Role::Verifier,
            Self::Approver2 => Role::Approver2,
            Self::Approver3 => Role::Approver3,
            Self::Approver4 => Role::Approver4,
        }
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }
}

impl TryFrom<u8> for ApprovalLevel {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_number(value).ok_or(DomainError::UnknownApprovalLevel(value))
    }
}

impl From<ApprovalLevel> for u8 {
    fn from(level: ApprovalLevel) -> Self {
        level.number()
    }
}

impl std::str::FromStr for ApprovalLevel {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let number = value
            .trim()
            .parse::<u8>()
            .map_err(|_| DomainError::InvariantViolation(format!("`{value}` is not a level")))?;
        Self::try_from(number)
    }
}

impl fmt::Display for ApprovalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approver {
    pub id: UserId,
    pub display_name: String,
    #[serde(default)]
    pub roles: BTreeSet<Role>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
}

impl Approver {
    pub fn holds(&self, level: ApprovalLevel) -> bool {
        self.roles.contains(&level.role())
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    /// Levels this identity reviews directly, lowest first.
    pub fn levels(&self) -> Vec<ApprovalLevel> {
        self.roles.iter().filter_map(|role| role.approval_level()).collect()
    }
}

/// One row of the approver directory for a level and date. `is_proxy` is
/// computed by the backend and taken as given.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    #[serde(flatten)]
    pub approver: Approver,
    #[serde(default)]
    pub is_proxy: bool,
}
