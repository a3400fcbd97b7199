use thiserror::Error;

use leavedesk_core::errors::{ApplicationError, DomainError, InterfaceError, ValidationError};

use crate::session::SessionError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered 401. The stored session has already been cleared.
    #[error("session expired or not signed in")]
    SessionExpired,
    #[error("backend returned {status}")]
    Http { status: u16, message: Option<String> },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected response payload: {0}")]
    Decode(String),
    /// Paging stopped before the backend's reported total was reached.
    #[error("stopped after {fetched} of {total} entries; the backend kept reporting more pages")]
    Incomplete { fetched: usize, total: u64 },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ApiError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Whether the failure happened before anything was sent.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Domain(_))
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        ApplicationError::from(self).into_interface(correlation_id)
    }
}

impl From<ApiError> for ApplicationError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::SessionExpired => Self::SessionExpired,
            ApiError::Http { status, message } => Self::Backend { status, message },
            ApiError::Transport(message) => Self::Transport(message),
            ApiError::Decode(message) => Self::Transport(format!("decode: {message}")),
            incomplete @ ApiError::Incomplete { .. } => Self::Incomplete(incomplete.to_string()),
            ApiError::Validation(error) => Self::Validation(error),
            ApiError::Domain(error) => Self::Domain(error),
            ApiError::Session(error) => Self::Configuration(error.to_string()),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}
