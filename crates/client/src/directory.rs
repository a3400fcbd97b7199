//! Approver lookup for a level on a given date.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use leavedesk_core::domain::approver::{ApprovalLevel, DirectoryEntry};
use leavedesk_core::errors::InterfaceError;

use crate::api::LeaveApi;

/// Result of one lookup. A failed lookup never carries a partial list.
#[derive(Clone, Debug, Default)]
pub struct DirectoryLookup {
    entries: Vec<DirectoryEntry>,
    failure: Option<InterfaceError>,
}

impl DirectoryLookup {
    /// Entries in the order the backend returned them.
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<DirectoryEntry> {
        self.entries
    }

    /// People who hold the level's role themselves.
    pub fn direct(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.iter().filter(|entry| !entry.is_proxy)
    }

    /// People standing in for a holder on that date.
    pub fn proxies(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.iter().filter(|entry| entry.is_proxy)
    }

    pub fn failure(&self) -> Option<&InterfaceError> {
        self.failure.as_ref()
    }

    /// Text for the blocking alert when the lookup failed.
    pub fn alert(&self) -> Option<&str> {
        self.failure.as_ref().map(InterfaceError::user_message)
    }
}

pub struct DelegationDirectory {
    api: Arc<dyn LeaveApi>,
}

impl DelegationDirectory {
    pub fn new(api: Arc<dyn LeaveApi>) -> Self {
        Self { api }
    }

    pub async fn lookup(&self, level: ApprovalLevel, date: NaiveDate) -> DirectoryLookup {
        let correlation_id = Uuid::new_v4().to_string();
        match self.api.approvers_for_level(level, date).await {
            Ok(entries) => {
                info!(
                    event_name = "directory.lookup.completed",
                    correlation_id = %correlation_id,
                    level = level.number(),
                    date = %date,
                    count = entries.len(),
                    "approvers resolved"
                );
                DirectoryLookup { entries, failure: None }
            }
            Err(error) => {
                warn!(
                    event_name = "directory.lookup.failed",
                    correlation_id = %correlation_id,
                    level = level.number(),
                    date = %date,
                    error = %error,
                    "approver lookup failed"
                );
                DirectoryLookup {
                    entries: Vec::new(),
                    failure: Some(error.into_interface(correlation_id)),
                }
            }
        }
    }
}
