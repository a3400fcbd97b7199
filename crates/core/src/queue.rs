//! Whose approval queue a screen shows.
//!
//! The only input is the `proxy` query parameter of the current location.
//! Nothing here checks that the signed-in caller may act for the named
//! identity: that check belongs to the backend, which must refuse any
//! decision submitted on behalf of someone the caller does not stand in for.

use serde::Serialize;

use crate::domain::approver::UserId;

const PROXY_PARAM: &str = "proxy";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "user_id", rename_all = "snake_case")]
pub enum QueueIdentity {
    /// The caller's own role-derived queue, identified by the auth token.
    #[default]
    SelfQueue,
    ActingAsProxy(UserId),
}

impl QueueIdentity {
    pub fn target(self, caller: UserId) -> UserId {
        match self {
            Self::SelfQueue => caller,
            Self::ActingAsProxy(user_id) => user_id,
        }
    }

    pub fn proxy_for(self) -> Option<UserId> {
        match self {
            Self::SelfQueue => None,
            Self::ActingAsProxy(user_id) => Some(user_id),
        }
    }
}

/// Resolves a location such as `/approvals?proxy=11&tab=2` or a bare query
/// string. A missing or non-numeric `proxy` means the caller's own queue.
pub fn resolve_queue(location: &str) -> QueueIdentity {
    let location = location.trim();
    let query = location.split_once('?').map_or(location, |(_, query)| query);
    let query = query.split_once('#').map_or(query, |(query, _)| query);
    query
        .split('&')
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .find(|(key, _)| *key == PROXY_PARAM)
        .and_then(|(_, value)| value.trim().parse::<i64>().ok())
        .map_or(QueueIdentity::SelfQueue, |id| QueueIdentity::ActingAsProxy(UserId(id)))
}

/// Holds the resolved identity across navigations.
#[derive(Clone, Debug, Default)]
pub struct QueueSelector {
    current: QueueIdentity,
}

impl QueueSelector {
    pub fn new(query: &str) -> Self {
        Self { current: resolve_queue(query) }
    }

    pub fn current(&self) -> QueueIdentity {
        self.current
    }

    /// Re-evaluates after the location changed. Returns whether the queue
    /// identity changed, i.e. whether the list must be fetched again.
    pub fn navigate(&mut self, query: &str) -> bool {
        let next = resolve_queue(query);
        let changed = next != self.current;
        self.current = next;
        changed
    }
}
