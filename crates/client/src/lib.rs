pub mod api;
pub mod audit;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod import;
pub mod inbox;
pub mod proxy;
pub mod reference;
pub mod session;

#[cfg(test)]
mod testing;

pub use api::{HttpLeaveApi, LeaveApi};
pub use audit::fetch_all_audit_logs;
pub use directory::{DelegationDirectory, DirectoryLookup};
pub use dispatcher::{ActionDispatcher, DispatchOutcome, ListSource, ReconcileMode};
pub use error::ApiError;
pub use http::{ApiClient, REQUEST_ID_HEADER};
pub use import::ImportUpload;
pub use inbox::{load_history, ApprovalInbox};
pub use proxy::ProxyDesk;
pub use reference::{load_holiday_calendar, load_reference_data};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionError, SessionStore};
