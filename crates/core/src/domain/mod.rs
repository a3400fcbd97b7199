pub mod approver;
pub mod import;
pub mod leave_request;
pub mod proxy;
pub mod reference;
