pub mod gmail_api;
pub mod query;
pub mod session;
