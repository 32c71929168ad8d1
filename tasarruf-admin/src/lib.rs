// Library interface for tasarruf-admin (used by the binary and the integration tests)
#[macro_use]
pub mod logging;

pub mod api;
pub mod associations;
pub mod auth;
pub mod config;
pub mod filters;
pub mod notify;
pub mod search;
pub mod session;
pub mod storage;
