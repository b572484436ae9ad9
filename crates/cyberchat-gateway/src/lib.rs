//! Cyberchat gateway: the HTTP server sitting between chat clients and the
//! backend inference API.
//!
//! Exposed as a library so integration tests can drive the router directly.

pub mod app;
pub mod http;
pub mod upstream;

pub use app::{build_router, AppState};
