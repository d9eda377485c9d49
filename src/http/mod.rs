//! HTTP token relay for the browser client
//!
//! This module provides the small REST surface backing the capture page:
//! - GET /get-token - Exchange local credentials for a speech API bearer token
//! - GET /health - Health check
//!
//! The endpoint itself carries no auth; it trusts a local-only deployment.

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
