//! REST API server module.
//!
//! HTTP endpoints for the telephony gateway hooks (inbound SMS and calls),
//! outbound SMS, message history and the web client's secret check.

pub mod error;
pub mod models;
pub mod openapi;
pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState};
