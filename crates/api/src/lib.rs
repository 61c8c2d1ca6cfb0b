//! HTTP API layer for vidtube.
//!
//! This crate provides the REST API:
//!
//! - **Endpoints**: videos, comments, channels, users, search and auth
//! - **Extractors**: Authentication and pagination
//! - **Middleware**: Bearer token resolution and shared application state
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
