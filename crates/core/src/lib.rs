//! Core business logic for vidtube.

pub mod services;

pub use services::*;
