//! Common utilities and shared types for vidtube.
//!
//! This crate provides foundational components used across all vidtube crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Media URLs**: Resolving stored relative media paths via [`absolutize_url`]
//!
//! # Example
//!
//! ```no_run
//! use vidtube_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Listening on {}:{}, generated ID: {}", config.server.host, config.server.port, id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod media;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use media::absolutize_url;
