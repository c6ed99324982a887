//! Error types for the reelwright run-progress engine.
//!
//! This crate provides the foundation error types used throughout the reelwright workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use reelwright_error::{ApiError, ApiErrorKind, ReelwrightResult};
//!
//! fn fetch_status() -> ReelwrightResult<String> {
//!     Err(ApiError::new(ApiErrorKind::Transport("connection reset".into())))?
//! }
//!
//! match fetch_status() {
//!     Ok(status) => println!("Got: {}", status),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod api;
mod config;
mod error;
mod run_loop;
mod snapshot;

pub use api::{ApiError, ApiErrorKind, ApiResult};
pub use config::ConfigError;
pub use error::{ReelwrightError, ReelwrightErrorKind, ReelwrightResult};
pub use run_loop::{LoopError, LoopErrorKind};
pub use snapshot::{SnapshotError, SnapshotErrorKind};
