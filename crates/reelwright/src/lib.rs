//! Reelwright - client-side orchestration of story-to-video generation runs
//!
//! A generation job moves through formatting, readiness, image generation and
//! audio generation before it is ready, with an optional video rendered on
//! top. Reelwright watches such a job from the client: it polls the remote
//! service, nudges the job forward when a step is due, recovers work that
//! crashed mid-step, and reattaches to the right job after a page reload.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use reelwright::{CallerContext, ReelwrightConfig, RunTracker, SystemClock};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     reelwright::init_observability()?;
//!
//!     let api = Arc::new(MyRunService::connect().await?);
//!     let config = ReelwrightConfig::load()?;
//!     let tracker = RunTracker::new(api, Arc::new(SystemClock), config.runner)?;
//!
//!     let (action, events) = tracker.resume(&CallerContext::new("user-1"), None).await?;
//!     println!("resume: {}", action.kind());
//!     if let Some(mut events) = events {
//!         while let Ok(event) = events.recv().await {
//!             println!("{:?}", event);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! Reelwright is organized as a workspace with focused crates:
//!
//! - `reelwright_error` - Error types
//! - `reelwright_core` - Phases, snapshots, events and resume actions
//! - `reelwright_interface` - `RunApi` and `Clock` traits
//! - `reelwright_runner` - Poll loop, advance gate, stale detection, resumption
//!
//! This crate (`reelwright`) re-exports everything for convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub use reelwright_core::*;
pub use reelwright_error::*;
pub use reelwright_interface::*;
pub use reelwright_runner::*;

mod observability;

pub use observability::{ObservabilityConfig, init_observability, init_observability_with_config};
