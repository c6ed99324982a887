//! Run-progress orchestration engine.
//!
//! This crate drives a multi-phase generation job from the client side:
//!
//! - [`PollLoop`] polls a job's status on a fixed period and publishes
//!   [`reelwright_core::RunEvent`]s to subscribers.
//! - [`AdvanceEvaluator`] decides from each snapshot whether the job is due
//!   a nudge.
//! - [`AdvanceGate`] serializes and debounces advance requests per job.
//! - [`StaleDetector`] tracks how long a job has sat in one sub-state so
//!   orphaned generation markers can be recovered.
//! - [`ResumptionResolver`] decides which job to reattach to after a cold
//!   start.
//! - [`RunTracker`] ties the pieces together for a UI layer.
//!
//! # Example
//!
//! ```no_run
//! use reelwright_core::CallerContext;
//! use reelwright_interface::{RunApi, SystemClock};
//! use reelwright_runner::{ReelwrightConfig, RunTracker};
//! use std::sync::Arc;
//!
//! # async fn example(api: Arc<dyn RunApi>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = ReelwrightConfig::load()?;
//! let tracker = RunTracker::new(api, Arc::new(SystemClock), config.runner)?;
//!
//! let (action, events) = tracker.resume(&CallerContext::new("user-1"), None).await?;
//! println!("resume: {}", action.kind());
//! if let Some(mut events) = events {
//!     while let Ok(event) = events.recv().await {
//!         println!("{:?}", event);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod decision;
mod gate;
mod poll_loop;
mod resolver;
mod stale;
mod tracker;

pub use config::{ReelwrightConfig, RunnerConfig, RunnerConfigBuilder};
pub use decision::{AdvanceDecision, AdvanceEvaluator, AdvanceReason, IMAGES_GENERATING};
pub use gate::{Admission, AdvanceGate, GateResult, classify};
pub use poll_loop::{LoopStatus, PollLoop};
pub use resolver::ResumptionResolver;
pub use stale::{StaleDetector, StaleWatch};
pub use tracker::RunTracker;
