//! Core data types for the reelwright run-progress engine.
//!
//! This crate provides the value types shared by every reelwright crate: the
//! phases of a generation run, the progress snapshot returned by each status
//! poll, the handle identifying a tracked job, and the events the engine
//! emits to its UI-layer subscribers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod advance;
mod event;
mod job;
mod phase;
mod progress;
mod resume;
mod snapshot;

pub use advance::{AdvanceResult, NudgeOutcome};
pub use event::{RunEvent, StopReason};
pub use job::{CallerContext, JobHandle, JobId};
pub use phase::Phase;
pub use progress::{
    AudioProgress, FormattingProgress, ImageProgress, PhaseProgress, ReadinessProgress,
    StepState, VideoSubState,
};
pub use resume::{ResumeAction, ResumeKind};
pub use snapshot::{
    ConfirmedConfig, ConfirmedConfigBuilder, JobFailure, StatusSnapshot,
};
