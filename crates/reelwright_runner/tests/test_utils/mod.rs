//! Test utilities for reelwright runner tests.
//!
//! This module provides a scripted mock of the remote service and snapshot
//! builders.

pub mod mock_run_api;

#[allow(unused_imports)]
pub use mock_run_api::MockRunApi;

use chrono::Utc;
use reelwright_core::{
    AudioProgress, FormattingProgress, ImageProgress, JobFailure, PhaseProgress,
    ReadinessProgress, RunEvent, StatusSnapshot, StepState, VideoSubState,
};
use tokio::sync::broadcast;

pub const JOB: &str = "job-1";
pub const CALLER: &str = "caller-1";

#[allow(dead_code)]
pub fn formatting(chunks_done: u32, chunks_total: u32) -> StatusSnapshot {
    StatusSnapshot::new(
        JOB,
        PhaseProgress::Formatting(FormattingProgress {
            chunks_done,
            chunks_total,
        }),
        Utc::now(),
    )
}

#[allow(dead_code)]
pub fn awaiting_ready(utterances_ready: bool, visible_count: u32) -> StatusSnapshot {
    StatusSnapshot::new(
        JOB,
        PhaseProgress::AwaitingReady(ReadinessProgress {
            utterances_ready,
            visible_count,
        }),
        Utc::now(),
    )
}

#[allow(dead_code)]
pub fn images(progress: ImageProgress) -> StatusSnapshot {
    StatusSnapshot::new(JOB, PhaseProgress::GeneratingImages(progress), Utc::now())
}

#[allow(dead_code)]
pub fn images_generating(generating: u32) -> StatusSnapshot {
    images(ImageProgress {
        state: StepState::Running,
        total: 6,
        completed: 2,
        generating,
        pending: 0,
        failed: 0,
    })
}

#[allow(dead_code)]
pub fn audio(state: StepState) -> StatusSnapshot {
    StatusSnapshot::new(
        JOB,
        PhaseProgress::GeneratingAudio(AudioProgress {
            state,
            total_utterances: 12,
            completed: 12,
            failed: 0,
        }),
        Utc::now(),
    )
}

#[allow(dead_code)]
pub fn ready(video: VideoSubState) -> StatusSnapshot {
    StatusSnapshot::new(JOB, PhaseProgress::Ready { video }, Utc::now())
}

#[allow(dead_code)]
pub fn failed(message: &str) -> StatusSnapshot {
    StatusSnapshot::new(JOB, PhaseProgress::Failed, Utc::now()).with_error(JobFailure::new(message))
}

/// Collect every event already delivered to `events`.
#[allow(dead_code)]
pub fn drain(events: &mut broadcast::Receiver<RunEvent>) -> Vec<RunEvent> {
    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    received
}
