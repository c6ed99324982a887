//! Events emitted to UI-layer subscribers.

use crate::{JobId, NudgeOutcome, Phase, StatusSnapshot};
use serde::{Deserialize, Serialize};

/// Why a poll loop stopped.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StopReason {
    /// The job failed and no retry was requested.
    JobFailed,
    /// The job was canceled.
    JobCanceled,
    /// The job is ready and its video finished or failed.
    VideoSettled,
    /// The job is ready, no video was requested, and the grace window elapsed.
    VideoGraceElapsed,
    /// The job no longer exists server-side.
    JobMissing,
    /// The owner stopped or detached the loop.
    Requested,
}

/// Everything a poll loop reports to its subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    /// A new snapshot was fetched.
    SnapshotUpdated {
        /// The snapshot.
        snapshot: StatusSnapshot,
    },
    /// The job moved between phases.
    PhaseTransitioned {
        /// Job that moved.
        job_id: JobId,
        /// Phase before.
        from: Phase,
        /// Phase after.
        to: Phase,
        /// Short reason code.
        reason: String,
    },
    /// A sub-state persisted past the stale threshold.
    StalledDetected {
        /// Stalled job.
        job_id: JobId,
        /// Sub-state key that stalled.
        sub_state: String,
        /// Seconds spent in the sub-state.
        elapsed_secs: u64,
    },
    /// The loop stopped and will not tick again.
    LoopStopped {
        /// Job whose loop stopped.
        job_id: JobId,
        /// Why it stopped.
        reason: StopReason,
    },
    /// A status fetch failed transiently.
    FetchFailed {
        /// Job being polled.
        job_id: JobId,
        /// Failures since the last successful fetch.
        consecutive_failures: u32,
        /// Error description.
        message: String,
    },
    /// A nudge finished.
    NudgeCompleted {
        /// Nudged job.
        job_id: JobId,
        /// Classified outcome.
        outcome: NudgeOutcome,
    },
}

impl RunEvent {
    /// Job the event concerns.
    pub fn job_id(&self) -> &JobId {
        match self {
            Self::SnapshotUpdated { snapshot } => snapshot.job_id(),
            Self::PhaseTransitioned { job_id, .. }
            | Self::StalledDetected { job_id, .. }
            | Self::LoopStopped { job_id, .. }
            | Self::FetchFailed { job_id, .. }
            | Self::NudgeCompleted { job_id, .. } => job_id,
        }
    }
}
