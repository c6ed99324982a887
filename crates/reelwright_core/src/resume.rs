//! Outcome of reattaching to a job after a cold start.

use crate::{JobHandle, JobId, Phase, StatusSnapshot, VideoSubState};
use serde::{Deserialize, Serialize};

/// UI-facing classification of a resume attempt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ResumeKind {
    /// No job to resume.
    Idle,
    /// The caller's active job.
    Attach,
    /// A ready job.
    ResumeReady,
    /// A failed job.
    ResumeFailed,
    /// A canceled job.
    ResumeCanceled,
    /// A job in any other phase.
    ResumeOther,
    /// The job does not exist.
    NotFound,
    /// The job belongs to someone else.
    Forbidden,
}

/// Normalized result of resolving which job to attach to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ResumeAction {
    /// No active job and no explicit id.
    Idle,
    /// Attach to the caller's active job and resume polling.
    Attach {
        /// Active job.
        handle: JobHandle,
        /// Its current status.
        snapshot: StatusSnapshot,
    },
    /// Explicit job found in the ready phase.
    ResumeReady {
        /// Job handle.
        handle: JobHandle,
        /// Its current status, video sub-state included.
        snapshot: StatusSnapshot,
    },
    /// Explicit job found in the failed phase.
    ResumeFailed {
        /// Job handle.
        handle: JobHandle,
        /// Its current status, error payload included.
        snapshot: StatusSnapshot,
    },
    /// Explicit job found in the canceled phase.
    ResumeCanceled {
        /// Job handle.
        handle: JobHandle,
        /// Its current status.
        snapshot: StatusSnapshot,
    },
    /// Explicit job found in a working phase.
    ResumeOther {
        /// Job handle.
        handle: JobHandle,
        /// Its current status.
        snapshot: StatusSnapshot,
    },
    /// The job was deleted or never existed.
    NotFound {
        /// Requested id.
        job_id: JobId,
    },
    /// The job exists but is not owned by the caller.
    Forbidden {
        /// Requested id.
        job_id: JobId,
    },
}

impl ResumeAction {
    /// Classify an explicitly looked-up job by its phase.
    pub fn from_lookup(handle: JobHandle, snapshot: StatusSnapshot) -> Self {
        match snapshot.phase() {
            Phase::Ready => Self::ResumeReady { handle, snapshot },
            Phase::Failed => Self::ResumeFailed { handle, snapshot },
            Phase::Canceled => Self::ResumeCanceled { handle, snapshot },
            _ => Self::ResumeOther { handle, snapshot },
        }
    }

    /// Discriminant without payload.
    pub fn kind(&self) -> ResumeKind {
        match self {
            Self::Idle => ResumeKind::Idle,
            Self::Attach { .. } => ResumeKind::Attach,
            Self::ResumeReady { .. } => ResumeKind::ResumeReady,
            Self::ResumeFailed { .. } => ResumeKind::ResumeFailed,
            Self::ResumeCanceled { .. } => ResumeKind::ResumeCanceled,
            Self::ResumeOther { .. } => ResumeKind::ResumeOther,
            Self::NotFound { .. } => ResumeKind::NotFound,
            Self::Forbidden { .. } => ResumeKind::Forbidden,
        }
    }

    /// Handle of the resolved job, if one was found.
    pub fn handle(&self) -> Option<&JobHandle> {
        match self {
            Self::Attach { handle, .. }
            | Self::ResumeReady { handle, .. }
            | Self::ResumeFailed { handle, .. }
            | Self::ResumeCanceled { handle, .. }
            | Self::ResumeOther { handle, .. } => Some(handle),
            Self::Idle | Self::NotFound { .. } | Self::Forbidden { .. } => None,
        }
    }

    /// Snapshot of the resolved job, if one was found.
    pub fn snapshot(&self) -> Option<&StatusSnapshot> {
        match self {
            Self::Attach { snapshot, .. }
            | Self::ResumeReady { snapshot, .. }
            | Self::ResumeFailed { snapshot, .. }
            | Self::ResumeCanceled { snapshot, .. }
            | Self::ResumeOther { snapshot, .. } => Some(snapshot),
            Self::Idle | Self::NotFound { .. } | Self::Forbidden { .. } => None,
        }
    }

    /// Whether the UI should start a poll loop for the resolved job.
    ///
    /// Ready jobs are polled only while a video is pending or rendering.
    pub fn should_poll(&self) -> bool {
        match self {
            Self::Attach { .. } | Self::ResumeOther { .. } => true,
            Self::ResumeReady { snapshot, .. } => snapshot
                .video()
                .is_some_and(|video| VideoSubState::is_active(&video)),
            _ => false,
        }
    }
}
