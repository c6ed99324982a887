//! Per-phase progress counters.
//!
//! Every status snapshot carries exactly one [`PhaseProgress`] variant, and the
//! variant always describes the snapshot's own phase.

use crate::Phase;
use serde::{Deserialize, Serialize};

/// Coarse state of the unit of work inside a phase.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepState {
    /// Nothing has started yet.
    #[default]
    Idle,
    /// Work is underway.
    Running,
    /// The phase reports its work complete.
    Done,
}

/// Scene formatting progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormattingProgress {
    /// Chunks of source text already formatted.
    pub chunks_done: u32,
    /// Chunks the source text was split into.
    pub chunks_total: u32,
}

impl FormattingProgress {
    /// Formatting is done once every chunk is formatted.
    ///
    /// A job that has not split its text yet reports `0/0` and is not done.
    pub fn is_done(&self) -> bool {
        self.chunks_total > 0 && self.chunks_done >= self.chunks_total
    }
}

/// Readiness gate between formatting and image generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadinessProgress {
    /// The job reports its narration utterances are prepared.
    pub utterances_ready: bool,
    /// Scenes currently visible to the owner.
    pub visible_count: u32,
}

/// Scene image generation progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageProgress {
    /// Overall sub-state of the phase.
    #[serde(default)]
    pub state: StepState,
    /// Images the job needs.
    pub total: u32,
    /// Images finished.
    pub completed: u32,
    /// Images marked as being generated right now.
    pub generating: u32,
    /// Images not started.
    pub pending: u32,
    /// Images whose generation failed.
    pub failed: u32,
}

/// Narration audio generation progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AudioProgress {
    /// Overall sub-state of the phase.
    #[serde(default)]
    pub state: StepState,
    /// Utterances to narrate.
    pub total_utterances: u32,
    /// Utterances narrated.
    pub completed: u32,
    /// Utterances whose narration failed.
    pub failed: u32,
}

/// Optional video rendering nested inside the `ready` phase.
///
/// # Examples
///
/// ```
/// use reelwright_core::VideoSubState;
///
/// assert!(VideoSubState::Done.is_terminal());
/// assert!(!VideoSubState::Running { progress_percent: 40 }.is_terminal());
/// assert!(!VideoSubState::Off.is_terminal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VideoSubState {
    /// No video requested (yet).
    #[default]
    Off,
    /// Video requested but not started.
    Pending,
    /// Video rendering is underway.
    Running {
        /// Render progress, 0-100.
        progress_percent: u8,
    },
    /// Video rendered.
    Done,
    /// Video rendering failed.
    Failed,
}

impl VideoSubState {
    /// `done` and `failed` end polling of a ready job.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// `pending` and `running` keep a ready job polling indefinitely.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Running { .. })
    }
}

/// Progress payload, tagged by the phase it describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PhaseProgress {
    /// Scene formatting counters.
    Formatting(FormattingProgress),
    /// Readiness flags.
    AwaitingReady(ReadinessProgress),
    /// Image generation counters.
    GeneratingImages(ImageProgress),
    /// Audio generation counters.
    GeneratingAudio(AudioProgress),
    /// Finished job with its video sub-state.
    Ready {
        /// Nested video state machine.
        #[serde(default)]
        video: VideoSubState,
    },
    /// Failed job.
    Failed,
    /// Canceled job.
    Canceled,
}

impl PhaseProgress {
    /// The phase this payload belongs to.
    pub fn phase(&self) -> Phase {
        match self {
            Self::Formatting(_) => Phase::Formatting,
            Self::AwaitingReady(_) => Phase::AwaitingReady,
            Self::GeneratingImages(_) => Phase::GeneratingImages,
            Self::GeneratingAudio(_) => Phase::GeneratingAudio,
            Self::Ready { .. } => Phase::Ready,
            Self::Failed => Phase::Failed,
            Self::Canceled => Phase::Canceled,
        }
    }

    /// Video sub-state when the payload describes a ready job.
    pub fn video(&self) -> Option<VideoSubState> {
        match self {
            Self::Ready { video } => Some(*video),
            _ => None,
        }
    }
}
