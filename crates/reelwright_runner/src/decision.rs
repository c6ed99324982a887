//! Pure advance decisions.
//!
//! Given a snapshot and, for image generation, the stale watch of the current
//! sub-state, decide whether the job is due a nudge. No I/O and no clock:
//! the caller supplies `now`.

use crate::StaleWatch;
use chrono::{DateTime, Utc};
use reelwright_core::{PhaseProgress, StatusSnapshot, StepState};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sub-state key watched for orphaned image generation markers.
pub const IMAGES_GENERATING: &str = "generating_images.generating";

/// Which rule produced a decision.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AdvanceReason {
    /// Every chunk is formatted.
    FormattingDone,
    /// Chunks remain, or the text is not split yet.
    FormattingInProgress,
    /// Utterances are prepared and scenes are visible.
    ScenesReady,
    /// Utterances or visible scenes are missing.
    AwaitingScenes,
    /// The image phase reports done.
    ImagesDone,
    /// An image is being generated and the marker is fresh.
    ImagesGenerating,
    /// An image marker outlived the stale threshold.
    StaleGenerating,
    /// Images remain to be started.
    ImagesPending,
    /// Every image completed without failure.
    ImagesFinalize,
    /// Some images failed and can be retried.
    ImagesRetryFailed,
    /// No image work is reported at all.
    ImagesIdle,
    /// The audio phase reports done.
    AudioDone,
    /// Audio is still being generated.
    AudioInProgress,
    /// The phase is never advanced by the engine.
    NotAdvanceable,
}

/// Whether to nudge, and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceDecision {
    /// Send an advance request.
    pub advance: bool,
    /// Rule that produced the decision.
    pub reason: AdvanceReason,
}

impl AdvanceDecision {
    fn advance(reason: AdvanceReason) -> Self {
        Self {
            advance: true,
            reason,
        }
    }

    fn hold(reason: AdvanceReason) -> Self {
        Self {
            advance: false,
            reason,
        }
    }
}

/// Maps a snapshot to an advance decision.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use reelwright_core::{FormattingProgress, PhaseProgress, StatusSnapshot};
/// use reelwright_runner::{AdvanceEvaluator, AdvanceReason};
/// use std::time::Duration;
///
/// let evaluator = AdvanceEvaluator::new(Duration::from_secs(60));
/// let snapshot = StatusSnapshot::new(
///     "job-1",
///     PhaseProgress::Formatting(FormattingProgress { chunks_done: 5, chunks_total: 5 }),
///     Utc::now(),
/// );
/// let decision = evaluator.decide(&snapshot, None, Utc::now());
/// assert!(decision.advance);
/// assert_eq!(decision.reason, AdvanceReason::FormattingDone);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceEvaluator {
    stale_threshold: Duration,
}

impl AdvanceEvaluator {
    /// Create an evaluator that treats generating markers older than
    /// `stale_threshold` as orphaned.
    pub fn new(stale_threshold: Duration) -> Self {
        Self { stale_threshold }
    }

    /// Configured stale threshold.
    pub fn stale_threshold(&self) -> Duration {
        self.stale_threshold
    }

    /// Decide whether the job in `snapshot` is due a nudge.
    ///
    /// `watch` is the stale watch for the job's current sub-state, if any. A
    /// watch on a different sub-state than image generation is ignored.
    pub fn decide(
        &self,
        snapshot: &StatusSnapshot,
        watch: Option<&StaleWatch>,
        now: DateTime<Utc>,
    ) -> AdvanceDecision {
        use AdvanceReason::*;

        match snapshot.progress() {
            PhaseProgress::Formatting(progress) => {
                if progress.is_done() {
                    AdvanceDecision::advance(FormattingDone)
                } else {
                    AdvanceDecision::hold(FormattingInProgress)
                }
            }
            PhaseProgress::AwaitingReady(progress) => {
                if progress.utterances_ready && progress.visible_count > 0 {
                    AdvanceDecision::advance(ScenesReady)
                } else {
                    AdvanceDecision::hold(AwaitingScenes)
                }
            }
            PhaseProgress::GeneratingImages(images) => {
                if images.state == StepState::Done {
                    AdvanceDecision::advance(ImagesDone)
                } else if images.generating > 0 {
                    if self.is_stale(watch, now) {
                        AdvanceDecision::advance(StaleGenerating)
                    } else {
                        AdvanceDecision::hold(ImagesGenerating)
                    }
                } else if images.pending > 0 {
                    AdvanceDecision::advance(ImagesPending)
                } else if images.completed > 0 && images.failed == 0 {
                    AdvanceDecision::advance(ImagesFinalize)
                } else if images.failed > 0 {
                    AdvanceDecision::advance(ImagesRetryFailed)
                } else {
                    AdvanceDecision::hold(ImagesIdle)
                }
            }
            PhaseProgress::GeneratingAudio(audio) => {
                if audio.state == StepState::Done {
                    AdvanceDecision::advance(AudioDone)
                } else {
                    AdvanceDecision::hold(AudioInProgress)
                }
            }
            PhaseProgress::Ready { .. } | PhaseProgress::Failed | PhaseProgress::Canceled => {
                AdvanceDecision::hold(NotAdvanceable)
            }
        }
    }

    fn is_stale(&self, watch: Option<&StaleWatch>, now: DateTime<Utc>) -> bool {
        watch.is_some_and(|watch| {
            watch.sub_state() == IMAGES_GENERATING && watch.elapsed(now) >= self.stale_threshold
        })
    }
}
