//! The status snapshot returned by every poll.

use crate::{JobId, Phase, PhaseProgress, VideoSubState};
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use reelwright_error::{SnapshotError, SnapshotErrorKind};
use serde::{Deserialize, Serialize};

/// Settings locked in when the job started.
///
/// A job's confirmed configuration never changes; a new job is required to
/// use different settings.
///
/// # Examples
///
/// ```
/// use reelwright_core::ConfirmedConfigBuilder;
///
/// let config = ConfirmedConfigBuilder::default()
///     .voice("narrator-warm")
///     .style("watercolor")
///     .characters(vec!["Ada".to_string(), "Brun".to_string()])
///     .build()
///     .unwrap();
/// assert_eq!(config.voice(), "narrator-warm");
/// assert_eq!(config.characters().len(), 2);
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Getters,
    derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct ConfirmedConfig {
    /// Narration voice.
    voice: String,
    /// Image style preset.
    style: String,
    /// Named characters cast in the story.
    #[builder(default)]
    #[serde(default)]
    characters: Vec<String>,
}

/// Error payload attached to a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobFailure {
    /// Human-readable failure description.
    pub message: String,
}

impl JobFailure {
    /// Create a failure payload.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One poll response.
///
/// Snapshots are immutable values. Build them with [`StatusSnapshot::new`],
/// which derives `phase` from the progress payload so the two always agree;
/// deserialized snapshots should be checked with [`StatusSnapshot::validate`].
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use reelwright_core::{FormattingProgress, Phase, PhaseProgress, StatusSnapshot};
///
/// let snapshot = StatusSnapshot::new(
///     "job-1",
///     PhaseProgress::Formatting(FormattingProgress { chunks_done: 2, chunks_total: 5 }),
///     Utc::now(),
/// );
/// assert_eq!(*snapshot.phase(), Phase::Formatting);
/// assert!(snapshot.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct StatusSnapshot {
    /// Job the snapshot describes.
    job_id: JobId,
    /// Overall phase.
    phase: Phase,
    /// Phase-specific counters.
    progress: PhaseProgress,
    /// Locked-in settings, once the job has started.
    #[serde(default)]
    confirmed_config: Option<ConfirmedConfig>,
    /// Failure payload; present only in the failed phase.
    #[serde(default)]
    error: Option<JobFailure>,
    /// When the service last changed the job.
    updated_at: DateTime<Utc>,
}

impl StatusSnapshot {
    /// Create a snapshot whose phase matches its progress payload.
    pub fn new(
        job_id: impl Into<JobId>,
        progress: PhaseProgress,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            phase: progress.phase(),
            progress,
            confirmed_config: None,
            error: None,
            updated_at,
        }
    }

    /// Attach the job's confirmed configuration.
    pub fn with_confirmed_config(mut self, config: ConfirmedConfig) -> Self {
        self.confirmed_config = Some(config);
        self
    }

    /// Attach a failure payload.
    pub fn with_error(mut self, error: JobFailure) -> Self {
        self.error = Some(error);
        self
    }

    /// Override the reported phase, leaving the progress payload untouched.
    ///
    /// Only useful for reproducing malformed service responses.
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    /// Check that the progress tag matches the phase and that an error
    /// payload only accompanies the failed phase.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let progress_phase = self.progress.phase();
        if progress_phase != self.phase {
            return Err(SnapshotError::new(SnapshotErrorKind::PhaseMismatch {
                phase: self.phase.to_string(),
                progress: progress_phase.to_string(),
            }));
        }
        if self.error.is_some() && self.phase != Phase::Failed {
            return Err(SnapshotError::new(SnapshotErrorKind::ErrorPayload(
                self.phase.to_string(),
            )));
        }
        Ok(())
    }

    /// Video sub-state when the job is ready.
    pub fn video(&self) -> Option<VideoSubState> {
        self.progress.video()
    }

    /// Failure message when the job failed.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }
}
