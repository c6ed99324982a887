//! Results of asking the service to advance a job.

use crate::{JobFailure, Phase};
use serde::{Deserialize, Serialize};

/// Payload returned by a successful advance request.
///
/// # Examples
///
/// ```
/// use reelwright_core::{AdvanceResult, Phase};
///
/// let result = AdvanceResult::transitioned(Phase::GeneratingImages, Phase::GeneratingAudio, "images_complete");
/// assert!(result.is_transition());
/// assert!(!AdvanceResult::no_op(Phase::Formatting).is_transition());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceResult {
    /// Phase before the service acted.
    pub previous_phase: Phase,
    /// Phase after the service acted.
    pub phase: Phase,
    /// The service cleaned up a stale in-progress record.
    #[serde(default)]
    pub repaired: bool,
    /// Short reason code describing what the service did.
    #[serde(default)]
    pub reason: Option<String>,
    /// Failure payload when the job entered the failed phase.
    #[serde(default)]
    pub error: Option<JobFailure>,
}

impl AdvanceResult {
    /// Nothing was due.
    pub fn no_op(phase: Phase) -> Self {
        Self {
            previous_phase: phase,
            phase,
            repaired: false,
            reason: None,
            error: None,
        }
    }

    /// The service repaired an orphaned record without changing phase.
    pub fn repaired(phase: Phase) -> Self {
        Self {
            repaired: true,
            reason: Some("stale_repaired".to_string()),
            ..Self::no_op(phase)
        }
    }

    /// The service moved the job to a new phase.
    pub fn transitioned(from: Phase, to: Phase, reason: impl Into<String>) -> Self {
        Self {
            previous_phase: from,
            phase: to,
            repaired: false,
            reason: Some(reason.into()),
            error: None,
        }
    }

    /// The job entered the failed phase.
    pub fn failed(from: Phase, message: impl Into<String>) -> Self {
        Self {
            previous_phase: from,
            phase: Phase::Failed,
            repaired: false,
            reason: Some("job_failed".to_string()),
            error: Some(JobFailure::new(message)),
        }
    }

    /// Whether the phase changed.
    pub fn is_transition(&self) -> bool {
        self.previous_phase != self.phase
    }
}

/// Classified outcome of one nudge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, strum::IntoStaticStr)]
#[serde(tag = "outcome", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NudgeOutcome {
    /// The service had nothing to do yet.
    NoOp,
    /// The service cleaned up a stale record.
    StateRepaired,
    /// The service moved the job to a new phase.
    PhaseTransitioned {
        /// Phase before the nudge.
        from: Phase,
        /// Phase after the nudge.
        to: Phase,
        /// Short reason code.
        reason: String,
    },
    /// The service holds a lock on the job; retried on a later tick.
    Conflicted,
    /// The job entered the failed phase; automatic nudging stops.
    Failed {
        /// Failure description.
        message: String,
    },
    /// The job no longer exists.
    Missing,
    /// Transient transport failure; retried on a later tick.
    Errored {
        /// Error description.
        message: String,
    },
}

impl NudgeOutcome {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        self.into()
    }
}
