//! Top-level phases of a generation run.

use serde::{Deserialize, Serialize};

/// Stage of a long-running generation job.
///
/// Phases advance monotonically in declaration order, except that a failed
/// job may be retried and re-enter an earlier phase.
///
/// # Examples
///
/// ```
/// use reelwright_core::Phase;
///
/// assert_eq!(Phase::GeneratingImages.to_string(), "generating_images");
/// assert!(Phase::Canceled.is_terminal());
/// assert!(!Phase::Ready.is_terminal());
/// assert!(Phase::Formatting < Phase::Ready);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    /// Source text is being split into scenes.
    Formatting,
    /// Scenes exist; waiting for narration utterances to be prepared.
    AwaitingReady,
    /// Scene images are being generated one unit at a time.
    GeneratingImages,
    /// Narration audio is being generated.
    GeneratingAudio,
    /// All required assets exist; an optional video may still be rendering.
    Ready,
    /// The job stopped with an error.
    Failed,
    /// The job was canceled by its owner.
    Canceled,
}

impl Phase {
    /// Phases that end automatic polling outright.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Canceled)
    }

    /// Stable snake_case name, matching the wire format.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}
