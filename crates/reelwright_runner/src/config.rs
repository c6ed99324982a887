//! Runner configuration.
//!
//! Configuration is layered with the `config` crate:
//! - Bundled defaults (include_str! from reelwright.toml)
//! - User overrides (~/.config/reelwright/reelwright.toml, then ./reelwright.toml)
//!
//! Later sources override earlier ones key by key.

use config::{Config, File, FileFormat};
use derive_getters::Getters;
use reelwright_error::{ConfigError, ReelwrightError, ReelwrightResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Timing constants for polling, nudging and stale recovery.
///
/// # Example
///
/// ```toml
/// [runner]
/// poll_interval_ms = 4000
/// nudge_min_spacing_ms = 5000
/// stale_threshold_secs = 60
/// video_grace_secs = 120
/// event_capacity = 64
/// ```
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_builder::Builder,
)]
#[builder(default)]
#[serde(default)]
pub struct RunnerConfig {
    /// Period between status polls, in milliseconds.
    poll_interval_ms: u64,
    /// Minimum spacing between accepted nudges, in milliseconds.
    nudge_min_spacing_ms: u64,
    /// Time a `generating` marker may persist before it is treated as orphaned.
    stale_threshold_secs: u64,
    /// How long a ready job without a video keeps polling for a late video request.
    video_grace_secs: u64,
    /// Buffered events per subscriber before the slowest one starts lagging.
    event_capacity: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 4_000,
            nudge_min_spacing_ms: 5_000,
            stale_threshold_secs: 60,
            video_grace_secs: 120,
            event_capacity: 64,
        }
    }
}

impl RunnerConfig {
    /// Creates a new config builder seeded with defaults.
    pub fn builder() -> RunnerConfigBuilder {
        RunnerConfigBuilder::default()
    }

    /// Poll period.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Minimum nudge spacing.
    pub fn nudge_min_spacing(&self) -> Duration {
        Duration::from_millis(self.nudge_min_spacing_ms)
    }

    /// Stale threshold.
    pub fn stale_threshold(&self) -> Duration {
        Duration::from_secs(self.stale_threshold_secs)
    }

    /// Ready-without-video grace window.
    pub fn video_grace(&self) -> Duration {
        Duration::from_secs(self.video_grace_secs)
    }

    /// Validates the timing constants.
    ///
    /// # Errors
    ///
    /// Returns an error if the poll interval or event capacity is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::new("poll_interval_ms must be greater than 0"));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::new("event_capacity must be greater than 0"));
        }
        Ok(())
    }
}

/// Top-level reelwright configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReelwrightConfig {
    /// Poll loop and gate timing.
    #[serde(default)]
    pub runner: RunnerConfig,
}

impl ReelwrightConfig {
    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> ReelwrightResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                ReelwrightError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                ReelwrightError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.runner.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: current dir > home dir > bundled defaults.
    ///
    /// User config files are optional and silently skipped if not found.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use reelwright_runner::ReelwrightConfig;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = ReelwrightConfig::load()?;
    /// println!("polling every {:?}", config.runner.poll_interval());
    /// # Ok(())
    /// # }
    /// ```
    #[instrument]
    pub fn load() -> ReelwrightResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        const DEFAULT_CONFIG: &str = include_str!("../../../reelwright.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/reelwright/reelwright.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("reelwright").required(false));

        let config: Self = builder
            .build()
            .map_err(|e| {
                ReelwrightError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                ReelwrightError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.runner.validate()?;
        Ok(config)
    }
}
