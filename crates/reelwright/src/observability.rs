use std::env;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Configuration for log output.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Service name recorded on startup
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Log level filter (e.g., "info", "reelwright_runner=debug")
    pub log_level: String,
    /// Enable JSON-formatted logs for structured logging
    pub json_logs: bool,
}

impl ObservabilityConfig {
    /// Create a new configuration with the given service name.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            json_logs: false,
        }
    }

    /// Set the service version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    /// Set the log level.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable JSON-formatted logs.
    pub fn with_json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = enabled;
        self
    }

    fn filter(&self) -> Result<EnvFilter, Box<dyn std::error::Error>> {
        Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&self.log_level))?)
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"))
    }
}

/// Initialize logging with default configuration.
///
/// For more control, use `init_observability_with_config()`.
pub fn init_observability() -> Result<(), Box<dyn std::error::Error>> {
    init_observability_with_config(ObservabilityConfig::default())
}

/// Initialize logging with custom configuration.
///
/// This sets up:
/// - An `EnvFilter` from `RUST_LOG`, falling back to the configured level
/// - Text or JSON formatted output
///
/// Fails if the filter does not parse or a global subscriber is already set.
pub fn init_observability_with_config(
    config: ObservabilityConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = config.filter()?;

    let fmt_layer = if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_level(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        "Observability initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_methods_override_defaults() {
        let config = ObservabilityConfig::new("reelwright-test")
            .with_version("9.9.9")
            .with_log_level("reelwright_runner=debug")
            .with_json_logs(true);

        assert_eq!(config.service_name, "reelwright-test");
        assert_eq!(config.service_version, "9.9.9");
        assert!(config.json_logs);
        assert!(config.filter().is_ok());
    }
}
