// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::engine::ExecutorOptions;
use crate::logging::LogLevel;

/// Configuration as read from TOML, before validation.
///
/// ```toml
/// [proxy]
/// timeout = "100ms"
///
/// [group]
/// skip_failures = false
/// skip_cancellations = false
///
/// [logging]
/// level = "debug"
/// ```
///
/// All sections are optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawEngineConfig {
    #[serde(default)]
    pub proxy: ProxySection,

    #[serde(default)]
    pub group: GroupSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

/// `[proxy]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxySection {
    /// Default timeout for every proxy, e.g. `"250ms"` or `"5s"`.
    #[serde(default)]
    pub timeout: Option<String>,
}

/// `[group]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupSection {
    #[serde(default)]
    pub skip_failures: bool,

    #[serde(default)]
    pub skip_cancellations: bool,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    #[serde(default)]
    pub level: Option<LogLevel>,
}

/// Validated configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub proxy: ProxyDefaults,
    pub group: GroupDefaults,
    pub log_level: Option<LogLevel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyDefaults {
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupDefaults {
    pub skip_failures: bool,
    pub skip_cancellations: bool,
}

impl GroupDefaults {
    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            skip_failures: self.skip_failures,
            skip_cancellations: self.skip_cancellations,
            ..ExecutorOptions::default()
        }
    }
}
