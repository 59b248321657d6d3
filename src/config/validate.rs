// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{EngineConfig, GroupDefaults, ProxyDefaults, RawEngineConfig};
use crate::errors::{CommandError, Result};

impl TryFrom<RawEngineConfig> for EngineConfig {
    type Error = CommandError;

    fn try_from(raw: RawEngineConfig) -> std::result::Result<Self, Self::Error> {
        let timeout = raw
            .proxy
            .timeout
            .as_deref()
            .map(validate_timeout)
            .transpose()?;

        Ok(EngineConfig {
            proxy: ProxyDefaults { timeout },
            group: GroupDefaults {
                skip_failures: raw.group.skip_failures,
                skip_cancellations: raw.group.skip_cancellations,
            },
            log_level: raw.logging.level,
        })
    }
}

fn validate_timeout(s: &str) -> Result<Duration> {
    let timeout = parse_duration(s)
        .map_err(|e| CommandError::Config(format!("[proxy].timeout: {e}")))?;
    if timeout.is_zero() {
        return Err(CommandError::Config(
            "[proxy].timeout must be greater than zero".to_string(),
        ));
    }
    Ok(timeout)
}

/// Parse durations like `"100ms"`, `"5s"`, `"2m"` or `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;

    match unit_part.trim().to_lowercase().as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => seconds(s, value, 60),
        "h" => seconds(s, value, 60 * 60),
        unit => Err(format!(
            "unsupported duration unit '{unit}'; expected ms, s, m, or h"
        )),
    }
}

fn seconds(s: &str, value: u64, per_unit: u64) -> std::result::Result<Duration, String> {
    value
        .checked_mul(per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
