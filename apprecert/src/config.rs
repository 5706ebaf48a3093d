//! Runtime configuration assembled from CLI flags and the environment.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::paths;

/// Environment variable bounding how long any external tool may run.
pub const TOOL_TIMEOUT_ENV: &str = "APPRECERT_TOOL_TIMEOUT_SECS";

const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine the CA root directory: {0}")]
    RootDir(#[source] std::io::Error),

    #[error("Invalid APPRECERT_TOOL_TIMEOUT_SECS value '{value}': {reason}")]
    InvalidTimeout { value: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the CA and issued certificates
    pub caroot: PathBuf,
    /// Upper bound on each external tool invocation
    pub tool_timeout: Duration,
}

impl Config {
    /// Build the configuration. An explicit `caroot` beats `CAROOT`, which
    /// beats the platform default.
    pub fn load(caroot: Option<PathBuf>) -> Result<Self, ConfigError> {
        let caroot = match caroot {
            Some(dir) => dir,
            None => paths::caroot_dir().map_err(ConfigError::RootDir)?,
        };

        let tool_timeout = parse_tool_timeout(std::env::var(TOOL_TIMEOUT_ENV).ok().as_deref())?;

        tracing::debug!(
            caroot = %caroot.display(),
            timeout_secs = tool_timeout.as_secs(),
            "Loaded configuration"
        );

        Ok(Self {
            caroot,
            tool_timeout,
        })
    }
}

fn parse_tool_timeout(raw: Option<&str>) -> Result<Duration, ConfigError> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(DEFAULT_TOOL_TIMEOUT);
    };

    let secs: u64 = raw.parse().map_err(|e: std::num::ParseIntError| {
        ConfigError::InvalidTimeout {
            value: raw.to_string(),
            reason: e.to_string(),
        }
    })?;
    if secs == 0 {
        return Err(ConfigError::InvalidTimeout {
            value: raw.to_string(),
            reason: "must be at least 1 second".to_string(),
        });
    }

    Ok(Duration::from_secs(secs))
}
