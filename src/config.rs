use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_CONFIG_PATH: &str = "config/retry.toml";

/// Which scope a failure counter belongs to.
///
/// `Custom` selects a caller-supplied resolver; the resolver itself is a
/// runtime value and is passed to the engine separately (see
/// [`crate::application::scope::TrackingScope`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeMode {
    #[default]
    PerInvocation,
    Global,
    Custom,
}

/// Retry policy for one engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum consecutive failures tolerated per (scope, tool) pair before
    /// the engine gives up.
    pub max_retries: u32,
    pub tracking_scope: ScopeMode,
    /// Carried into `Decision::GiveUp`: whether the caller should escalate
    /// the terminal failure as a hard error instead of reporting it to the
    /// model as an error payload.
    pub propagate_on_exhaustion: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            tracking_scope: ScopeMode::PerInvocation,
            propagate_on_exhaustion: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read retry config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse retry config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl RetryConfig {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file at the default location yields the default policy; an
    /// explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return read_config(path);
        }
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        match read_config(default_path) {
            Ok(config) => Ok(config),
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                info!("Retry config file not found; using defaults");
                Ok(Self::default())
            }
            Err(other) => Err(other),
        }
    }
}

fn read_config(path: &Path) -> Result<RetryConfig, ConfigError> {
    debug!(path = %path.display(), "Reading retry configuration file");
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
