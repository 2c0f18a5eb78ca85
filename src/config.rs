use std::path::{Path, PathBuf};

use foraging_core::{GridSpec, GRID_SIZE_DEFAULT, SHAPE_SIZE_DEFAULT};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::lock::LockTimeouts;

pub const ENV_PREFIX: &str = "FORAGING_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: String, value: String },
    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Tunables for one client session. Every field has a working default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub grid_size: i32,
    pub shape_size: u32,
    pub drag_threshold_px: f32,
    pub gesture_interval_ms: u64,
    pub settle_ms: u64,
    pub advisory_ttl_ms: u64,
    pub rejection_ttl_ms: u64,
    pub lock_request_timeout_ms: u64,
    pub lock_hold_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grid_size: GRID_SIZE_DEFAULT,
            shape_size: SHAPE_SIZE_DEFAULT,
            drag_threshold_px: 3.0,
            gesture_interval_ms: 50,
            settle_ms: 200,
            advisory_ttl_ms: 1500,
            rejection_ttl_ms: 3000,
            lock_request_timeout_ms: 5000,
            lock_hold_timeout_ms: 30_000,
        }
    }
}

impl SessionConfig {
    /// Defaults, then `path` if given, then `FORAGING_*` variables from the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded session config");
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Overrides fields from `lookup`, keyed by `FORAGING_<FIELD>`. Blank values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        override_field(&lookup, "GRID_SIZE", &mut self.grid_size)?;
        override_field(&lookup, "SHAPE_SIZE", &mut self.shape_size)?;
        override_field(&lookup, "DRAG_THRESHOLD_PX", &mut self.drag_threshold_px)?;
        override_field(&lookup, "GESTURE_INTERVAL_MS", &mut self.gesture_interval_ms)?;
        override_field(&lookup, "SETTLE_MS", &mut self.settle_ms)?;
        override_field(&lookup, "ADVISORY_TTL_MS", &mut self.advisory_ttl_ms)?;
        override_field(&lookup, "REJECTION_TTL_MS", &mut self.rejection_ttl_ms)?;
        override_field(
            &lookup,
            "LOCK_REQUEST_TIMEOUT_MS",
            &mut self.lock_request_timeout_ms,
        )?;
        override_field(&lookup, "LOCK_HOLD_TIMEOUT_MS", &mut self.lock_hold_timeout_ms)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_size <= 0 {
            return Err(ConfigError::Invalid {
                field: "grid_size",
                reason: format!("must be positive, got {}", self.grid_size),
            });
        }
        let cells = self.grid().cell_count();
        if self.shape_size == 0 || self.shape_size as usize > cells {
            return Err(ConfigError::Invalid {
                field: "shape_size",
                reason: format!("must be between 1 and {cells}, got {}", self.shape_size),
            });
        }
        if self.shape_size > self.grid_size as u32 {
            // the starting line has to fit on one row
            return Err(ConfigError::Invalid {
                field: "shape_size",
                reason: format!("must not exceed grid_size {}", self.grid_size),
            });
        }
        if !self.drag_threshold_px.is_finite() || self.drag_threshold_px < 0.0 {
            return Err(ConfigError::Invalid {
                field: "drag_threshold_px",
                reason: format!("must be a non-negative number, got {}", self.drag_threshold_px),
            });
        }
        Ok(())
    }

    pub fn grid(&self) -> GridSpec {
        GridSpec::new(self.grid_size, self.shape_size)
    }

    pub fn lock_timeouts(&self) -> LockTimeouts {
        LockTimeouts {
            request_ms: self.lock_request_timeout_ms,
            hold_ms: self.lock_hold_timeout_ms,
        }
    }
}

fn override_field<T, F>(lookup: &F, suffix: &str, slot: &mut T) -> Result<(), ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let key = format!("{ENV_PREFIX}{suffix}");
    let Some(raw) = lookup(&key) else {
        return Ok(());
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    *slot = trimmed.parse::<T>().map_err(|_| ConfigError::InvalidEnv {
        key,
        value: raw.clone(),
    })?;
    Ok(())
}
