//! JSON configuration loading.
//!
//! Every tunable struct in the crate ([`CompositorConfig`], [`GizmoConfig`],
//! [`ResizeConfig`]) derives serde with `#[serde(default)]`, so a config file
//! only needs the fields it changes:
//!
//! ```json
//! { "resolution": 1024, "property_name": "_Decals" }
//! ```
//!
//! [`CompositorConfig`]: crate::composite::CompositorConfig
//! [`GizmoConfig`]: crate::gizmo::GizmoConfig
//! [`ResizeConfig`]: crate::gizmo::ResizeConfig

use std::fmt;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Errors from reading or validating a config.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read or written.
    Io(String),
    /// The JSON did not parse into the expected shape.
    Parse(String),
    /// The values parsed but are out of range.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config io error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
            ConfigError::Invalid(e) => write!(f, "invalid config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// A config that round-trips through JSON and can check its own values.
pub trait JsonConfig: Serialize + DeserializeOwned + Sized {
    /// Reject values the owning component cannot work with.
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Parse and validate.
    fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a file.
    fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("'{}': {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    fn to_json_string(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = self.to_json_string()?;
        std::fs::write(path, json).map_err(|e| ConfigError::Io(format!("'{}': {e}", path.display())))
    }
}

/// Fail with [`ConfigError::Invalid`] unless `value` is finite and positive.
pub(crate) fn require_positive(name: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")))
    }
}
