//! Application settings with layered sources
//!
//! Settings say where the RBAC document lives and how to log; they are not
//! the RBAC document itself. Precedence (highest to lowest):
//! 1. `ROASTGUARD_RBAC_CONFIG` (document path only)
//! 2. Environment variables (`ROASTGUARD_*`, `__` separates nested keys)
//! 3. Settings file (TOML)
//! 4. Default values

use crate::error::SettingsError;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default settings file paths to check (in order)
const DEFAULT_SETTINGS_PATHS: &[&str] = &[
    "roastguard.toml",
    ".roastguard.toml",
    "~/.config/roastguard/config.toml",
    "/etc/roastguard/config.toml",
];

/// Environment variable overriding the RBAC document path
pub const RBAC_CONFIG_ENV: &str = "ROASTGUARD_RBAC_CONFIG";

/// Root settings structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// RBAC document source
    pub rbac: RbacSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Where and how to load the RBAC document
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RbacSettings {
    /// Explicit document path; default locations are searched when unset
    pub path: Option<String>,

    /// Upper bound on reading the document, in seconds
    pub load_timeout_secs: u64,

    /// Refuse to start with a document that fails validation
    pub strict: bool,
}

impl Default for RbacSettings {
    fn default() -> Self {
        Self {
            path: None,
            load_timeout_secs: 5,
            strict: true,
        }
    }
}

impl RbacSettings {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}

/// Load settings from a TOML string (useful for testing)
pub fn load_settings_from_str(toml_str: &str) -> Result<Settings, SettingsError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| SettingsError::Load(e.to_string()))?;

    let settings: Settings = config
        .try_deserialize()
        .map_err(|e| SettingsError::Load(e.to_string()))?;

    validate_settings(&settings)?;

    Ok(settings)
}

/// Load settings from files and environment
pub fn load_settings(settings_path: Option<&str>) -> Result<Settings, SettingsError> {
    let mut builder = Config::builder();

    if let Some(path) = settings_path {
        // Explicit path provided - must exist
        if !Path::new(path).exists() {
            return Err(SettingsError::Load(format!(
                "Settings file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::new(path, FileFormat::Toml));
    } else {
        // First existing default wins
        for path in DEFAULT_SETTINGS_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // e.g. ROASTGUARD_RBAC__LOAD_TIMEOUT_SECS, ROASTGUARD_LOGGING__FORMAT
    builder = builder.add_source(
        Environment::with_prefix("ROASTGUARD")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    if let Ok(path) = std::env::var(RBAC_CONFIG_ENV) {
        builder = builder
            .set_override("rbac.path", path)
            .map_err(|e| SettingsError::Load(e.to_string()))?;
    }

    let config = builder
        .build()
        .map_err(|e| SettingsError::Load(e.to_string()))?;

    let settings: Settings = config
        .try_deserialize()
        .map_err(|e| SettingsError::Load(e.to_string()))?;

    validate_settings(&settings)?;

    Ok(settings)
}

fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if settings.rbac.load_timeout_secs == 0 {
        return Err(SettingsError::Invalid {
            message: "rbac.load_timeout_secs must be greater than 0".to_string(),
        });
    }

    if let Some(path) = &settings.rbac.path
        && path.trim().is_empty()
    {
        return Err(SettingsError::Missing {
            field: "rbac.path (set but empty)".to_string(),
        });
    }

    if settings.logging.level.trim().is_empty() {
        return Err(SettingsError::Missing {
            field: "logging.level".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.rbac.path, None);
        assert_eq!(settings.rbac.load_timeout_secs, 5);
        assert!(settings.rbac.strict);
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_load_from_str() {
        let toml = r#"
[rbac]
path = "/srv/rbac.xml"
load_timeout_secs = 10
strict = false

[logging]
level = "debug"
format = "json"
"#;
        let settings = load_settings_from_str(toml).unwrap();
        assert_eq!(settings.rbac.path.as_deref(), Some("/srv/rbac.xml"));
        assert_eq!(settings.rbac.load_timeout(), Duration::from_secs(10));
        assert!(!settings.rbac.strict);
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = load_settings_from_str("[rbac]\nload_timeout_secs = 0\n");
        assert!(matches!(result, Err(SettingsError::Invalid { .. })));
    }

    #[test]
    fn test_empty_path_rejected() {
        let result = load_settings_from_str("[rbac]\npath = \"\"\n");
        assert!(matches!(result, Err(SettingsError::Missing { .. })));
    }

    #[test]
    fn test_deserialize_log_format() {
        let format: LogFormat = serde_json::from_str(r#""json""#).unwrap();
        assert_eq!(format, LogFormat::Json);
    }
}
