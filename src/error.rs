//! Error types for roastguard
//!
//! This module defines the error hierarchy used throughout the crate.
//! Parse and load failures are explicit values returned to the caller;
//! permission lookups never fail and are not represented here.

use crate::config::AccessLevel;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("RBAC configuration error: {0}")]
    Load(#[from] LoadError),

    #[error("RBAC configuration is invalid: {}", .errors.join("; "))]
    ValidationFailed { errors: Vec<String> },

    #[error("Access denied: {0}")]
    AccessDenied(#[from] AccessDeniedError),
}

/// Failures turning raw document text into an [`RbacConfig`](crate::config::RbacConfig)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("RBAC document is empty")]
    Empty,

    #[error("RBAC document is not well-formed XML: {0}")]
    Malformed(String),

    #[error("Unexpected root element '{found}', expected 'rbac-config'")]
    UnexpectedRoot { found: String },

    #[error("Missing required section: {section}")]
    MissingSection { section: &'static str },

    #[error("RBAC document has an invalid shape: {0}")]
    Shape(String),
}

impl ParseError {
    /// Name of the missing section, if that is what failed
    pub fn missing_section(&self) -> Option<&'static str> {
        match self {
            ParseError::MissingSection { section } => Some(section),
            _ => None,
        }
    }
}

/// Failures loading an RBAC document from its source
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("No RBAC configuration found (searched: {searched})")]
    NotFound { searched: String },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("No previous configuration source to reload from")]
    NoSource,

    #[error("Reading {} timed out after {:?}", .path.display(), .timeout)]
    Timeout { path: PathBuf, timeout: Duration },
}

/// Application settings errors
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(String),

    #[error("Invalid settings: {message}")]
    Invalid { message: String },

    #[error("Missing required setting: {field}")]
    Missing { field: String },
}

/// A permission check that did not meet its requirement
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Access denied for role '{role}' on feature '{feature}': {reason}")]
pub struct AccessDeniedError {
    pub role: String,
    pub feature: String,
    pub reason: String,
}

impl AccessDeniedError {
    pub fn new(
        role: impl Into<String>,
        feature: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            feature: feature.into(),
            reason: reason.into(),
        }
    }

    /// The role holds the feature, but below the required level
    pub fn insufficient_level(
        role: impl Into<String>,
        feature: impl Into<String>,
        granted: AccessLevel,
        required: AccessLevel,
    ) -> Self {
        Self {
            role: role.into(),
            feature: feature.into(),
            reason: format!("requires '{}' access, but only '{}' is granted", required, granted),
        }
    }

    /// No usable configuration is loaded
    pub fn unavailable(feature: impl Into<String>) -> Self {
        Self {
            role: String::new(),
            feature: feature.into(),
            reason: "authorization configuration is unavailable".into(),
        }
    }
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for parsing
pub type ParseResult<T> = std::result::Result<T, ParseError>;
