//! Configuration module
//!
//! The RBAC document (types, parser, validator, provider) and the
//! application settings that say where to find it.

pub mod loader;
pub mod parser;
pub mod settings;
pub mod types;
pub mod validator;

pub use loader::{ConfigProvider, DEFAULT_CONFIG_PATHS};
pub use parser::{Parsed, ParseWarning, parse, parse_bytes, parse_with_warnings, to_xml};
pub use settings::{LogFormat, LoggingConfig, RbacSettings, Settings, load_settings, load_settings_from_str};
pub use types::*;
pub use validator::{ValidationResult, validate, validate_optional};
