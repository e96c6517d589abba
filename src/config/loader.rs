//! RBAC configuration provider
//!
//! [`ConfigProvider`] owns the "current configuration" for a process. It is an
//! ordinary value: construct one at startup and share it (usually behind an
//! `Arc`) with whatever needs to make authorization decisions.
//!
//! Loading from a path caches the result keyed by that path; asking again for
//! the same path returns the cached config without re-reading. A failed load
//! leaves the cache untouched.
//!
//! Concurrent first loads are not deduplicated. Each caller parses, the last
//! one to finish is the one that stays cached.

use crate::access_control::PermissionResolver;
use crate::config::parser;
use crate::config::types::RbacConfig;
use crate::config::validator::validate;
use crate::error::{AppError, LoadError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default RBAC document locations to check (in order)
pub const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "rbac-config.xml",
    "config/rbac-config.xml",
    "~/.config/roastguard/rbac-config.xml",
    "/etc/roastguard/rbac-config.xml",
];

#[derive(Default)]
struct ProviderState {
    /// Resolver over the current config; holds the config itself
    resolver: Option<Arc<PermissionResolver>>,
    /// Path the current config was read from; `None` for in-memory loads
    source: Option<PathBuf>,
}

/// Holder of the current RBAC configuration
pub struct ConfigProvider {
    default_paths: Vec<String>,
    state: RwLock<ProviderState>,
}

impl Default for ConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigProvider {
    /// Create an empty provider using [`DEFAULT_CONFIG_PATHS`]
    pub fn new() -> Self {
        Self::with_default_paths(DEFAULT_CONFIG_PATHS.iter().map(|p| p.to_string()))
    }

    /// Create an empty provider with custom default locations
    pub fn with_default_paths(paths: impl IntoIterator<Item = String>) -> Self {
        Self {
            default_paths: paths.into_iter().collect(),
            state: RwLock::new(ProviderState::default()),
        }
    }

    /// Create a provider already holding a configuration
    pub fn with_config(config: RbacConfig) -> Self {
        let provider = Self::new();
        provider.store(config, None);
        provider
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ProviderState> {
        self.state.read().unwrap_or_else(|poisoned| {
            warn!("config provider lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ProviderState> {
        self.state.write().unwrap_or_else(|poisoned| {
            warn!("config provider lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Load from `path`, or from the first existing default location
    ///
    /// Returns the cached config if it was loaded from the same path.
    pub fn load_config(&self, path: Option<&Path>) -> Result<Arc<RbacConfig>, LoadError> {
        let path = self.resolve_path(path)?;
        if let Some(cached) = self.cached_for(&path) {
            return Ok(cached);
        }

        let config = read_and_parse(&path)?;
        Ok(self.store(config, Some(path)))
    }

    /// Like [`load_config`](Self::load_config), bounding the file read by `timeout`
    ///
    /// Expiry is reported as [`LoadError::Timeout`] and is not retried.
    pub async fn load_config_with_timeout(
        &self,
        path: Option<&Path>,
        timeout: Duration,
    ) -> Result<Arc<RbacConfig>, LoadError> {
        let path = self.resolve_path(path)?;
        if let Some(cached) = self.cached_for(&path) {
            return Ok(cached);
        }

        let text = match tokio::time::timeout(timeout, tokio::fs::read_to_string(&path)).await {
            Ok(Ok(text)) => text,
            Ok(Err(source)) => return Err(LoadError::Io { path, source }),
            Err(_) => {
                return Err(LoadError::Timeout { path, timeout });
            }
        };

        let config = parser::parse(&text)?;
        Ok(self.store(config, Some(path)))
    }

    /// Load from an in-memory document
    ///
    /// Replaces the current config and forgets any previous path, so a
    /// subsequent [`reload`](Self::reload) fails with [`LoadError::NoSource`].
    pub fn load_config_from_str(&self, text: &str) -> Result<Arc<RbacConfig>, LoadError> {
        let config = parser::parse(text)?;
        Ok(self.store(config, None))
    }

    /// Load and validate, caching only a configuration that passes
    ///
    /// Startup code uses this to fail closed on a bad document.
    pub fn load_validated(&self, path: Option<&Path>) -> Result<Arc<RbacConfig>, AppError> {
        let path = self.resolve_path(path)?;
        let config = read_and_parse(&path)?;

        let result = validate(&config);
        if !result.valid {
            for error in &result.errors {
                warn!(path = %path.display(), %error, "RBAC validation error");
            }
            return Err(AppError::ValidationFailed {
                errors: result.errors,
            });
        }

        Ok(self.store(config, Some(path)))
    }

    /// Whether a configuration is currently held
    pub fn is_loaded(&self) -> bool {
        self.read_state().resolver.is_some()
    }

    /// The current configuration, if any
    pub fn get_config(&self) -> Option<Arc<RbacConfig>> {
        self.read_state()
            .resolver
            .as_ref()
            .map(|resolver| resolver.shared_config())
    }

    /// Path the current configuration came from
    pub fn source(&self) -> Option<PathBuf> {
        self.read_state().source.clone()
    }

    /// Re-read the previously used path, bypassing the cache
    pub fn reload(&self) -> Result<Arc<RbacConfig>, LoadError> {
        let path = self.source().ok_or(LoadError::NoSource)?;
        let config = read_and_parse(&path)?;
        info!(path = %path.display(), "Reloaded RBAC configuration");
        Ok(self.store(config, Some(path)))
    }

    /// Drop the current configuration and its source
    pub fn reset(&self) {
        *self.write_state() = ProviderState::default();
        info!("RBAC configuration cache cleared");
    }

    /// A resolver over the current configuration, or one that denies everything
    pub fn resolver(&self) -> Arc<PermissionResolver> {
        match &self.read_state().resolver {
            Some(resolver) => resolver.clone(),
            None => {
                debug!("No RBAC configuration loaded, denying all access");
                Arc::new(PermissionResolver::deny_all())
            }
        }
    }

    fn cached_for(&self, path: &Path) -> Option<Arc<RbacConfig>> {
        let state = self.read_state();
        match (&state.resolver, &state.source) {
            (Some(resolver), Some(source)) if source == path => {
                debug!(path = %path.display(), "Using cached RBAC configuration");
                Some(resolver.shared_config())
            }
            _ => None,
        }
    }

    fn store(&self, config: RbacConfig, source: Option<PathBuf>) -> Arc<RbacConfig> {
        let config = Arc::new(config);
        let resolver = Arc::new(PermissionResolver::new(config.clone()));
        let mut state = self.write_state();
        state.resolver = Some(resolver);
        state.source = source;
        info!(
            source = ?state.source,
            roles = config.roles.len(),
            features = config.features.len(),
            "Loaded RBAC configuration"
        );
        config
    }

    fn resolve_path(&self, path: Option<&Path>) -> Result<PathBuf, LoadError> {
        if let Some(path) = path {
            return Ok(path.to_path_buf());
        }

        for candidate in &self.default_paths {
            let expanded = shellexpand::tilde(candidate);
            let candidate = Path::new(expanded.as_ref());
            if candidate.exists() {
                return Ok(candidate.to_path_buf());
            }
        }

        Err(LoadError::NotFound {
            searched: self.default_paths.join(", "),
        })
    }
}

fn read_and_parse(path: &Path) -> Result<RbacConfig, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parser::parse(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
<rbac-config>
  <metadata><name>T</name><version>1</version><description>d</description></metadata>
  <roles>
    <role id="farmers" name="Farmers" connection-type="pink">
      <feature id="profile" name="Profile" access-level="full"/>
    </role>
  </roles>
  <feature-catalog><feature id="profile" name="Profile" category="core"/></feature-catalog>
  <access-levels>
    <level id="full" name="Full"/><level id="partial" name="Partial"/>
    <level id="view-only" name="View"/><level id="no" name="None"/>
  </access-levels>
  <categories><category id="core" name="Core"/></categories>
  <connection-types><connection-type id="pink" name="Pink"/></connection-types>
</rbac-config>
"#;

    #[test]
    fn test_empty_provider() {
        let provider = ConfigProvider::with_default_paths(Vec::new());
        assert!(!provider.is_loaded());
        assert!(provider.get_config().is_none());
        assert!(provider.resolver().has_access("farmers", "profile").is_denied());
    }

    #[test]
    fn test_load_from_str() {
        let provider = ConfigProvider::new();
        let config = provider.load_config_from_str(DOC).unwrap();
        assert_eq!(config.roles.len(), 1);
        assert!(provider.is_loaded());
        assert!(provider.source().is_none());
    }

    #[test]
    fn test_failed_load_keeps_previous_config() {
        let provider = ConfigProvider::new();
        provider.load_config_from_str(DOC).unwrap();
        assert!(provider.load_config_from_str("<broken").is_err());
        assert_eq!(provider.get_config().unwrap().metadata.name, "T");
    }

    #[test]
    fn test_reload_without_source() {
        let provider = ConfigProvider::new();
        provider.load_config_from_str(DOC).unwrap();
        assert!(matches!(provider.reload(), Err(LoadError::NoSource)));
    }

    #[test]
    fn test_no_default_path_found() {
        let provider = ConfigProvider::with_default_paths(vec!["/nonexistent/rbac.xml".into()]);
        let err = provider.load_config(None).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn test_reset() {
        let provider = ConfigProvider::with_config(parser::parse(DOC).unwrap());
        assert!(provider.is_loaded());
        provider.reset();
        assert!(!provider.is_loaded());
    }
}
