//! Permission resolver
//!
//! Answers "may role R use feature F, and how much?" against a loaded
//! [`RbacConfig`]. Resolution is total: unknown roles and features resolve to
//! a denial carrying a reason, never to an error.
//!
//! Derived checks follow the access-level order `no < view-only < partial < full`:
//! - `has_full_access`: allowed at `full`
//! - `can_write`: allowed at `full` or `partial`
//! - `can_read`: allowed at any level other than `no`

use crate::config::{AccessLevel, RbacConfig, Role, RoleFeature};
use crate::error::AccessDeniedError;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Reason attached to a feature the role holds at level `no`
pub const ACCESS_DENIED_REASON: &str = "Access denied";

/// Result of a permission check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub access_level: AccessLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AccessDecision {
    fn granted(access_level: AccessLevel) -> Self {
        Self {
            allowed: true,
            access_level,
            reason: None,
        }
    }

    fn denied(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            access_level: AccessLevel::No,
            reason: Some(reason.into()),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    pub fn is_denied(&self) -> bool {
        !self.allowed
    }
}

/// A role holding a feature at some usable level
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureGrant {
    pub role_id: String,
    pub access_level: AccessLevel,
}

/// Permission resolver
///
/// Holds a shared, immutable configuration plus a role index. Cheap to clone
/// the underlying config handle; build a new resolver after a reload.
#[derive(Debug, Clone)]
pub struct PermissionResolver {
    config: Arc<RbacConfig>,
    /// Role id → position of its first occurrence in `config.roles`
    role_index: HashMap<String, usize>,
}

impl PermissionResolver {
    /// Create a resolver over a configuration
    pub fn new(config: Arc<RbacConfig>) -> Self {
        let mut role_index = HashMap::with_capacity(config.roles.len());
        for (position, role) in config.roles.iter().enumerate() {
            role_index.entry(role.id.clone()).or_insert(position);
        }
        Self { config, role_index }
    }

    /// Create a resolver that denies everything
    ///
    /// Used when no configuration could be loaded.
    pub fn deny_all() -> Self {
        Self::new(Arc::new(RbacConfig::default()))
    }

    /// The configuration this resolver answers from
    pub fn config(&self) -> &RbacConfig {
        &self.config
    }

    /// Shared handle to the configuration
    pub fn shared_config(&self) -> Arc<RbacConfig> {
        self.config.clone()
    }

    fn role(&self, role_id: &str) -> Option<&Role> {
        self.role_index
            .get(role_id)
            .and_then(|&position| self.config.roles.get(position))
    }

    /// Check whether a role may use a feature
    pub fn has_access(&self, role_id: &str, feature_id: &str) -> AccessDecision {
        let Some(role) = self.role(role_id) else {
            trace!(role = role_id, "Unknown role");
            return AccessDecision::denied(format!("Role {} not found", role_id));
        };

        let Some(feature) = role.feature(feature_id) else {
            trace!(role = role_id, feature = feature_id, "Feature not granted to role");
            return AccessDecision::denied(format!(
                "Feature {} not available to role {}",
                feature_id, role_id
            ));
        };

        let decision = if feature.access_level.grants_access() {
            AccessDecision::granted(feature.access_level)
        } else {
            AccessDecision::denied(ACCESS_DENIED_REASON)
        };

        debug!(
            role = role_id,
            feature = feature_id,
            level = %decision.access_level,
            allowed = decision.allowed,
            "Checked access"
        );

        decision
    }

    /// Whether the role holds the feature at `full`
    pub fn has_full_access(&self, role_id: &str, feature_id: &str) -> bool {
        let decision = self.has_access(role_id, feature_id);
        decision.allowed && decision.access_level == AccessLevel::Full
    }

    /// Whether the role may modify the feature (`full` or `partial`)
    pub fn can_write(&self, role_id: &str, feature_id: &str) -> bool {
        let decision = self.has_access(role_id, feature_id);
        decision.allowed && decision.access_level.can_write()
    }

    /// Whether the role may see the feature at all
    pub fn can_read(&self, role_id: &str, feature_id: &str) -> bool {
        self.has_access(role_id, feature_id).allowed
    }

    /// The role's feature grants, or an empty slice for an unknown role
    pub fn role_features(&self, role_id: &str) -> &[RoleFeature] {
        self.role(role_id)
            .map(|role| role.features.as_slice())
            .unwrap_or(&[])
    }

    /// Every role holding the feature above `no`, in configuration order
    pub fn feature_roles(&self, feature_id: &str) -> Vec<FeatureGrant> {
        self.config
            .roles
            .iter()
            .filter_map(|role| {
                role.feature(feature_id)
                    .filter(|f| f.access_level.grants_access())
                    .map(|f| FeatureGrant {
                        role_id: role.id.clone(),
                        access_level: f.access_level,
                    })
            })
            .collect()
    }

    /// The role's grants for catalog features tagged with `category_id`
    ///
    /// Filters by category only; grants at level `no` are kept.
    pub fn features_by_category(&self, role_id: &str, category_id: &str) -> Vec<&RoleFeature> {
        let in_category: Vec<&str> = self
            .config
            .features
            .iter()
            .filter(|f| f.category == category_id)
            .map(|f| f.id.as_str())
            .collect();

        self.role_features(role_id)
            .iter()
            .filter(|f| in_category.contains(&f.id.as_str()))
            .collect()
    }

    /// Require at least `minimum` access, returning the granted level
    pub fn require(
        &self,
        role_id: &str,
        feature_id: &str,
        minimum: AccessLevel,
    ) -> Result<AccessLevel, AccessDeniedError> {
        let decision = self.has_access(role_id, feature_id);
        if !decision.allowed {
            let reason = decision
                .reason
                .unwrap_or_else(|| ACCESS_DENIED_REASON.to_string());
            return Err(AccessDeniedError::new(role_id, feature_id, reason));
        }
        if !decision.access_level.meets(minimum) {
            return Err(AccessDeniedError::insufficient_level(
                role_id,
                feature_id,
                decision.access_level,
                minimum,
            ));
        }
        Ok(decision.access_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionType, Feature};

    fn grant(id: &str, level: AccessLevel) -> RoleFeature {
        RoleFeature {
            id: id.to_string(),
            name: id.to_string(),
            access_level: level,
            description: None,
        }
    }

    fn resolver() -> PermissionResolver {
        let config = RbacConfig {
            roles: vec![
                Role {
                    id: "farmers".to_string(),
                    name: "Farmers".to_string(),
                    connection_type: ConnectionType::Pink,
                    features: vec![
                        grant("profile", AccessLevel::Full),
                        grant("orders", AccessLevel::No),
                    ],
                },
                Role {
                    id: "roasters".to_string(),
                    name: "Roasters".to_string(),
                    connection_type: ConnectionType::Purple,
                    features: vec![grant("profile", AccessLevel::Partial)],
                },
            ],
            features: vec![
                Feature {
                    id: "profile".to_string(),
                    name: "Profile".to_string(),
                    category: "core".to_string(),
                    description: None,
                },
                Feature {
                    id: "orders".to_string(),
                    name: "Orders".to_string(),
                    category: "commerce".to_string(),
                    description: None,
                },
            ],
            ..Default::default()
        };
        PermissionResolver::new(Arc::new(config))
    }

    #[test]
    fn test_granted() {
        let decision = resolver().has_access("farmers", "profile");
        assert!(decision.is_allowed());
        assert_eq!(decision.access_level, AccessLevel::Full);
        assert_eq!(decision.reason, None);
    }

    #[test]
    fn test_explicit_no() {
        let decision = resolver().has_access("farmers", "orders");
        assert!(decision.is_denied());
        assert_eq!(decision.reason.as_deref(), Some(ACCESS_DENIED_REASON));
    }

    #[test]
    fn test_unknown_role() {
        let decision = resolver().has_access("ghost", "profile");
        assert_eq!(decision.reason.as_deref(), Some("Role ghost not found"));
        assert_eq!(decision.access_level, AccessLevel::No);
    }

    #[test]
    fn test_feature_not_granted() {
        let decision = resolver().has_access("roasters", "orders");
        assert_eq!(
            decision.reason.as_deref(),
            Some("Feature orders not available to role roasters")
        );
    }

    #[test]
    fn test_deny_all() {
        let resolver = PermissionResolver::deny_all();
        assert!(resolver.has_access("farmers", "profile").is_denied());
        assert!(resolver.role_features("farmers").is_empty());
    }

    #[test]
    fn test_require() {
        let resolver = resolver();
        assert_eq!(
            resolver.require("roasters", "profile", AccessLevel::ViewOnly),
            Ok(AccessLevel::Partial)
        );
        let err = resolver
            .require("roasters", "profile", AccessLevel::Full)
            .unwrap_err();
        assert!(err.reason.contains("full"));
        let err = resolver
            .require("ghost", "profile", AccessLevel::No)
            .unwrap_err();
        assert_eq!(err.reason, "Role ghost not found");
    }

    #[test]
    fn test_features_by_category_keeps_no_level() {
        let resolver = resolver();
        let commerce = resolver.features_by_category("farmers", "commerce");
        assert_eq!(commerce.len(), 1);
        assert_eq!(commerce[0].id, "orders");
        assert_eq!(commerce[0].access_level, AccessLevel::No);
    }
}
