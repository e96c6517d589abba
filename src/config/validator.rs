//! RBAC configuration validation
//!
//! Semantic checks on a parsed [`RbacConfig`]: completeness, id uniqueness and
//! referential integrity. Every problem found is reported, not just the first,
//! so an operator can fix a document in one pass.
//!
//! Checks that walk roles or features only run once the collection they walk
//! is present, so a missing `roles` section yields the one "missing roles"
//! error rather than a cascade of reference errors.

use crate::config::types::{AccessLevel, RbacConfig};
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

/// Outcome of validating a configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Validate a configuration that may not have been loaded at all
pub fn validate_optional(config: Option<&RbacConfig>) -> ValidationResult {
    match config {
        Some(config) => validate(config),
        None => ValidationResult::from_errors(vec![
            "Configuration is missing or null".to_string(),
        ]),
    }
}

/// Validate a configuration
///
/// Never fails; all findings are returned in [`ValidationResult::errors`].
pub fn validate(config: &RbacConfig) -> ValidationResult {
    let mut errors = Vec::new();

    check_metadata(config, &mut errors);

    let has_roles = !config.roles.is_empty();
    let has_features = !config.features.is_empty();
    let has_access_levels = !config.access_levels.is_empty();

    if !has_roles {
        errors.push("Missing or empty roles".to_string());
    }
    if !has_features {
        errors.push("Missing or empty feature catalog".to_string());
    }
    if !has_access_levels {
        errors.push("Missing or empty access levels".to_string());
    }

    if has_access_levels {
        let defined: HashSet<&str> = config.access_levels.iter().map(|l| l.id.as_str()).collect();
        for level in AccessLevel::all() {
            if !defined.contains(level.as_str()) {
                errors.push(format!("Missing required access level: {}", level));
            }
        }
        check_unique(
            "access level",
            config.access_levels.iter().map(|l| l.id.as_str()),
            &mut errors,
        );
    }

    if has_roles {
        check_unique("role", config.roles.iter().map(|r| r.id.as_str()), &mut errors);
    }
    if has_features {
        check_unique(
            "feature",
            config.features.iter().map(|f| f.id.as_str()),
            &mut errors,
        );
    }
    check_unique(
        "category",
        config.categories.iter().map(|c| c.id.as_str()),
        &mut errors,
    );
    check_unique(
        "connection type",
        config.connection_types.iter().map(|c| c.id.as_str()),
        &mut errors,
    );

    if has_roles {
        check_roles(config, has_features, &mut errors);
    }
    if has_features {
        check_feature_categories(config, &mut errors);
    }

    debug!(errors = errors.len(), "Validated RBAC configuration");

    ValidationResult::from_errors(errors)
}

fn check_metadata(config: &RbacConfig, errors: &mut Vec<String>) {
    let metadata = &config.metadata;
    for (field, value) in [
        ("name", &metadata.name),
        ("version", &metadata.version),
        ("description", &metadata.description),
    ] {
        if value.trim().is_empty() {
            errors.push(format!("Missing or empty metadata.{}", field));
        }
    }
}

fn check_unique<'a>(
    kind: &str,
    ids: impl Iterator<Item = &'a str>,
    errors: &mut Vec<String>,
) {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for id in ids {
        if !seen.insert(id) && reported.insert(id) {
            errors.push(format!("Duplicate {} id: {}", kind, id));
        }
    }
}

fn check_roles(config: &RbacConfig, has_features: bool, errors: &mut Vec<String>) {
    let catalog: HashSet<&str> = config.features.iter().map(|f| f.id.as_str()).collect();
    let connection_types: HashSet<&str> = config
        .connection_types
        .iter()
        .map(|c| c.id.as_str())
        .collect();

    for (index, role) in config.roles.iter().enumerate() {
        if role.id.trim().is_empty() {
            errors.push(format!("Role at position {} has an empty id", index));
        }
        if role.name.trim().is_empty() {
            errors.push(format!("Role '{}' has an empty name", role.id));
        }

        // Closed enum; only its definition can be missing.
        if !connection_types.is_empty() && !connection_types.contains(role.connection_type.as_str())
        {
            errors.push(format!(
                "Role '{}' uses connection type '{}' which is not defined",
                role.id, role.connection_type
            ));
        }

        let mut seen = HashSet::new();
        for feature in &role.features {
            if !seen.insert(feature.id.as_str()) {
                errors.push(format!(
                    "Role '{}' lists feature '{}' more than once",
                    role.id, feature.id
                ));
            }
            if has_features && !catalog.contains(feature.id.as_str()) {
                errors.push(format!(
                    "Role '{}' references unknown feature '{}'",
                    role.id, feature.id
                ));
            }
        }
    }
}

fn check_feature_categories(config: &RbacConfig, errors: &mut Vec<String>) {
    let categories: HashSet<&str> = config.categories.iter().map(|c| c.id.as_str()).collect();
    for feature in &config.features {
        if !categories.contains(feature.category.as_str()) {
            errors.push(format!(
                "Feature '{}' references unknown category '{}'",
                feature.id, feature.category
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{
        AccessLevelDefinition, Category, ConnectionType, ConnectionTypeDefinition, Feature,
        Metadata, Role, RoleFeature,
    };

    fn definition(id: &str) -> AccessLevelDefinition {
        AccessLevelDefinition {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
        }
    }

    fn valid_config() -> RbacConfig {
        RbacConfig {
            metadata: Metadata {
                name: "Test".to_string(),
                version: "1.0.0".to_string(),
                description: "Test config".to_string(),
            },
            roles: vec![Role {
                id: "farmers".to_string(),
                name: "Farmers".to_string(),
                connection_type: ConnectionType::Pink,
                features: vec![RoleFeature {
                    id: "profile".to_string(),
                    name: "Profile".to_string(),
                    access_level: AccessLevel::Full,
                    description: None,
                }],
            }],
            features: vec![Feature {
                id: "profile".to_string(),
                name: "Profile".to_string(),
                category: "core".to_string(),
                description: None,
            }],
            access_levels: ["full", "partial", "view-only", "no"]
                .into_iter()
                .map(definition)
                .collect(),
            categories: vec![Category {
                id: "core".to_string(),
                name: "Core".to_string(),
                description: None,
            }],
            connection_types: vec![
                ConnectionTypeDefinition {
                    id: "pink".to_string(),
                    name: "Pink".to_string(),
                    description: None,
                },
                ConnectionTypeDefinition {
                    id: "purple".to_string(),
                    name: "Purple".to_string(),
                    description: None,
                },
            ],
        }
    }

    #[test]
    fn test_valid_config() {
        let result = validate(&valid_config());
        assert!(result.valid, "unexpected errors: {:?}", result.errors);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_absent_config() {
        let result = validate_optional(None);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_missing_access_level() {
        let mut config = valid_config();
        config.access_levels.retain(|l| l.id != "partial");
        let result = validate(&config);
        assert!(!result.valid);
        assert_eq!(result.errors, vec!["Missing required access level: partial"]);
    }

    #[test]
    fn test_duplicate_reported_once() {
        let mut config = valid_config();
        config.categories.push(config.categories[0].clone());
        config.categories.push(config.categories[0].clone());
        let result = validate(&config);
        assert_eq!(result.errors, vec!["Duplicate category id: core"]);
    }

    #[test]
    fn test_errors_accumulate() {
        let mut config = valid_config();
        config.metadata.version = String::new();
        config.roles[0].name = String::new();
        config.features[0].category = "ghost".to_string();
        let result = validate(&config);
        assert_eq!(result.errors.len(), 3);
    }

    #[test]
    fn test_undefined_connection_type() {
        let mut config = valid_config();
        config.connection_types.retain(|c| c.id != "pink");
        let result = validate(&config);
        assert!(result.errors[0].contains("not defined"));
    }
}
