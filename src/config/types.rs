//! RBAC configuration types
//!
//! The typed model of a loaded RBAC document. Every value here is immutable
//! once built by the parser; a new configuration replaces an old one wholesale.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access level a role holds on a feature
///
/// Ordered by capability: `no < view-only < partial < full`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum AccessLevel {
    /// No access
    #[default]
    No,
    /// Read-only access
    ViewOnly,
    /// Restricted write access
    Partial,
    /// Unrestricted access
    Full,
}

impl AccessLevel {
    /// Get the level's identifier as used in configuration documents
    pub const fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Full => "full",
            AccessLevel::Partial => "partial",
            AccessLevel::ViewOnly => "view-only",
            AccessLevel::No => "no",
        }
    }

    /// Try to parse a level from its identifier
    pub fn try_parse(s: &str) -> Option<Self> {
        match s {
            "full" => Some(AccessLevel::Full),
            "partial" => Some(AccessLevel::Partial),
            "view-only" => Some(AccessLevel::ViewOnly),
            "no" => Some(AccessLevel::No),
            _ => None,
        }
    }

    /// Numeric rank in the capability order (`no` = 0 ... `full` = 3)
    pub const fn rank(&self) -> u8 {
        match self {
            AccessLevel::No => 0,
            AccessLevel::ViewOnly => 1,
            AccessLevel::Partial => 2,
            AccessLevel::Full => 3,
        }
    }

    /// Whether this level is at least `minimum`
    pub const fn meets(&self, minimum: AccessLevel) -> bool {
        self.rank() >= minimum.rank()
    }

    /// Whether this level grants any access at all
    pub const fn grants_access(&self) -> bool {
        !matches!(self, AccessLevel::No)
    }

    /// Whether this level permits modifications
    pub const fn can_write(&self) -> bool {
        matches!(self, AccessLevel::Full | AccessLevel::Partial)
    }

    /// All levels, highest first; a valid configuration defines every one
    pub fn all() -> &'static [AccessLevel] {
        &[
            AccessLevel::Full,
            AccessLevel::Partial,
            AccessLevel::ViewOnly,
            AccessLevel::No,
        ]
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_parse(s).ok_or_else(|| format!("unknown access level '{}'", s))
    }
}

/// Cosmetic grouping attribute of a role
///
/// Never consulted when resolving permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Pink,
    #[default]
    Purple,
}

impl ConnectionType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Pink => "pink",
            ConnectionType::Purple => "purple",
        }
    }

    pub fn try_parse(s: &str) -> Option<Self> {
        match s {
            "pink" => Some(ConnectionType::Pink),
            "purple" => Some(ConnectionType::Purple),
            _ => None,
        }
    }

    pub fn all() -> &'static [ConnectionType] {
        &[ConnectionType::Pink, ConnectionType::Purple]
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Document metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub version: String,
    pub description: String,
}

/// Grouping tag for catalog features
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Descriptive entry for a [`ConnectionType`] value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTypeDefinition {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Descriptive entry for an [`AccessLevel`] value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLevelDefinition {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A protectable unit of functionality in the feature catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A catalog feature as granted to a specific role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleFeature {
    pub id: String,
    pub name: String,
    pub access_level: AccessLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A named actor class and its per-feature grants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub connection_type: ConnectionType,
    pub features: Vec<RoleFeature>,
}

impl Role {
    /// Find this role's grant for a feature
    pub fn feature(&self, feature_id: &str) -> Option<&RoleFeature> {
        self.features.iter().find(|f| f.id == feature_id)
    }
}

/// A complete RBAC document
///
/// The unit of parsing, validation and caching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RbacConfig {
    pub metadata: Metadata,
    pub roles: Vec<Role>,
    pub features: Vec<Feature>,
    pub access_levels: Vec<AccessLevelDefinition>,
    pub categories: Vec<Category>,
    pub connection_types: Vec<ConnectionTypeDefinition>,
}

impl RbacConfig {
    /// Look up a role by id (first match wins)
    pub fn role(&self, role_id: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == role_id)
    }

    /// Look up a catalog feature by id
    pub fn feature(&self, feature_id: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == feature_id)
    }

    /// Look up a category by id
    pub fn category(&self, category_id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == category_id)
    }
}
