//! Supply-chain role categories
//!
//! The stage-access matrix is keyed by a fixed four-way taxonomy rather than
//! by RBAC role ids. [`RoleCategory::from_role_id`] is the one place where the
//! two id spaces meet.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role category used by the stage-access matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleCategory {
    Farmers,
    Roasters,
    Affiliates,
    Hubs,
}

impl RoleCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RoleCategory::Farmers => "farmers",
            RoleCategory::Roasters => "roasters",
            RoleCategory::Affiliates => "affiliates",
            RoleCategory::Hubs => "hubs",
        }
    }

    pub fn try_parse(s: &str) -> Option<Self> {
        match s {
            "farmers" => Some(RoleCategory::Farmers),
            "roasters" => Some(RoleCategory::Roasters),
            "affiliates" => Some(RoleCategory::Affiliates),
            "hubs" => Some(RoleCategory::Hubs),
            _ => None,
        }
    }

    /// Map an RBAC role id onto its supply-chain category
    ///
    /// Returns `None` for roles that take no part in the pipeline (e.g. `admin`).
    pub fn from_role_id(role_id: &str) -> Option<Self> {
        match role_id {
            "farmers" | "farmer" => Some(RoleCategory::Farmers),
            "roasters" | "roaster" => Some(RoleCategory::Roasters),
            "affiliates" | "affiliates-distributors" | "distributors" => {
                Some(RoleCategory::Affiliates)
            }
            "hubs" | "hub-operators" => Some(RoleCategory::Hubs),
            _ => None,
        }
    }

    pub fn all() -> &'static [RoleCategory] {
        &[
            RoleCategory::Farmers,
            RoleCategory::Roasters,
            RoleCategory::Affiliates,
            RoleCategory::Hubs,
        ]
    }
}

impl fmt::Display for RoleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RoleCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_parse(s).ok_or_else(|| format!("unknown role category '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_roundtrip() {
        for category in RoleCategory::all() {
            assert_eq!(RoleCategory::try_parse(category.as_str()), Some(*category));
        }
    }

    #[test]
    fn test_from_role_id() {
        assert_eq!(
            RoleCategory::from_role_id("farmers"),
            Some(RoleCategory::Farmers)
        );
        assert_eq!(
            RoleCategory::from_role_id("affiliates-distributors"),
            Some(RoleCategory::Affiliates)
        );
        assert_eq!(
            RoleCategory::from_role_id("hub-operators"),
            Some(RoleCategory::Hubs)
        );
        assert_eq!(RoleCategory::from_role_id("admin"), None);
        assert_eq!(RoleCategory::from_role_id(""), None);
    }

    #[test]
    fn test_canonical_ids_map_to_themselves() {
        for category in RoleCategory::all() {
            assert_eq!(RoleCategory::from_role_id(category.as_str()), Some(*category));
        }
    }
}
