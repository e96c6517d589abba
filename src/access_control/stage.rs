//! Supply-chain stage access
//!
//! A second access dimension, independent of role/feature RBAC: what each
//! role category may do at each stage of the pipeline
//!
//! ```text
//! farm → crop → bean → roast → brew → retail
//! ```
//!
//! The table is fixed at compile time. Its access levels form a partial
//! order: `write-edit` satisfies everything, `view-verify` satisfies
//! `view-verify` and `view-only`, `view-only` satisfies only `view-only`.

use crate::access_control::role_category::RoleCategory;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::trace;

/// A stage of the supply chain, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplyChainStage {
    Farm,
    Crop,
    Bean,
    Roast,
    Brew,
    Retail,
}

impl SupplyChainStage {
    /// All stages in pipeline order
    pub const ALL: [SupplyChainStage; 6] = [
        SupplyChainStage::Farm,
        SupplyChainStage::Crop,
        SupplyChainStage::Bean,
        SupplyChainStage::Roast,
        SupplyChainStage::Brew,
        SupplyChainStage::Retail,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            SupplyChainStage::Farm => "farm",
            SupplyChainStage::Crop => "crop",
            SupplyChainStage::Bean => "bean",
            SupplyChainStage::Roast => "roast",
            SupplyChainStage::Brew => "brew",
            SupplyChainStage::Retail => "retail",
        }
    }

    pub fn try_parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.as_str() == s)
    }

    const fn position(&self) -> usize {
        match self {
            SupplyChainStage::Farm => 0,
            SupplyChainStage::Crop => 1,
            SupplyChainStage::Bean => 2,
            SupplyChainStage::Roast => 3,
            SupplyChainStage::Brew => 4,
            SupplyChainStage::Retail => 5,
        }
    }

    /// The following stage, `None` after `retail`
    pub fn next(&self) -> Option<Self> {
        Self::ALL.get(self.position() + 1).copied()
    }

    /// The preceding stage, `None` before `farm`
    pub fn previous(&self) -> Option<Self> {
        self.position()
            .checked_sub(1)
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// [`next`](Self::next) by stage name; `None` for unknown names
    pub fn next_by_name(name: &str) -> Option<Self> {
        Self::try_parse(name).and_then(|stage| stage.next())
    }

    /// [`previous`](Self::previous) by stage name; `None` for unknown names
    pub fn previous_by_name(name: &str) -> Option<Self> {
        Self::try_parse(name).and_then(|stage| stage.previous())
    }
}

impl fmt::Display for SupplyChainStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SupplyChainStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_parse(s).ok_or_else(|| format!("unknown supply-chain stage '{}'", s))
    }
}

/// Access a role category has at a stage
///
/// Distinct from [`AccessLevel`](crate::config::AccessLevel); the two are
/// never converted into one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageAccessLevel {
    WriteEdit,
    ViewOnly,
    ViewVerify,
    #[default]
    NoAccess,
}

impl StageAccessLevel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            StageAccessLevel::WriteEdit => "write-edit",
            StageAccessLevel::ViewOnly => "view-only",
            StageAccessLevel::ViewVerify => "view-verify",
            StageAccessLevel::NoAccess => "no-access",
        }
    }

    pub fn try_parse(s: &str) -> Option<Self> {
        match s {
            "write-edit" => Some(StageAccessLevel::WriteEdit),
            "view-only" => Some(StageAccessLevel::ViewOnly),
            "view-verify" => Some(StageAccessLevel::ViewVerify),
            "no-access" => Some(StageAccessLevel::NoAccess),
            _ => None,
        }
    }

    /// Whether holding this level meets a `required` level
    pub const fn satisfies(&self, required: StageAccessLevel) -> bool {
        match required {
            StageAccessLevel::ViewOnly => !matches!(self, StageAccessLevel::NoAccess),
            StageAccessLevel::ViewVerify => matches!(
                self,
                StageAccessLevel::ViewVerify | StageAccessLevel::WriteEdit
            ),
            StageAccessLevel::WriteEdit => matches!(self, StageAccessLevel::WriteEdit),
            StageAccessLevel::NoAccess => true,
        }
    }
}

impl fmt::Display for StageAccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StageAccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_parse(s).ok_or_else(|| format!("unknown stage access level '{}'", s))
    }
}

/// Per-category access at one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageRoleAccess {
    pub farmers: StageAccessLevel,
    pub roasters: StageAccessLevel,
    pub affiliates: StageAccessLevel,
    pub hubs: StageAccessLevel,
}

impl StageRoleAccess {
    pub const fn get(&self, category: RoleCategory) -> StageAccessLevel {
        match category {
            RoleCategory::Farmers => self.farmers,
            RoleCategory::Roasters => self.roasters,
            RoleCategory::Affiliates => self.affiliates,
            RoleCategory::Hubs => self.hubs,
        }
    }
}

/// One row of the matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageEntry {
    pub stage: SupplyChainStage,
    /// Data arriving from the previous stage
    pub inbound: Option<&'static str>,
    /// Data handed to the next stage
    pub outbound: Option<&'static str>,
    pub access: StageRoleAccess,
    /// Feature ids surfaced at this stage
    pub features: &'static [&'static str],
}

use StageAccessLevel::{NoAccess, ViewOnly, ViewVerify, WriteEdit};

const MATRIX: [StageEntry; 6] = [
    StageEntry {
        stage: SupplyChainStage::Farm,
        inbound: None,
        outbound: Some("harvest records"),
        access: StageRoleAccess {
            farmers: WriteEdit,
            roasters: ViewOnly,
            affiliates: ViewOnly,
            hubs: ViewVerify,
        },
        features: &["farm-management", "profile", "qr-certs"],
    },
    StageEntry {
        stage: SupplyChainStage::Crop,
        inbound: Some("harvest records"),
        outbound: Some("lot grading"),
        access: StageRoleAccess {
            farmers: WriteEdit,
            roasters: ViewVerify,
            affiliates: ViewOnly,
            hubs: ViewVerify,
        },
        features: &["crop-tracking", "qr-certs"],
    },
    StageEntry {
        stage: SupplyChainStage::Bean,
        inbound: Some("lot grading"),
        outbound: Some("green bean shipments"),
        access: StageRoleAccess {
            farmers: WriteEdit,
            roasters: ViewVerify,
            affiliates: ViewOnly,
            hubs: WriteEdit,
        },
        features: &["bean-inventory", "marketplace", "qr-certs"],
    },
    StageEntry {
        stage: SupplyChainStage::Roast,
        inbound: Some("green bean shipments"),
        outbound: Some("roast batches"),
        access: StageRoleAccess {
            farmers: ViewOnly,
            roasters: WriteEdit,
            affiliates: ViewOnly,
            hubs: ViewVerify,
        },
        features: &["roast-profiles", "qr-certs"],
    },
    StageEntry {
        stage: SupplyChainStage::Brew,
        inbound: Some("roast batches"),
        outbound: Some("brew recipes"),
        access: StageRoleAccess {
            farmers: NoAccess,
            roasters: WriteEdit,
            affiliates: WriteEdit,
            hubs: ViewOnly,
        },
        features: &["brew-guides", "qr-certs"],
    },
    StageEntry {
        stage: SupplyChainStage::Retail,
        inbound: Some("brew recipes"),
        outbound: None,
        access: StageRoleAccess {
            farmers: NoAccess,
            roasters: ViewVerify,
            affiliates: WriteEdit,
            hubs: WriteEdit,
        },
        features: &["marketplace", "orders", "analytics"],
    },
];

/// The fixed stage-access table and its queries
#[derive(Debug, Clone, Copy, Default)]
pub struct StageAccessMatrix;

impl StageAccessMatrix {
    pub const fn new() -> Self {
        Self
    }

    /// All rows in pipeline order
    pub fn entries(&self) -> &'static [StageEntry] {
        &MATRIX
    }

    /// The row for a stage
    pub fn entry(&self, stage: SupplyChainStage) -> &'static StageEntry {
        &MATRIX[stage.position()]
    }

    /// Access a category has at a stage
    pub fn access(&self, stage: SupplyChainStage, category: RoleCategory) -> StageAccessLevel {
        self.entry(stage).access.get(category)
    }

    /// Access by stage name; `no-access` for an unknown stage
    pub fn access_by_name(&self, stage: &str, category: RoleCategory) -> StageAccessLevel {
        match SupplyChainStage::try_parse(stage) {
            Some(stage) => self.access(stage, category),
            None => {
                trace!(stage, "Unknown supply-chain stage");
                StageAccessLevel::NoAccess
            }
        }
    }

    /// Whether a category meets `required` at a stage
    pub fn has_access(
        &self,
        stage: SupplyChainStage,
        category: RoleCategory,
        required: StageAccessLevel,
    ) -> bool {
        self.access(stage, category).satisfies(required)
    }

    /// [`has_access`](Self::has_access) with the default `view-only` requirement
    pub fn can_view(&self, stage: SupplyChainStage, category: RoleCategory) -> bool {
        self.has_access(stage, category, StageAccessLevel::ViewOnly)
    }

    /// Features shown at a stage, empty when the category has no access there
    pub fn features(&self, stage: SupplyChainStage, category: RoleCategory) -> &'static [&'static str] {
        if self.access(stage, category) == StageAccessLevel::NoAccess {
            &[]
        } else {
            self.entry(stage).features
        }
    }

    /// Whether a category may advance work from `from` to `to`
    ///
    /// Only a move to the immediate successor is ever allowed, and only with
    /// `write-edit` at the destination.
    pub fn can_transition(
        &self,
        from: SupplyChainStage,
        to: SupplyChainStage,
        category: RoleCategory,
    ) -> bool {
        from.next() == Some(to) && self.access(to, category) == StageAccessLevel::WriteEdit
    }
}
