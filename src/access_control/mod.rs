//! Access control module
//!
//! Two independent access dimensions:
//!
//! 1. **Role/feature RBAC** ([`PermissionResolver`]) - driven by the loaded
//!    [`RbacConfig`](crate::config::RbacConfig). A role holds each feature at
//!    one of `full`, `partial`, `view-only` or `no`.
//! 2. **Supply-chain stages** ([`StageAccessMatrix`]) - a fixed table giving
//!    each [`RoleCategory`] a [`StageAccessLevel`] at each stage from `farm`
//!    to `retail`.
//!
//! The two never share level types. Callers bridge role ids to stage
//! categories explicitly with [`RoleCategory::from_role_id`].
//!
//! ## Resolution rules
//!
//! - Unknown role → denied, `"Role <id> not found"`
//! - Role lacks the feature → denied, `"Feature <id> not available to role <id>"`
//! - Role holds the feature at `no` → denied, `"Access denied"`
//! - Otherwise allowed at the configured level

pub mod resolver;
pub mod role_category;
pub mod stage;

pub use resolver::{AccessDecision, FeatureGrant, PermissionResolver};
pub use role_category::RoleCategory;
pub use stage::{StageAccessLevel, StageAccessMatrix, StageEntry, SupplyChainStage};
