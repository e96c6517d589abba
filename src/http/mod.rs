//! HTTP integration
//!
//! Axum middleware that puts RBAC checks in front of routes.

pub mod middleware;

pub use middleware::{
    AuthenticatedRole, AuthorizationFailure, FeatureGuard, GrantedAccess, require_feature,
};
