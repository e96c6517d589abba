//! Roastguard
//!
//! Role-based access control for a multi-tenant coffee supply-chain platform.
//!
//! ## Features
//!
//! - **RBAC documents** in XML with a lenient parser and a strict validator
//! - **Permission resolution** per role and feature at `full`, `partial`,
//!   `view-only` or `no`
//! - **Supply-chain stage access** from `farm` to `retail`, with stage
//!   transition checks
//! - **Axum middleware** for guarding HTTP routes by feature
//!
//! ## Lifecycle
//!
//! ```text
//! XML document → parser → RbacConfig → validator → ConfigProvider → PermissionResolver
//! ```
//!
//! The caller validates after loading and refuses to start on errors; when no
//! configuration is available every check denies.
//!
//! ## Example
//!
//! ```no_run
//! use roastguard::config::ConfigProvider;
//!
//! let provider = ConfigProvider::new();
//! provider.load_validated(None)?;
//!
//! let resolver = provider.resolver();
//! if resolver.can_write("farmers", "farm-management") {
//!     // show the edit controls
//! }
//! # Ok::<(), roastguard::AppError>(())
//! ```

pub mod access_control;
pub mod config;
pub mod error;
pub mod http;

// Re-export main types
pub use access_control::{
    AccessDecision, PermissionResolver, RoleCategory, StageAccessLevel, StageAccessMatrix,
    SupplyChainStage,
};
pub use config::{AccessLevel, ConfigProvider, RbacConfig, Settings, load_settings};
pub use error::{AppError, LoadError, ParseError, Result};
