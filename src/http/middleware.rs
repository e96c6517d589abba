//! Feature authorization middleware
//!
//! Guards an axum route behind an RBAC feature. The authentication layer in
//! front of it is expected to insert an [`AuthenticatedRole`] into the request
//! extensions; this middleware only authorizes.
//!
//! - no role on the request → `401 Unauthorized`
//! - role denied the feature → `403 Forbidden`
//! - role below the required level → `403 Forbidden`
//! - no configuration loaded → `403 Forbidden`
//!
//! On success the granted level is attached as a [`GrantedAccess`] extension
//! for the handler.
//!
//! ```ignore
//! let guard = FeatureGuard::new(provider, "farm-management").with_minimum(AccessLevel::Partial);
//! let app = Router::new()
//!     .route("/farms", post(create_farm))
//!     .route_layer(middleware::from_fn_with_state(guard, require_feature));
//! ```

use crate::config::{AccessLevel, ConfigProvider};
use crate::error::AccessDeniedError;
use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Role of the authenticated caller, set by the authentication layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedRole(pub String);

/// Access granted to the current request, set by [`require_feature`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantedAccess {
    pub feature: String,
    pub access_level: AccessLevel,
}

/// Why a request was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationFailure {
    /// No role attached to the request
    Unauthenticated,
    /// Role attached but not permitted
    Forbidden(AccessDeniedError),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    reason: String,
}

impl IntoResponse for AuthorizationFailure {
    fn into_response(self) -> Response {
        match self {
            AuthorizationFailure::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorBody {
                    error: "unauthorized",
                    reason: "no role attached to request".to_string(),
                }),
            )
                .into_response(),
            AuthorizationFailure::Forbidden(denied) => (
                StatusCode::FORBIDDEN,
                Json(ErrorBody {
                    error: "forbidden",
                    reason: denied.reason,
                }),
            )
                .into_response(),
        }
    }
}

/// Middleware state: the feature a route needs and how much of it
#[derive(Clone)]
pub struct FeatureGuard {
    provider: Arc<ConfigProvider>,
    feature: Arc<str>,
    minimum: Option<AccessLevel>,
}

impl FeatureGuard {
    pub fn new(provider: Arc<ConfigProvider>, feature: impl Into<Arc<str>>) -> Self {
        Self {
            provider,
            feature: feature.into(),
            minimum: None,
        }
    }

    /// Require at least `level` instead of any non-`no` level
    pub fn with_minimum(mut self, level: AccessLevel) -> Self {
        self.minimum = Some(level);
        self
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    /// Decide a request for the given role
    pub fn authorize(&self, role: Option<&str>) -> Result<AccessLevel, AuthorizationFailure> {
        let role = role.ok_or(AuthorizationFailure::Unauthenticated)?;

        if !self.provider.is_loaded() {
            warn!(feature = %self.feature, "No RBAC configuration loaded, refusing request");
            return Err(AuthorizationFailure::Forbidden(
                AccessDeniedError::unavailable(self.feature.as_ref()),
            ));
        }

        // A denied decision already fails `require`, so `no` is the floor here.
        let minimum = self.minimum.unwrap_or(AccessLevel::No);
        self.provider
            .resolver()
            .require(role, &self.feature, minimum)
            .map_err(AuthorizationFailure::Forbidden)
    }
}

/// Authorize the request against the guard's feature
pub async fn require_feature(
    State(guard): State<FeatureGuard>,
    mut request: Request,
    next: Next,
) -> Response {
    let role = request
        .extensions()
        .get::<AuthenticatedRole>()
        .map(|role| role.0.clone());

    match guard.authorize(role.as_deref()) {
        Ok(access_level) => {
            debug!(
                role = role.as_deref().unwrap_or_default(),
                feature = guard.feature(),
                level = %access_level,
                "Request authorized"
            );
            request.extensions_mut().insert(GrantedAccess {
                feature: guard.feature().to_string(),
                access_level,
            });
            next.run(request).await
        }
        Err(failure) => {
            debug!(
                role = ?role,
                feature = guard.feature(),
                failure = ?failure,
                "Request refused"
            );
            failure.into_response()
        }
    }
}
