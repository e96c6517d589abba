//! HTTP authorization middleware tests
//!
//! Drives a real axum router with `oneshot` requests; the role is attached
//! as a request extension the way an authentication layer would.

use axum::{
    Extension, Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
    middleware,
    routing::get,
};
use roastguard::config::{AccessLevel, ConfigProvider};
use roastguard::http::{AuthenticatedRole, FeatureGuard, GrantedAccess, require_feature};
use std::sync::Arc;
use tower::ServiceExt;

const SAMPLE: &str = include_str!("../config/rbac-config.xml");

// =============================================================================
// Test Helpers
// =============================================================================

fn loaded_provider() -> Arc<ConfigProvider> {
    let provider = ConfigProvider::new();
    provider
        .load_config_from_str(SAMPLE)
        .expect("sample document parses");
    Arc::new(provider)
}

async fn granted(Extension(access): Extension<GrantedAccess>) -> String {
    format!("{}:{}", access.feature, access.access_level)
}

fn app(guard: FeatureGuard) -> Router {
    Router::new()
        .route("/guarded", get(granted))
        .route_layer(middleware::from_fn_with_state(guard, require_feature))
}

fn request(role: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/guarded");
    if let Some(role) = role {
        builder = builder.extension(AuthenticatedRole(role.to_string()));
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_no_role_is_unauthorized() {
    let guard = FeatureGuard::new(loaded_provider(), "profile");
    let response = app(guard).oneshot(request(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_denied_feature_is_forbidden() {
    let guard = FeatureGuard::new(loaded_provider(), "farm-management");
    let response = app(guard)
        .oneshot(request(Some("affiliates-distributors")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"], "forbidden");
    assert_eq!(body["reason"], "Access denied");
}

#[tokio::test]
async fn test_unknown_role_is_forbidden() {
    let guard = FeatureGuard::new(loaded_provider(), "profile");
    let response = app(guard).oneshot(request(Some("ghost"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["reason"], "Role ghost not found");
}

#[tokio::test]
async fn test_below_minimum_is_forbidden() {
    let guard =
        FeatureGuard::new(loaded_provider(), "qr-certs").with_minimum(AccessLevel::Partial);
    let response = app(guard).oneshot(request(Some("roasters"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_meets_minimum_passes_granted_level() {
    let guard =
        FeatureGuard::new(loaded_provider(), "qr-certs").with_minimum(AccessLevel::Partial);
    let response = app(guard).oneshot(request(Some("hubs"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "qr-certs:partial");
}

#[tokio::test]
async fn test_any_level_passes_without_minimum() {
    let guard = FeatureGuard::new(loaded_provider(), "qr-certs");
    let response = app(guard).oneshot(request(Some("roasters"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "qr-certs:view-only");
}

#[tokio::test]
async fn test_unloaded_provider_fails_closed() {
    let guard = FeatureGuard::new(Arc::new(ConfigProvider::new()), "profile");
    let response = app(guard).oneshot(request(Some("farmers"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_reset_takes_effect_on_next_request() {
    let provider = loaded_provider();
    let guard = FeatureGuard::new(provider.clone(), "profile");
    let router = app(guard);

    let response = router
        .clone()
        .oneshot(request(Some("farmers")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    provider.reset();
    let response = router.oneshot(request(Some("farmers"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
