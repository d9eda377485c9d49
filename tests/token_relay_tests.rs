// Tests for the token provider and the relay endpoint
//
// Credential failures must surface as a 500 with a non-empty error field,
// matching what the browser client expects from the relay.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tabscribe::{create_router, AppState, AuthError, RefreshTokenProvider, StaticTokenProvider, TokenProvider};
use tempfile::TempDir;
use tower::ServiceExt;

async fn get(router: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);

    (status, json)
}

// ============================================================================
// RefreshTokenProvider credential handling
// ============================================================================

#[tokio::test]
async fn test_absent_credentials_file_is_credentials_invalid() {
    let temp_dir = TempDir::new().unwrap();
    let provider = RefreshTokenProvider::new(temp_dir.path().join("missing.json"));

    let err = provider.access_token().await.unwrap_err();
    assert!(matches!(err, AuthError::CredentialsInvalid(_)));
}

#[tokio::test]
async fn test_malformed_credentials_file_is_credentials_invalid() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("credential.json");
    std::fs::write(&path, "{ not json").unwrap();

    let provider = RefreshTokenProvider::new(&path);

    let err = provider.access_token().await.unwrap_err();
    assert!(matches!(err, AuthError::CredentialsInvalid(_)));
}

#[tokio::test]
async fn test_wrong_credential_type_is_credentials_invalid() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("credential.json");
    std::fs::write(
        &path,
        serde_json::json!({
            "type": "service_account",
            "client_id": "id",
            "client_secret": "secret",
            "refresh_token": "refresh"
        })
        .to_string(),
    )
    .unwrap();

    let provider = RefreshTokenProvider::new(&path);

    let err = provider.access_token().await.unwrap_err();
    assert!(matches!(err, AuthError::CredentialsInvalid(_)));
}

// ============================================================================
// Relay endpoint
// ============================================================================

#[tokio::test]
async fn test_get_token_returns_access_token() {
    let state = AppState::new(Arc::new(StaticTokenProvider::new("token-123")));
    let router = create_router(state);

    let (status, body) = get(router, "/get-token").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accessToken"], "token-123");
}

#[tokio::test]
async fn test_get_token_with_absent_credentials_returns_500() {
    let temp_dir = TempDir::new().unwrap();
    let provider = RefreshTokenProvider::new(temp_dir.path().join("missing.json"));
    let router = create_router(AppState::new(Arc::new(provider)));

    let (status, body) = get(router, "/get-token").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = body["error"].as_str().unwrap();
    assert!(!error.is_empty());
}

#[tokio::test]
async fn test_health_check() {
    let state = AppState::new(Arc::new(StaticTokenProvider::new("t")));
    let router = create_router(state);

    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

/// Provider that always fails, for exercising the error path shape.
struct FailingProvider;

#[async_trait::async_trait]
impl TokenProvider for FailingProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        Err(AuthError::NetworkError("identity provider unreachable".to_string()))
    }
}

#[tokio::test]
async fn test_network_failure_also_maps_to_500() {
    let router = create_router(AppState::new(Arc::new(FailingProvider)));

    let (status, body) = get(router, "/get-token").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("unreachable"));
}
