use super::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::{error, info};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /get-token
/// Fetch a fresh access token for the speech API
pub async fn get_token(State(state): State<AppState>) -> impl IntoResponse {
    match state.tokens.access_token().await {
        Ok(token) => {
            info!("Issued access token");
            (
                StatusCode::OK,
                Json(TokenResponse {
                    access_token: token,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Error getting access token: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
