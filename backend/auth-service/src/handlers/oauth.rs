/// OAuth handlers
use actix_web::{web, HttpResponse};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::AuthError,
    models::oauth::{CompleteOAuthFlowRequest, OAuthProvider, StartOAuthFlowRequest},
    AppState,
};

/// OAuth flow start response
#[derive(Debug, Serialize)]
pub struct StartOAuthFlowResponse {
    pub auth_url: String,
    pub state: String,
}

/// OAuth completion response with tokens
#[derive(Debug, Serialize)]
pub struct OAuthLoginResponse {
    pub user_id: Uuid,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
    pub is_new_user: bool,
}

/// Start OAuth authorization flow
pub async fn start_oauth_flow(
    _state: web::Data<AppState>,
    payload: web::Json<StartOAuthFlowRequest>,
) -> Result<HttpResponse, AuthError> {
    // Parse provider
    let _provider =
        OAuthProvider::from_str(&payload.provider).ok_or(AuthError::InvalidOAuthProvider)?;

    // Generate state token for CSRF protection
    let state = uuid::Uuid::new_v4().to_string();

    // Build OAuth authorization URL
    // This would connect to the actual provider (Google, Apple, etc.)
    let auth_url = format!("https://oauth.example.com/authorize?state={}", state);

    Ok(HttpResponse::Ok().json(StartOAuthFlowResponse { auth_url, state }))
}

/// Complete OAuth authorization flow
pub async fn complete_oauth_flow(
    _state: web::Data<AppState>,
    payload: web::Json<CompleteOAuthFlowRequest>,
) -> Result<HttpResponse, AuthError> {
    // Parse provider
    let _provider =
        OAuthProvider::from_str(&payload.provider).ok_or(AuthError::InvalidOAuthProvider)?;

    // Verify state token
    // Exchange authorization code for tokens
    // Get user info from provider
    // Create or update user in database
    // Generate our own JWT tokens

    let user_id = Uuid::new_v4();

    Ok(HttpResponse::Ok().json(OAuthLoginResponse {
        user_id,
        email: "user@example.com".to_string(),
        access_token: "stub_access_token".to_string(),
        refresh_token: "stub_refresh_token".to_string(),
        is_new_user: true,
    }))
}
