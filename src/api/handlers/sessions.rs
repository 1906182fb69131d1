use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::accounts::account_to_response;
use super::accounts::AccountResponse;
use crate::api::response::{ApiError, AppJson, JSend};
use crate::auth::{self, CurrentUser};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub username: String,
    pub admin: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Exchange credentials for a session token, also set as a cookie.
/// Unknown usernames and wrong passwords are indistinguishable.
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Response, ApiError> {
    let account = state
        .db
        .get_account_by_username(&req.username)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let account = match account {
        Some(account) if auth::verify_password(&req.password, &account.password_hash) => account,
        _ => return Err(ApiError::unauthorized("Invalid username or password")),
    };

    let ttl = state.config.auth.session_ttl_secs;
    let token = state.sessions.mint(&account.username, ttl);

    tracing::debug!(username = %account.username, "Session opened");

    let body = JSend::success(SessionResponse {
        token: token.clone(),
        username: account.username,
        admin: account.admin,
    });

    Ok((
        [(header::SET_COOKIE, auth::session_cookie(&token, ttl))],
        body,
    )
        .into_response())
}

/// The account behind the current session.
pub async fn current_session(
    CurrentUser(account): CurrentUser,
) -> Json<JSend<AccountResponse>> {
    JSend::success(account_to_response(&account))
}

/// Clear the session cookie. Tokens stay valid until expiry; there is no
/// server-side session store to invalidate.
pub async fn logout() -> Response {
    (
        [(header::SET_COOKIE, auth::clear_session_cookie())],
        JSend::success(()),
    )
        .into_response()
}
