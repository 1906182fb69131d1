//! Session tokens and password hashing.
//!
//! Tokens are `<payload-b64url>.<hmac-b64url>` where the payload is a JSON
//! `{sub, exp}` pair. Passwords are stored as
//! `pbkdf2-sha256$<iterations>$<salt-b64>$<hash-b64>`.

use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use ring::rand::SecureRandom;
use ring::{hmac, pbkdf2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::response::ApiError;
use crate::storage::models::Account;
use crate::AppState;

pub const SESSION_COOKIE: &str = "upf_session";

const PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const CREDENTIAL_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Malformed session token")]
    Malformed,
    #[error("Session token signature mismatch")]
    BadSignature,
    #[error("Session expired")]
    Expired,
    #[error("Failed to generate randomness")]
    Rng,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    exp: i64,
}

/// Signs and verifies session tokens.
pub struct SessionKey {
    key: hmac::Key,
}

impl SessionKey {
    pub fn new(secret: &str) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes()),
        }
    }

    /// Mint a token for `username` valid for `ttl_secs` from now.
    pub fn mint(&self, username: &str, ttl_secs: i64) -> String {
        let claims = SessionClaims {
            sub: username.to_string(),
            exp: chrono::Utc::now().timestamp() + ttl_secs,
        };
        // Serializing a two-field struct of String/i64 cannot fail.
        let payload =
            base64_url_encode(&serde_json::to_vec(&claims).unwrap_or_default());
        let tag = hmac::sign(&self.key, payload.as_bytes());
        format!("{payload}.{}", base64_url_encode(tag.as_ref()))
    }

    /// Verify a token and return the username it was minted for.
    pub fn verify(&self, token: &str) -> Result<String, AuthError> {
        let (payload, sig) = token.split_once('.').ok_or(AuthError::Malformed)?;
        let sig = base64_url_decode(sig).map_err(|_| AuthError::Malformed)?;

        hmac::verify(&self.key, payload.as_bytes(), &sig)
            .map_err(|_| AuthError::BadSignature)?;

        let claims: SessionClaims = serde_json::from_slice(
            &base64_url_decode(payload).map_err(|_| AuthError::Malformed)?,
        )
        .map_err(|_| AuthError::Malformed)?;

        if claims.exp <= chrono::Utc::now().timestamp() {
            return Err(AuthError::Expired);
        }

        Ok(claims.sub)
    }
}

/// `Set-Cookie` value for a freshly minted session token.
pub fn session_cookie(token: &str, ttl_secs: i64) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_secs}")
}

/// `Set-Cookie` value that clears the session cookie.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

// ============================================================================
// Password hashing
// ============================================================================

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let rng = ring::rand::SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt).map_err(|_| AuthError::Rng)?;

    let mut hash = [0u8; CREDENTIAL_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        NonZeroU32::new(PBKDF2_ITERATIONS).expect("iteration count is non-zero"),
        &salt,
        password.as_bytes(),
        &mut hash,
    );

    Ok(format!(
        "pbkdf2-sha256${PBKDF2_ITERATIONS}${}${}",
        base64_url_encode(&salt),
        base64_url_encode(&hash)
    ))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (scheme, iterations, salt, hash) = match (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) {
        (Some(s), Some(i), Some(salt), Some(hash)) => (s, i, salt, hash),
        _ => return false,
    };

    if scheme != "pbkdf2-sha256" {
        return false;
    }
    let iterations = match iterations.parse::<u32>().ok().and_then(NonZeroU32::new) {
        Some(i) => i,
        None => return false,
    };
    let (salt, hash) = match (base64_url_decode(salt), base64_url_decode(hash)) {
        (Ok(s), Ok(h)) => (s, h),
        _ => return false,
    };

    pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &hash,
    )
    .is_ok()
}

// ============================================================================
// Request extractors
// ============================================================================

/// The authenticated account behind the request, resolved from the
/// `upf_session` cookie or a bearer token. Rejects with 401.
pub struct CurrentUser(pub Account);

/// An authenticated account with the admin flag set. Rejects with 403.
pub struct AdminUser(pub Account);

/// Pull the session token out of the request, bearer header first.
pub fn session_token(parts: &Parts) -> Option<String> {
    if let Some(auth) = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    let cookies = parts.headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, ApiError> {
        let token = session_token(parts)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        let username = state
            .sessions
            .verify(&token)
            .map_err(|e| ApiError::unauthorized(e.to_string()))?;

        let account = state
            .db
            .get_account_by_username(&username)
            .map_err(|e| ApiError::internal(e.to_string()))?
            .ok_or_else(|| ApiError::unauthorized("Unknown account"))?;

        Ok(CurrentUser(account))
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, ApiError> {
        let CurrentUser(account) = CurrentUser::from_request_parts(parts, state).await?;
        if !account.admin {
            return Err(ApiError::forbidden("Administrator access required"));
        }
        Ok(AdminUser(account))
    }
}

fn base64_url_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
}

fn base64_url_decode(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(data)
}
