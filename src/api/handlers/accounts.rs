use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::response::{ApiError, AppJson, JSend};
use crate::auth::{self, AdminUser};
use crate::storage::models::Account;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub admin: bool,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub admin: bool,
    pub created_at: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_account(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    AppJson(req): AppJson<CreateAccountRequest>,
) -> Result<Json<JSend<AccountResponse>>, ApiError> {
    if req.username.trim().is_empty() {
        return Err(ApiError::bad_request("username must not be empty"));
    }
    if req.password.is_empty() {
        return Err(ApiError::bad_request("password must not be empty"));
    }

    if state
        .db
        .username_exists(&req.username)
        .map_err(|e| ApiError::internal(e.to_string()))?
    {
        return Err(ApiError::conflict(format!(
            "username '{}' is already in use",
            req.username
        )));
    }

    let account = Account {
        id: uuid::Uuid::new_v4().to_string(),
        username: req.username,
        email: req.email,
        password_hash: auth::hash_password(&req.password)
            .map_err(|e| ApiError::internal(e.to_string()))?,
        admin: req.admin,
        storage_dir: None,
        created_at: Utc::now(),
    };

    state
        .db
        .put_account(&account)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::debug!(account_id = %account.id, username = %account.username, "Created account");
    Ok(JSend::success(account_to_response(&account)))
}

pub async fn get_account(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<JSend<AccountResponse>>, ApiError> {
    let account = state
        .db
        .get_account(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Account not found"))?;

    Ok(JSend::success(account_to_response(&account)))
}

pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> Result<Json<JSend<Vec<AccountResponse>>>, ApiError> {
    let mut accounts = state
        .db
        .get_all_accounts()
        .map_err(|e| ApiError::internal(e.to_string()))?;

    accounts.sort_by(|a, b| a.username.cmp(&b.username));

    Ok(JSend::success(
        accounts.iter().map(account_to_response).collect(),
    ))
}

pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    if admin.id == id {
        return Err(ApiError::bad_request("Cannot delete your own account"));
    }

    let deleted = state
        .db
        .delete_account(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    if !deleted {
        return Err(ApiError::not_found("Account not found"));
    }

    tracing::debug!(account_id = %id, "Deleted account");
    Ok(JSend::success(()))
}

// ============================================================================
// Helpers
// ============================================================================

pub(super) fn account_to_response(account: &Account) -> AccountResponse {
    AccountResponse {
        id: account.id.clone(),
        username: account.username.clone(),
        email: account.email.clone(),
        admin: account.admin,
        created_at: account.created_at.to_rfc3339(),
    }
}
