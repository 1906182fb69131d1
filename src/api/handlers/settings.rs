use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::api::response::{ApiError, AppJson, JSend};
use crate::auth::AdminUser;
use crate::storage::models::NotificationTemplate;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TemplateRequest {
    pub subject: String,
    pub body: String,
}

/// The configured notification template (or the built-in default).
pub async fn get_notification_template(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> Result<Json<JSend<NotificationTemplate>>, ApiError> {
    let template = state
        .db
        .get_notification_template()
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(JSend::success(template))
}

/// Replace the notification template. Placeholders: %blogname%, %siteurl%,
/// %user_login%, %filename%, %download_url%, %category%.
pub async fn put_notification_template(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    AppJson(req): AppJson<TemplateRequest>,
) -> Result<Json<JSend<NotificationTemplate>>, ApiError> {
    if req.subject.trim().is_empty() {
        return Err(ApiError::bad_request("subject must not be empty"));
    }

    let template = NotificationTemplate {
        subject: req.subject,
        body: req.body,
    };

    state
        .db
        .put_notification_template(&template)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::debug!("Updated notification template");
    Ok(JSend::success(template))
}
