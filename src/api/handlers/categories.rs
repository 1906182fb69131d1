use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::api::response::{ApiError, AppJson, JSend};
use crate::auth::{AdminUser, CurrentUser};
use crate::storage::models::Category;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    AppJson(req): AppJson<CreateCategoryRequest>,
) -> Result<Json<JSend<Category>>, ApiError> {
    if req.slug.trim().is_empty() || req.slug.contains('/') {
        return Err(ApiError::bad_request("slug must be non-empty and contain no '/'"));
    }
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("name must not be empty"));
    }

    if state
        .db
        .get_category(&req.slug)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .is_some()
    {
        return Err(ApiError::conflict(format!(
            "category '{}' already exists",
            req.slug
        )));
    }

    if let Some(ref parent) = req.parent {
        if state
            .db
            .get_category(parent)
            .map_err(|e| ApiError::internal(e.to_string()))?
            .is_none()
        {
            return Err(ApiError::bad_request(format!(
                "Unknown parent category: {parent}"
            )));
        }
    }

    let category = Category {
        slug: req.slug,
        name: req.name,
        parent: req.parent,
    };

    state
        .db
        .put_category(&category)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::debug!(slug = %category.slug, "Created category");
    Ok(JSend::success(category))
}

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    CurrentUser(_): CurrentUser,
) -> Result<Json<JSend<Vec<Category>>>, ApiError> {
    let categories = state
        .db
        .get_all_categories()
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(JSend::success(categories))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(slug): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    let deleted = state
        .db
        .delete_category(&slug)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    if !deleted {
        return Err(ApiError::not_found("Category not found"));
    }

    tracing::debug!(%slug, "Deleted category");
    Ok(JSend::success(()))
}
