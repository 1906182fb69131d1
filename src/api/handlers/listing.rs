use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::response::{ApiError, AppQuery, JSend};
use crate::auth::CurrentUser;
use crate::storage::models::Category;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

/// Filter parameters submitted by the listing's filter form. Empty values
/// mean "show all", matching the form's blank dropdown options.
#[derive(Debug, Deserialize)]
pub struct ListingParams {
    #[serde(default)]
    pub upf_year: Option<String>,
    #[serde(default)]
    pub upf_cat: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    /// Distinct years of the caller's files, newest first. Sources the
    /// year filter dropdown.
    pub years: Vec<i32>,
    /// The full category taxonomy. Sources the category filter dropdown.
    pub categories: Vec<CategoryEntry>,
    /// The caller's files after filtering, grouped by year, newest first.
    pub groups: Vec<YearGroup>,
}

#[derive(Debug, Serialize)]
pub struct CategoryEntry {
    pub slug: String,
    pub name: String,
    pub parent: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct YearGroup {
    pub year: i32,
    pub files: Vec<ListedFile>,
}

#[derive(Debug, Serialize)]
pub struct ListedFile {
    pub id: String,
    pub title: String,
    pub categories: Vec<String>,
    pub created_at: String,
    pub view_url: String,
    pub download_url: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// The current session's private files, filtered by `upf_year`/`upf_cat`,
/// grouped by year. Unbounded: no pagination.
pub async fn list_user_files(
    State(state): State<Arc<AppState>>,
    CurrentUser(account): CurrentUser,
    AppQuery(params): AppQuery<ListingParams>,
) -> Result<Json<JSend<ListingResponse>>, ApiError> {
    let year = match params.upf_year.as_deref().filter(|y| !y.is_empty()) {
        Some(y) => Some(
            y.parse::<i32>()
                .map_err(|_| ApiError::bad_request(format!("Invalid year filter: {y}")))?,
        ),
        None => None,
    };
    let category = params.upf_cat.as_deref().filter(|c| !c.is_empty());

    let years = state
        .db
        .distinct_years(&account.username)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let categories = state
        .db
        .get_all_categories()
        .map_err(|e| ApiError::internal(e.to_string()))?
        .into_iter()
        .map(category_to_entry)
        .collect();

    let files = state
        .db
        .list_files_by_owner(&account.username, year, category)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    // Files arrive newest first; consecutive records sharing a year form
    // one group.
    let base = &state.config.site.base_url;
    let mut groups: Vec<YearGroup> = Vec::new();
    for file in files {
        let entry = ListedFile {
            id: file.id.clone(),
            title: file.title.clone(),
            categories: file.categories.clone(),
            created_at: file.created_at.to_rfc3339(),
            view_url: format!("{base}/?upf=vw&id={}", file.id),
            download_url: format!("{base}/?upf=dl&id={}", file.id),
        };

        match groups.last_mut() {
            Some(group) if group.year == file.year() => group.files.push(entry),
            _ => groups.push(YearGroup {
                year: file.year(),
                files: vec![entry],
            }),
        }
    }

    Ok(JSend::success(ListingResponse {
        years,
        categories,
        groups,
    }))
}

fn category_to_entry(category: Category) -> CategoryEntry {
    CategoryEntry {
        slug: category.slug,
        name: category.name,
        parent: category.parent,
    }
}
