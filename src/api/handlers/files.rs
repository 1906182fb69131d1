use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::Json;
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::response::{ApiError, AppQuery, JSend, JSendPaginated, Pagination};
use crate::auth::AdminUser;
use crate::mailer::{render_template, TemplateContext};
use crate::storage::models::{FileRecord, StoredFile};
use crate::AppState;

/// The only MIME type accepted for uploads.
const SUPPORTED_TYPES: [&str; 1] = ["application/pdf"];

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub id: String,
    pub title: String,
    pub owner: String,
    pub categories: Vec<String>,
    pub file: Option<StoredFileResponse>,
    pub view_url: String,
    pub download_url: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct StoredFileResponse {
    pub filename: String,
    pub mime_type: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ListFilesParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub owner: Option<String>,
}

fn default_limit() -> u32 {
    20
}

/// Submitted entity-save form: metadata fields plus an optional payload.
struct SaveForm {
    title: Option<String>,
    owner_id: Option<String>,
    categories: Option<Vec<String>>,
    notify: bool,
    upload: Option<(String, Bytes)>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_file(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    multipart: Multipart,
) -> Result<Json<JSend<FileResponse>>, ApiError> {
    let form = read_save_form(&state, multipart).await?;

    let title = form
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("title field is required"))?;
    if form.owner_id.is_none() {
        return Err(ApiError::bad_request("owner_id field is required"));
    }

    let now = Utc::now();
    let record = FileRecord {
        id: uuid::Uuid::new_v4().to_string(),
        title,
        owner: String::new(), // assigned below
        file: None,
        categories: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    let record = apply_save(&state, record, form).await?;
    tracing::debug!(file_id = %record.id, owner = %record.owner, "Created file record");

    Ok(JSend::success(file_to_response(&state, &record)))
}

pub async fn update_file(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<JSend<FileResponse>>, ApiError> {
    let form = read_save_form(&state, multipart).await?;

    let record = state
        .db
        .get_file(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    let record = apply_save(&state, record, form).await?;
    tracing::debug!(file_id = %id, "Updated file record");

    Ok(JSend::success(file_to_response(&state, &record)))
}

pub async fn get_file(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<JSend<FileResponse>>, ApiError> {
    let file = state
        .db
        .get_file(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    Ok(JSend::success(file_to_response(&state, &file)))
}

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    let record = state
        .db
        .get_file(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    state
        .db
        .delete_file(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    // Physical cleanup is best-effort; the record is already gone.
    if let Some(ref stored) = record.file {
        let path = state.uploads_path(&stored.path);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!(file_id = %id, error = %e, "Failed to delete physical file");
        }
    }

    tracing::debug!(file_id = %id, "Deleted file record");
    Ok(JSend::success(()))
}

pub async fn list_files(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    AppQuery(params): AppQuery<ListFilesParams>,
) -> Result<Json<JSendPaginated<FileResponse>>, ApiError> {
    if params.limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }

    let files = match params.owner.as_deref() {
        Some(owner) => state.db.get_files_by_owner(owner),
        None => state.db.get_all_files(),
    }
    .map_err(|e| ApiError::internal(e.to_string()))?;

    let total = files.len() as u64;
    let items: Vec<FileResponse> = files
        .iter()
        .skip(params.offset as usize)
        .take(params.limit as usize)
        .map(|f| file_to_response(&state, f))
        .collect();

    Ok(JSendPaginated::success(
        items,
        Pagination {
            limit: params.limit,
            offset: params.offset,
            total,
        },
    ))
}

// ============================================================================
// Save pipeline
// ============================================================================

async fn read_save_form(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<SaveForm, ApiError> {
    let mut form = SaveForm {
        title: None,
        owner_id: None,
        categories: None,
        notify: false,
        upload: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .map(sanitize_filename)
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| ApiError::bad_request("file part must carry a filename"))?;

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

                if data.len() as u64 > state.config.max_upload_size {
                    return Err(ApiError::payload_too_large(format!(
                        "File exceeds maximum upload size of {} bytes",
                        state.config.max_upload_size
                    )));
                }

                form.upload = Some((filename, data));
            }
            "title" => {
                form.title = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid title: {e}")))?,
                );
            }
            "owner_id" => {
                form.owner_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid owner_id: {e}")))?,
                );
            }
            "categories" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid categories: {e}")))?;
                form.categories = Some(
                    text.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect(),
                );
            }
            "notify" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid notify: {e}")))?;
                form.notify = text == "1" || text == "true";
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    Ok(form)
}

/// Entity-save semantics: assign the owner, validate and store the payload,
/// persist the record, then dispatch the notification when requested.
///
/// The type check happens before any mutation, so a rejected upload leaves
/// the prior descriptor and its physical file untouched.
async fn apply_save(
    state: &AppState,
    mut record: FileRecord,
    form: SaveForm,
) -> Result<FileRecord, ApiError> {
    // (a) Resolve the submitted account id to a username and store it as
    // the record owner.
    let owner = match form.owner_id {
        Some(ref owner_id) => state
            .db
            .get_account(owner_id)
            .map_err(|e| ApiError::internal(e.to_string()))?
            .ok_or_else(|| ApiError::bad_request(format!("No such account: {owner_id}")))?,
        None => state
            .db
            .get_account_by_username(&record.owner)
            .map_err(|e| ApiError::internal(e.to_string()))?
            .ok_or_else(|| ApiError::internal("Record owner no longer exists"))?,
    };
    record.owner = owner.username.clone();

    if let Some(title) = form.title {
        if !title.trim().is_empty() {
            record.title = title;
        }
    }

    if let Some(categories) = form.categories {
        for slug in &categories {
            if state
                .db
                .get_category(slug)
                .map_err(|e| ApiError::internal(e.to_string()))?
                .is_none()
            {
                return Err(ApiError::bad_request(format!("Unknown category: {slug}")));
            }
        }
        record.categories = categories;
    }

    // (b) Validate and store the payload.
    if let Some((filename, data)) = form.upload {
        let mime_type = mime_guess::from_path(&filename)
            .first_raw()
            .unwrap_or("application/octet-stream");

        if !SUPPORTED_TYPES.contains(&mime_type) {
            return Err(ApiError::unsupported_media_type(
                "The file type that you've uploaded is not a PDF.",
            ));
        }

        let owner_dir = state
            .db
            .ensure_storage_dir(&owner.id)
            .map_err(|e| ApiError::internal(e.to_string()))?
            .ok_or_else(|| ApiError::internal("Owner account vanished during save"))?;

        // Per-upload token: records never share a physical payload, even
        // with identical uploaded filenames.
        let relative = format!(
            "{owner_dir}/{}_{filename}",
            uuid::Uuid::new_v4().simple()
        );
        let dest = state.uploads_path(&relative);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ApiError::internal(format!("Failed to store upload: {e}")))?;
        }

        // Write the new payload before deleting the superseded one, so a
        // failed write cannot leave the record with neither file.
        tokio::fs::write(&dest, &data)
            .await
            .map_err(|e| ApiError::internal(format!("There was an error uploading your file. The error is: {e}")))?;

        let previous = record.file.replace(StoredFile {
            path: relative.clone(),
            name: filename,
            url: format!("{}/uploads/{relative}", state.config.site.base_url),
            mime_type: mime_type.to_string(),
        });

        // Irreversible: the superseded physical file has no backup.
        if let Some(previous) = previous {
            if previous.path != relative {
                let old_path = state.uploads_path(&previous.path);
                if let Err(e) = tokio::fs::remove_file(&old_path).await {
                    tracing::warn!(
                        path = %old_path.display(),
                        error = %e,
                        "Failed to delete superseded file"
                    );
                }
            }
        }
    }

    record.updated_at = Utc::now();
    state
        .db
        .put_file(&record)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    // (c) Templated notification, only on request. Send failures are logged
    // and do not fail the save.
    if form.notify {
        if let Some(ref stored) = record.file {
            let template = state
                .db
                .get_notification_template()
                .map_err(|e| ApiError::internal(e.to_string()))?;

            let categories = category_names(state, &record);
            let download_url = format!(
                "{}/?upf=dl&id={}",
                state.config.site.base_url, record.id
            );
            let (subject, body) = render_template(
                &template,
                &TemplateContext {
                    site_name: &state.config.site.name,
                    site_url: &state.config.site.base_url,
                    username: &owner.username,
                    filename: stored.filename(),
                    download_url: &download_url,
                    categories: &categories,
                },
            );

            if let Err(e) = state.mailer.send(&owner.email, &subject, &body).await {
                tracing::warn!(to = %owner.email, error = %e, "Failed to send notification");
            }
        }
    }

    Ok(record)
}

// ============================================================================
// Helpers
// ============================================================================

/// Strip path components and control characters from an uploaded filename.
fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    base.chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect()
}

/// Display names of the record's categories, comma-separated. Slugs that no
/// longer resolve fall back to themselves.
fn category_names(state: &AppState, record: &FileRecord) -> String {
    record
        .categories
        .iter()
        .map(|slug| {
            state
                .db
                .get_category(slug)
                .ok()
                .flatten()
                .map(|c| c.name)
                .unwrap_or_else(|| slug.clone())
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub(super) fn file_to_response(state: &AppState, file: &FileRecord) -> FileResponse {
    let base = &state.config.site.base_url;
    FileResponse {
        id: file.id.clone(),
        title: file.title.clone(),
        owner: file.owner.clone(),
        categories: file.categories.clone(),
        file: file.file.as_ref().map(|f| StoredFileResponse {
            filename: f.filename().to_string(),
            mime_type: f.mime_type.clone(),
            url: f.url.clone(),
        }),
        view_url: format!("{base}/?upf=vw&id={}", file.id),
        download_url: format!("{base}/?upf=dl&id={}", file.id),
        created_at: file.created_at.to_rfc3339(),
        updated_at: file.updated_at.to_rfc3339(),
    }
}
