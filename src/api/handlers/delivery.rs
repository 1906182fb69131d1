use std::sync::Arc;

use axum::extract::{OriginalUri, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::api::response::{ApiError, AppQuery, JSend};
use crate::auth::CurrentUser;
use crate::stream::{self, Action, StreamError};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

/// Gate trigger: both `upf` and `id` must be present on the root request.
#[derive(Debug, Deserialize)]
pub struct GateParams {
    #[serde(default)]
    pub upf: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
struct LoginRedirect {
    redirect_to: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Root handler. With `upf=vw|dl&id=<record-id>` this is the access gate in
/// front of the byte-range streamer; without them it answers like any other
/// page.
///
/// Unauthenticated requests are redirected to the login URL with the
/// original URI as `redirect_to`. An authenticated non-owner gets an
/// explicit 403 rather than the empty response the gate historically gave,
/// so a denied file is distinguishable from a missing one.
pub async fn gate(
    State(state): State<Arc<AppState>>,
    user: Option<CurrentUser>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    AppQuery(params): AppQuery<GateParams>,
) -> Result<Response, ApiError> {
    let (code, id) = match (params.upf, params.id) {
        (Some(code), Some(id)) => (code, id),
        // Not a gated request; normal handling proceeds.
        _ => {
            return Ok(JSend::success(ServiceInfo {
                service: "userfiles",
                version: env!("CARGO_PKG_VERSION"),
            })
            .into_response())
        }
    };

    // Authentication comes first: an anonymous caller is always sent to
    // login, whatever else is wrong with the request.
    let account = match user {
        Some(CurrentUser(account)) => account,
        None => return login_redirect(&state, &uri.to_string()),
    };

    let action = Action::from_code(&code)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown action code: {code}")))?;

    let record = state
        .db
        .get_file(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    if record.owner != account.username {
        return Err(ApiError::forbidden("This file is not assigned to you"));
    }

    let stored = record
        .file
        .as_ref()
        .ok_or_else(|| ApiError::not_found("No file attached to this record"))?;

    let path = state.uploads_path(&stored.path);
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok());

    stream::serve_file(&path, stored.filename(), &stored.mime_type, action, range)
        .await
        .map_err(|e| match e {
            StreamError::Unsatisfiable(_) => ApiError::range_not_satisfiable(e.to_string()),
            // The diagnostic names the server-side path, matching the
            // historical delivery error surface.
            _ => ApiError::internal(e.to_string()),
        })
}

/// 302 to the configured login URL, carrying the original request URI.
fn login_redirect(state: &AppState, original_uri: &str) -> Result<Response, ApiError> {
    let query = serde_qs::to_string(&LoginRedirect {
        redirect_to: original_uri.to_string(),
    })
    .map_err(|e| ApiError::internal(e.to_string()))?;

    let login_url = &state.config.site.login_url;
    let separator = if login_url.contains('?') { '&' } else { '?' };

    Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, format!("{login_url}{separator}{query}"))
        .body(axum::body::Body::empty())
        .map_err(|e| ApiError::internal(e.to_string()))
}
