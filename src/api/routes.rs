use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_size as usize;

    let mut router = Router::new()
        // Access gate + byte-range delivery (?upf=vw|dl&id=...)
        .route("/", get(handlers::gate))
        // Sessions
        .route("/session", post(handlers::login))
        .route("/session", get(handlers::current_session))
        .route("/session", delete(handlers::logout))
        // Listing view for the current session
        .route("/files", get(handlers::list_user_files))
        .route("/categories", get(handlers::list_categories))
        // Admin: file records (entity save = ownership assignment + upload)
        .route("/admin/files", get(handlers::list_files))
        .route(
            "/admin/files",
            post(handlers::create_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/admin/files/:id", delete(handlers::delete_file))
        .route("/admin/files/:id", get(handlers::get_file))
        .route(
            "/admin/files/:id",
            put(handlers::update_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Admin: accounts
        .route("/admin/accounts", get(handlers::list_accounts))
        .route("/admin/accounts", post(handlers::create_account))
        .route("/admin/accounts/:id", get(handlers::get_account))
        .route("/admin/accounts/:id", delete(handlers::delete_account))
        // Admin: category taxonomy
        .route("/admin/categories", post(handlers::create_category))
        .route("/admin/categories/:slug", delete(handlers::delete_category))
        // Admin: notification template
        .route(
            "/admin/settings/notification",
            get(handlers::get_notification_template),
        )
        .route(
            "/admin/settings/notification",
            put(handlers::put_notification_template),
        )
        // Internal
        .route("/_internal/health", get(handlers::health));

    // Test-only routes
    if state.config.test_mode {
        tracing::warn!("Test mode enabled — purge route is available.");
        router = router.route("/admin/purge", delete(handlers::admin_purge));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
