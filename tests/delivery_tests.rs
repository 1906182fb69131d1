use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use tower::ServiceExt;
use userfiles::api::create_router;
use userfiles::auth::{self, SessionKey};
use userfiles::config::{AuthConfig, Config, MailConfig, ServerConfig, SiteConfig, StorageConfig};
use userfiles::mailer::{LogMailer, Mailer};
use userfiles::storage::models::{Account, FileRecord, StoredFile};
use userfiles::storage::Database;
use userfiles::AppState;

fn test_state(dir: &tempfile::TempDir) -> Arc<AppState> {
    let uploads = dir.path().join("uploads");
    std::fs::create_dir_all(&uploads).unwrap();

    let config = Config {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: dir.path().join("data").to_string_lossy().into_owned(),
        },
        site: SiteConfig {
            name: "Test Site".to_string(),
            base_url: "http://localhost:8080".to_string(),
            login_url: "http://localhost:8080/login".to_string(),
        },
        storage: StorageConfig {
            uploads_dir: uploads.to_string_lossy().into_owned(),
        },
        auth: AuthConfig {
            session_secret: "test-secret".to_string(),
            session_ttl_secs: 3600,
            admin_username: "admin".to_string(),
            admin_password: String::new(),
            admin_email: "admin@localhost".to_string(),
        },
        mail: MailConfig {
            endpoint: None,
            api_token: None,
            from_address: "noreply@localhost".to_string(),
        },
        test_mode: false,
        max_upload_size: 10 * 1024 * 1024,
    };

    let db = Database::open(dir.path().join("data")).unwrap();
    let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);

    Arc::new(AppState {
        sessions: SessionKey::new(&config.auth.session_secret),
        config,
        db,
        mailer,
    })
}

fn make_account(state: &AppState, username: &str, admin: bool) -> Account {
    let account = Account {
        id: format!("acct-{username}"),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: auth::hash_password("correct horse").unwrap(),
        admin,
        storage_dir: None,
        created_at: Utc::now(),
    };
    state.db.put_account(&account).unwrap();
    account
}

/// Seed a record with a physical payload under the uploads root.
fn seed_file(state: &AppState, id: &str, owner: &str, data: &[u8]) -> FileRecord {
    let relative = format!("{owner}-dir/{id}.pdf");
    let dest = std::path::Path::new(&state.config.storage.uploads_dir).join(&relative);
    std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
    std::fs::write(&dest, data).unwrap();

    let now = Utc::now();
    let record = FileRecord {
        id: id.to_string(),
        title: "Quarterly report".to_string(),
        owner: owner.to_string(),
        file: Some(StoredFile {
            path: relative.clone(),
            name: format!("{id}.pdf"),
            url: format!("http://localhost:8080/uploads/{relative}"),
            mime_type: "application/pdf".to_string(),
        }),
        categories: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    state.db.put_file(&record).unwrap();
    record
}

fn token(state: &AppState, username: &str) -> String {
    state.sessions.mint(username, 3600)
}

fn gate_request(uri: &str, token: Option<&str>, range: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("upf_session={token}"));
    }
    if let Some(range) = range {
        builder = builder.header(header::RANGE, range);
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn payload() -> Vec<u8> {
    (0..=255u8).cycle().take(1000).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_root_without_gate_params() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&dir));

    let response = send(&app, gate_request("/", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["data"]["service"], "userfiles");
}

#[tokio::test]
async fn test_gate_unknown_action_code() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    make_account(&state, "alice", false);
    let alice = token(&state, "alice");
    let app = create_router(state);

    let response = send(&app, gate_request("/?upf=rm&id=abc", Some(&alice), None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_gate_redirects_anonymous_before_validating_action() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&dir));

    // An anonymous caller is sent to login even with a bogus action code.
    let response = send(&app, gate_request("/?upf=rm&id=abc", None, None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn test_gate_redirects_unauthenticated_to_login() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&dir));

    let response = send(&app, gate_request("/?upf=dl&id=abc", None, None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(
        location.starts_with("http://localhost:8080/login?redirect_to="),
        "unexpected location: {location}"
    );
}

#[tokio::test]
async fn test_gate_expired_session_redirects() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    make_account(&state, "alice", false);
    let expired = state.sessions.mint("alice", -10);
    let app = create_router(state);

    let response = send(&app, gate_request("/?upf=dl&id=abc", Some(&expired), None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn test_gate_missing_record() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    make_account(&state, "alice", false);
    let token = token(&state, "alice");
    let app = create_router(state);

    let response = send(&app, gate_request("/?upf=dl&id=ghost", Some(&token), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_gate_denies_non_owner() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    make_account(&state, "alice", false);
    make_account(&state, "bob", false);
    seed_file(&state, "file-1", "alice", &payload());
    let bob = token(&state, "bob");
    let app = create_router(state);

    let response = send(&app, gate_request("/?upf=dl&id=file-1", Some(&bob), None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let json = body_json(response).await;
    assert_eq!(json["status"], "fail");
    assert_eq!(json["data"]["message"], "This file is not assigned to you");
}

#[tokio::test]
async fn test_gate_download_full_body() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    make_account(&state, "alice", false);
    seed_file(&state, "file-1", "alice", &payload());
    let alice = token(&state, "alice");
    let app = create_router(state);

    let response = send(&app, gate_request("/?upf=dl&id=file-1", Some(&alice), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"file-1.pdf\""
    );
    assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), "private");

    let body = body_bytes(response).await;
    assert_eq!(body.as_ref(), payload().as_slice());
}

#[tokio::test]
async fn test_gate_view_is_inline() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    make_account(&state, "alice", false);
    seed_file(&state, "file-1", "alice", &payload());
    let alice = token(&state, "alice");
    let app = create_router(state);

    let response = send(&app, gate_request("/?upf=vw&id=file-1", Some(&alice), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "inline; filename=\"file-1.pdf\""
    );
}

#[tokio::test]
async fn test_gate_honors_byte_range() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    make_account(&state, "alice", false);
    seed_file(&state, "file-1", "alice", &payload());
    let alice = token(&state, "alice");
    let app = create_router(state);

    let response = send(
        &app,
        gate_request("/?upf=dl&id=file-1", Some(&alice), Some("bytes=0-99")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers().get(header::CONTENT_RANGE).unwrap(),
        "bytes 0-99/1000"
    );
    assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "100");

    let body = body_bytes(response).await;
    assert_eq!(body.as_ref(), &payload()[..100]);
}

#[tokio::test]
async fn test_gate_rejects_bad_range() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    make_account(&state, "alice", false);
    seed_file(&state, "file-1", "alice", &payload());
    let alice = token(&state, "alice");
    let app = create_router(state);

    let response = send(
        &app,
        gate_request("/?upf=dl&id=file-1", Some(&alice), Some("bytes=5000-6000")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
}

#[tokio::test]
async fn test_gate_accepts_bearer_token() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    make_account(&state, "alice", false);
    seed_file(&state, "file-1", "alice", &payload());
    let alice = token(&state, "alice");
    let app = create_router(state);

    let request = Request::builder()
        .uri("/?upf=dl&id=file-1")
        .header(header::AUTHORIZATION, format!("Bearer {alice}"))
        .body(Body::empty())
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_gate_record_without_payload() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    make_account(&state, "alice", false);

    let now = Utc::now();
    state
        .db
        .put_file(&FileRecord {
            id: "bare".to_string(),
            title: "No payload yet".to_string(),
            owner: "alice".to_string(),
            file: None,
            categories: Vec::new(),
            created_at: now,
            updated_at: now,
        })
        .unwrap();

    let alice = token(&state, "alice");
    let app = create_router(state);

    let response = send(&app, gate_request("/?upf=dl&id=bare", Some(&alice), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
