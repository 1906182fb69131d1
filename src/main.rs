use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use userfiles::{
    api,
    auth::{self, SessionKey},
    config::Config,
    mailer::{HttpMailer, LogMailer, Mailer},
    storage::{models::Account, Database},
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "userfiles starting");

    // Load configuration
    let config = Config::load()?;
    info!("Serving site: {}", config.site.base_url);

    // Initialize database
    let db = Database::open(&config.server.data_dir)?;
    info!("Database opened at: {}", config.server.data_dir);

    // Uploads root for physical payloads
    tokio::fs::create_dir_all(&config.storage.uploads_dir).await?;
    info!("Uploads root: {}", config.storage.uploads_dir);

    // Mail delivery backend
    let mailer: Arc<dyn Mailer> = match config.mail.endpoint.as_deref() {
        Some(endpoint) => {
            info!("Using HTTP mail endpoint: {endpoint}");
            Arc::new(HttpMailer::new(
                endpoint,
                config.mail.api_token.as_deref(),
                &config.mail.from_address,
            ))
        }
        None => {
            info!("No mail endpoint configured; notifications will be logged only");
            Arc::new(LogMailer)
        }
    };

    // Bootstrap admin account
    bootstrap_admin(&db, &config)?;

    // Create shared state
    let state = Arc::new(AppState {
        sessions: SessionKey::new(&config.auth.session_secret),
        config,
        db,
        mailer,
    });

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&state.config.server.bind_address).await?;
    info!("Listening on: {}", state.config.server.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

/// Create the configured admin account when it does not exist yet.
fn bootstrap_admin(db: &Database, config: &Config) -> anyhow::Result<()> {
    let auth_cfg = &config.auth;

    if auth_cfg.admin_password.is_empty() {
        info!("ADMIN_PASSWORD not set; skipping admin bootstrap");
        return Ok(());
    }

    if db.username_exists(&auth_cfg.admin_username)? {
        return Ok(());
    }

    let account = Account {
        id: uuid::Uuid::new_v4().to_string(),
        username: auth_cfg.admin_username.clone(),
        email: auth_cfg.admin_email.clone(),
        password_hash: auth::hash_password(&auth_cfg.admin_password)
            .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {e}"))?,
        admin: true,
        storage_dir: None,
        created_at: Utc::now(),
    };
    db.put_account(&account)?;
    info!(username = %account.username, "Bootstrapped admin account");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
