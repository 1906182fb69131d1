//! userfiles - per-user private file delivery
//!
//! An administrator uploads a document and assigns it to one registered
//! account; that account (and only that account) can view or download it
//! through a gated byte-range streaming endpoint. Provides:
//! - An access gate keyed on `?upf=vw|dl&id=...` query parameters
//! - Single-range HTTP streaming in 1 MiB chunks
//! - Owner-scoped upload storage with PDF-only whitelisting
//! - Templated notification mail on assignment
//! - redb embedded database for metadata (ACID, MVCC, crash-safe)

pub mod api;
pub mod auth;
pub mod config;
pub mod mailer;
pub mod storage;
pub mod stream;

use std::path::PathBuf;
use std::sync::Arc;

use auth::SessionKey;
use config::Config;
use mailer::Mailer;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub sessions: SessionKey,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Absolute path of a payload under the uploads root.
    pub fn uploads_path(&self, relative: &str) -> PathBuf {
        PathBuf::from(&self.config.storage.uploads_dir).join(relative)
    }
}
