use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Descriptor of the physical payload attached to a file record.
/// At most one per record; replacing it deletes the prior physical file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Path relative to the uploads root, `<owner-dir>/<token>_<filename>`.
    /// The token is fresh per upload, so two records never share a payload.
    pub path: String,
    /// The display filename, as uploaded.
    pub name: String,
    /// Public URL of the payload under the uploads root.
    pub url: String,
    pub mime_type: String,
}

impl StoredFile {
    /// The display filename.
    pub fn filename(&self) -> &str {
        &self.name
    }
}

/// A private file record stored in redb.
///
/// `owner` is a username and identifies exactly one account; only that
/// account may fetch the payload through the access gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub title: String,
    pub owner: String,
    #[serde(default)]
    pub file: Option<StoredFile>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn year(&self) -> i32 {
        self.created_at.year()
    }
}

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub admin: bool,
    /// Uploads subdirectory `<account-id>_<random-token>`, generated once on
    /// first upload for this owner and cached here.
    #[serde(default)]
    pub storage_dir: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Hierarchical classification label, attached many-to-many to file records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
}

/// Notification mail template. Placeholders: %blogname%, %siteurl%,
/// %user_login%, %filename%, %download_url%, %category%.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTemplate {
    pub subject: String,
    pub body: String,
}

impl Default for NotificationTemplate {
    fn default() -> Self {
        Self {
            subject: "A file was uploaded for you on %blogname%".to_string(),
            body: "Hello %user_login%,\n\n\
                   The file %filename% is now available for you on %blogname% \
                   (%siteurl%).\n\nDownload it here: %download_url%\n"
                .to_string(),
        }
    }
}
