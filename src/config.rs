use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub site: SiteConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub mail: MailConfig,
    /// Enables dangerous operations like purge. Must never be true in production.
    pub test_mode: bool,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Display name substituted for %blogname% in notification mail.
    pub name: String,
    /// Public base URL of this service, no trailing slash.
    pub base_url: String,
    /// Where unauthenticated gate requests are redirected.
    pub login_url: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for physical file payloads. Each owner gets a
    /// subdirectory named `<account-id>_<random-token>` underneath it.
    pub uploads_dir: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC key material for session tokens.
    pub session_secret: String,
    /// Session lifetime in seconds.
    pub session_ttl_secs: i64,
    /// Bootstrap admin credentials, created at startup when missing.
    pub admin_username: String,
    pub admin_password: String,
    pub admin_email: String,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    /// HTTP mail API endpoint. When unset, outgoing mail is logged only.
    pub endpoint: Option<String>,
    pub api_token: Option<String>,
    pub from_address: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: "./userfiles".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let site_name =
            std::env::var("SITE_NAME").unwrap_or_else(|_| "User Private Files".to_string());
        let base_url = std::env::var("BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string())
            .trim_end_matches('/')
            .to_string();
        let login_url = std::env::var("LOGIN_URL").unwrap_or_else(|_| format!("{base_url}/login"));

        let uploads_dir =
            std::env::var("UPLOADS_DIR").unwrap_or_else(|_| "./userfiles".to_string());

        let session_secret =
            std::env::var("SESSION_SECRET").unwrap_or_else(|_| uuid::Uuid::new_v4().to_string());
        let session_ttl_secs = std::env::var("SESSION_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(12 * 3600);

        let admin_username =
            std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
        let admin_password = std::env::var("ADMIN_PASSWORD").unwrap_or_default();
        let admin_email =
            std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@localhost".to_string());

        let mail_endpoint = std::env::var("MAIL_ENDPOINT").ok();
        let mail_api_token = std::env::var("MAIL_API_TOKEN").ok();
        let mail_from =
            std::env::var("MAIL_FROM").unwrap_or_else(|_| "noreply@localhost".to_string());

        let test_mode = std::env::var("TEST_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50 * 1024 * 1024); // 50MB

        let config = Config {
            server: ServerConfig {
                bind_address,
                data_dir,
            },
            site: SiteConfig {
                name: site_name,
                base_url,
                login_url,
            },
            storage: StorageConfig { uploads_dir },
            auth: AuthConfig {
                session_secret,
                session_ttl_secs,
                admin_username,
                admin_password,
                admin_email,
            },
            mail: MailConfig {
                endpoint: mail_endpoint,
                api_token: mail_api_token,
                from_address: mail_from,
            },
            test_mode,
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.site.base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "BASE_URL cannot be empty".to_string(),
            ));
        }

        if self.auth.session_ttl_secs <= 0 {
            return Err(ConfigError::ValidationError(
                "SESSION_TTL_SECS must be positive".to_string(),
            ));
        }

        if self.mail.endpoint.is_some() && self.mail.from_address.is_empty() {
            return Err(ConfigError::ValidationError(
                "MAIL_FROM is required when MAIL_ENDPOINT is set".to_string(),
            ));
        }

        Ok(())
    }
}
