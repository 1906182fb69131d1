//! Outgoing notification mail.
//!
//! Delivery goes through an HTTP mail API when `MAIL_ENDPOINT` is
//! configured, and is logged only otherwise. Send failures never fail the
//! save that triggered them; the assigner logs and moves on.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

use crate::storage::models::NotificationTemplate;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Mail transport error: {0}")]
    Transport(String),
    #[error("Mail API rejected the message ({status}): {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailerError>;
}

/// Posts messages as JSON to an HTTP mail API.
pub struct HttpMailer {
    client: Client,
    endpoint: String,
    api_token: Option<String>,
    from: String,
}

#[derive(Serialize)]
struct OutgoingMail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl HttpMailer {
    pub fn new(endpoint: &str, api_token: Option<&str>, from: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
            api_token: api_token.map(|s| s.to_string()),
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailerError> {
        let mut request = self.client.post(&self.endpoint).json(&OutgoingMail {
            from: &self.from,
            to,
            subject,
            text: body,
        });

        if let Some(ref token) = self.api_token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| MailerError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(MailerError::Rejected { status, body });
        }

        Ok(())
    }
}

/// Logs messages instead of delivering them. Used when no mail endpoint is
/// configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), MailerError> {
        tracing::info!(%to, %subject, "No mail endpoint configured, dropping notification");
        Ok(())
    }
}

/// Substitution context for the notification template placeholders.
pub struct TemplateContext<'a> {
    pub site_name: &'a str,
    pub site_url: &'a str,
    pub username: &'a str,
    pub filename: &'a str,
    pub download_url: &'a str,
    pub categories: &'a str,
}

/// Substitute all recognized placeholders into the template.
pub fn render_template(
    template: &NotificationTemplate,
    ctx: &TemplateContext<'_>,
) -> (String, String) {
    let subject = substitute(&template.subject, ctx);
    let body = substitute(&template.body, ctx);
    (subject, body)
}

fn substitute(text: &str, ctx: &TemplateContext<'_>) -> String {
    text.replace("%blogname%", ctx.site_name)
        .replace("%siteurl%", ctx.site_url)
        .replace("%user_login%", ctx.username)
        .replace("%filename%", ctx.filename)
        .replace("%download_url%", ctx.download_url)
        .replace("%category%", ctx.categories)
}
