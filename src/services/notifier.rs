use std::fs;
use std::path::Path;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{error, info};

use crate::error::{AuditError, Result};
use crate::services::http::{self, RetryPolicy};
use crate::services::secrets::Credentials;

pub const DEFAULT_TOKEN_URL: &str = "https://apigw-pr.telus.com/token";
pub const DEFAULT_SEND_URL: &str =
    "https://apigw-public-yul-pr-002.cloudapps.telus.com/common/sendEmailProxy/v1/";
pub const DEFAULT_SCOPE: &str = "2432";
pub const DEFAULT_FROM: &str = "testing@telus.com";
pub const DEFAULT_SUBJECT: &str = "Missing translations detected for Telus Shopfront";

pub const BODY_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
<p>Hi,</p>
<p>Please find attached, the missing translations for Telus Business Marketplace.</p>
<p>thanks.</p>
</body>
</html>
"#;

const GRANT_TYPE: &str = "client_credentials";

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub token_url: String,
    pub send_url: String,
    pub scope: String,
    pub from: String,
    pub recipients: Vec<String>,
    pub cc: Vec<String>,
    pub subject: String,
}

impl Default for EmailSettings {
    fn default() -> Self {
        EmailSettings {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            send_url: DEFAULT_SEND_URL.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            from: DEFAULT_FROM.to_string(),
            recipients: Vec::new(),
            cc: Vec::new(),
            subject: DEFAULT_SUBJECT.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
}

/// Mails the report through the OAuth-protected email proxy.
pub struct Notifier<'a> {
    http: &'a Client,
    settings: &'a EmailSettings,
}

impl<'a> Notifier<'a> {
    pub fn new(http: &'a Client, settings: &'a EmailSettings) -> Self {
        Notifier { http, settings }
    }

    /// Client-credentials grant against the gateway's token endpoint.
    pub fn fetch_token(&self, client_id: &str, client_secret: &str) -> Result<String> {
        let form = [
            ("grant_type", GRANT_TYPE),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("scope", self.settings.scope.as_str()),
        ];

        let resp: TokenResponse = http::send_json("email token", RetryPolicy::NONE, || {
            self.http.post(&self.settings.token_url).form(&form)
        })
        .inspect_err(|e| error!(error = %e, "failed to fetch OAuth token"))?;

        if resp.access_token.is_empty() {
            return Err(AuditError::upstream("email token", "response has no access_token"));
        }
        Ok(resp.access_token)
    }

    /// Sends the file at `path` as an attachment to every configured
    /// recipient and returns how many there were. Every failure is returned.
    pub fn notify(&self, path: &Path, credentials: &Credentials) -> Result<usize> {
        if self.settings.recipients.is_empty() {
            return Err(AuditError::Configuration("no email recipients configured".into()));
        }

        let bytes = fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("report.csv")
            .to_string();

        let token = self.fetch_token(&credentials.email_client_id, &credentials.email_client_secret)?;

        let attachment = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("text/csv")
            .map_err(|e| AuditError::upstream("email", e.to_string()))?;

        let form = Form::new()
            .text("from", self.settings.from.clone())
            .text("to", self.settings.recipients.join(","))
            .text("cc", self.settings.cc.join(","))
            .text("subject", self.settings.subject.clone())
            .text("bodyText", BODY_HTML)
            .text("isHtmlBody", "true")
            .part("attachment", attachment);

        let resp = self
            .http
            .post(&self.settings.send_url)
            .bearer_auth(&token)
            .multipart(form)
            .send()
            .map_err(|e| AuditError::upstream("email", e.to_string()))
            .and_then(|r| http::ensure_success("email", r))
            .inspect_err(|e| error!(error = %e, "failed to send email"))?;

        info!(
            status = resp.status().as_u16(),
            recipients = self.settings.recipients.len(),
            "report emailed"
        );
        Ok(self.settings.recipients.len())
    }
}
