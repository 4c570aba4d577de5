//! Process configuration.
//!
//! Everything is read from environment variables exactly once at start-up
//! (after loading an optional `.env` file) and then passed around
//! explicitly. In development mode the three job secrets are captured here
//! as well; otherwise they are fetched from the secret store per job.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AuditError, Result};
use crate::model::report::ReportLayout;
use crate::services::notifier::{self, EmailSettings};
use crate::services::secrets::{SecretKey, DEFAULT_SECRET_MANAGER_URL};
use crate::services::{contentful, gcp, report, translate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Secrets and Google token come from local configuration.
    Development,
    /// Secrets come from the secret store, Google token from the metadata server.
    Deployed,
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub contentful_api: String,
    pub contentful_app: String,
    pub translate: String,
    pub secret_manager: String,
    pub metadata_token: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub mode: Mode,
    pub contentful_environment: String,
    pub gcp_project_id: String,
    pub gcp_location: String,
    pub secret_project_id: String,
    pub gcp_access_token: Option<String>,
    pub local_secrets: BTreeMap<SecretKey, String>,
    pub report_path: PathBuf,
    pub excluded_content_types: BTreeSet<String>,
    pub layout: ReportLayout,
    pub email: EmailSettings,
    pub endpoints: Endpoints,
    pub http_timeout: Duration,
    pub port: u16,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("mode", &self.mode)
            .field("contentful_environment", &self.contentful_environment)
            .field("gcp_project_id", &self.gcp_project_id)
            .field("gcp_location", &self.gcp_location)
            .field("secret_project_id", &self.secret_project_id)
            .field("local_secrets", &self.local_secrets.keys().collect::<Vec<_>>())
            .field("report_path", &self.report_path)
            .field("excluded_content_types", &self.excluded_content_types)
            .field("layout", &self.layout)
            .field("email", &self.email)
            .field("endpoints", &self.endpoints)
            .field("http_timeout", &self.http_timeout)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let mode = match get("ENVIRONMENT").as_deref() {
            Some("development") => Mode::Development,
            _ => Mode::Deployed,
        };

        let gcp_project_id = get("GCP_PROJECT_ID")
            .ok_or_else(|| AuditError::Configuration("GCP_PROJECT_ID is not set".into()))?;
        let secret_project_id = get("SECRET_PROJECT_ID").unwrap_or_else(|| gcp_project_id.clone());

        let mut local_secrets = BTreeMap::new();
        if mode == Mode::Development {
            for key in SecretKey::ALL {
                if let Some(v) = get(key.name()) {
                    local_secrets.insert(key, v);
                }
            }
        }

        let email = EmailSettings {
            token_url: or("EMAIL_TOKEN_URL", notifier::DEFAULT_TOKEN_URL),
            send_url: or("EMAIL_SEND_URL", notifier::DEFAULT_SEND_URL),
            scope: or("EMAIL_TOKEN_SCOPE", notifier::DEFAULT_SCOPE),
            from: or("EMAIL_FROM", notifier::DEFAULT_FROM),
            recipients: split_list(get("EMAIL_LIST").as_deref()),
            cc: split_list(get("EMAIL_CC").as_deref()),
            subject: or("EMAIL_SUBJECT", notifier::DEFAULT_SUBJECT),
        };

        let endpoints = Endpoints {
            contentful_api: or("CONTENTFUL_API_URL", contentful::DEFAULT_API_URL),
            contentful_app: or("CONTENTFUL_APP_URL", contentful::DEFAULT_APP_URL),
            translate: or("TRANSLATE_API_URL", translate::DEFAULT_TRANSLATE_URL),
            secret_manager: or("SECRET_MANAGER_URL", DEFAULT_SECRET_MANAGER_URL),
            metadata_token: or("GCP_METADATA_TOKEN_URL", gcp::DEFAULT_METADATA_TOKEN_URL),
        };

        Ok(AppConfig {
            mode,
            contentful_environment: or("CONTENTFUL_ENVIRONMENT", "master"),
            gcp_project_id,
            gcp_location: or("GCP_LOCATION", "global"),
            secret_project_id,
            gcp_access_token: get("GCP_ACCESS_TOKEN"),
            local_secrets,
            report_path: PathBuf::from(or("REPORT_PATH", report::DEFAULT_REPORT_PATH)),
            excluded_content_types: split_list(get("EXCLUDED_CONTENT_TYPES").as_deref())
                .into_iter()
                .collect(),
            layout: ReportLayout {
                suggestions: parse_bool("REPORT_SUGGESTIONS", get("REPORT_SUGGESTIONS"))?,
                links: parse_bool("REPORT_LINKS", get("REPORT_LINKS"))?,
            },
            email,
            endpoints,
            http_timeout: Duration::from_secs(parse_number("HTTP_TIMEOUT_SECS", get("HTTP_TIMEOUT_SECS"), 60)?),
            port: parse_number("PORT", get("PORT"), 8080)?,
        })
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(key: &str, raw: Option<String>) -> Result<bool> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(AuditError::Configuration(format!("{key} must be a boolean, got {other:?}"))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| AuditError::Configuration(format!("{key} must be a number, got {v:?}"))),
    }
}
