use reqwest::blocking::Client;

use crate::config::{AppConfig, Mode};
use crate::error::Result;
use crate::services::gcp::TokenSource;
use crate::services::http;
use crate::services::secrets::SecretAccessor;
use crate::services::translate::{LanguageService, TranslationClient};

/// Long-lived collaborators, built once at process start and shared by
/// every job.
pub struct App {
    pub config: AppConfig,
    pub http: Client,
    pub language: Box<dyn LanguageService>,
    pub secrets: SecretAccessor,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let http = http::build_client(config.http_timeout)?;

        let language = TranslationClient::new(
            http.clone(),
            config.endpoints.translate.as_str(),
            &config.gcp_project_id,
            &config.gcp_location,
            google_token(&config),
        );

        let secrets = match config.mode {
            Mode::Development => SecretAccessor::Local(config.local_secrets.clone()),
            Mode::Deployed => SecretAccessor::SecretManager {
                endpoint: config.endpoints.secret_manager.clone(),
                project: config.secret_project_id.clone(),
                token: google_token(&config),
            },
        };

        Ok(App {
            config,
            http,
            language: Box::new(language),
            secrets,
        })
    }

    /// Replaces the translation service, e.g. with a stub.
    pub fn with_language(mut self, language: Box<dyn LanguageService>) -> Self {
        self.language = language;
        self
    }
}

fn google_token(config: &AppConfig) -> TokenSource {
    match &config.gcp_access_token {
        Some(token) => TokenSource::Static(token.clone()),
        None => TokenSource::metadata(config.endpoints.metadata_token.as_str()),
    }
}
