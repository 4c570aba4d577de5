use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, error};

use crate::error::{AuditError, Result};
use crate::services::gcp::TokenSource;
use crate::services::http::{self, RetryPolicy};

pub const DEFAULT_SECRET_MANAGER_URL: &str = "https://secretmanager.googleapis.com";

/// The credentials a job needs, addressed by a fixed name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SecretKey {
    ContentfulAccessToken,
    EmailClientId,
    EmailClientSecret,
}

impl SecretKey {
    pub const ALL: [SecretKey; 3] = [
        SecretKey::ContentfulAccessToken,
        SecretKey::EmailClientId,
        SecretKey::EmailClientSecret,
    ];

    /// Secret id in the store; also the variable name for local secrets.
    pub fn name(self) -> &'static str {
        match self {
            SecretKey::ContentfulAccessToken => "CONTENTFUL_ACCESS_TOKEN",
            SecretKey::EmailClientId => "EMAIL_TOKEN_CLIENT_ID",
            SecretKey::EmailClientSecret => "EMAIL_TOKEN_CLIENT_SECRET",
        }
    }

    pub fn resource_path(self, project: &str) -> String {
        format!("projects/{project}/secrets/{}/versions/latest", self.name())
    }
}

/// Resolves secrets either from values captured at start-up or from the
/// secret store.
pub enum SecretAccessor {
    Local(BTreeMap<SecretKey, String>),
    SecretManager {
        endpoint: String,
        project: String,
        token: TokenSource,
    },
}

#[derive(Deserialize)]
struct AccessResponse {
    payload: Option<SecretPayload>,
}

#[derive(Deserialize)]
struct SecretPayload {
    #[serde(default)]
    data: String,
}

impl SecretAccessor {
    pub fn access(&self, http: &Client, key: SecretKey) -> Result<String> {
        let value = match self {
            SecretAccessor::Local(values) => values
                .get(&key)
                .cloned()
                .ok_or_else(|| AuditError::Configuration(format!("{} is not set", key.name())))?,
            SecretAccessor::SecretManager {
                endpoint,
                project,
                token,
            } => {
                let url = format!(
                    "{}/v1/{}:access",
                    endpoint.trim_end_matches('/'),
                    key.resource_path(project)
                );
                let bearer = token.bearer(http)?;
                debug!(secret = key.name(), "accessing secret version");

                let resp: AccessResponse =
                    http::send_json("secret manager", RetryPolicy::NONE, || {
                        http.get(&url).bearer_auth(&bearer)
                    })
                    .inspect_err(|e| error!(secret = key.name(), error = %e, "failed to retrieve secret"))?;

                decode_payload(key, resp)?
            }
        };

        if value.trim().is_empty() {
            return Err(AuditError::Configuration(format!("{} is empty", key.name())));
        }
        Ok(value)
    }
}

fn decode_payload(key: SecretKey, resp: AccessResponse) -> Result<String> {
    let data = resp
        .payload
        .map(|p| p.data)
        .ok_or_else(|| AuditError::Configuration(format!("{} has no payload", key.name())))?;

    let bytes = STANDARD.decode(data.as_bytes()).map_err(|e| {
        AuditError::Configuration(format!("{} payload is not base64: {e}", key.name()))
    })?;

    String::from_utf8(bytes)
        .map_err(|_| AuditError::Configuration(format!("{} payload is not UTF-8", key.name())))
}

/// Every secret one job invocation needs, fetched once up front.
#[derive(Clone)]
pub struct Credentials {
    pub contentful_access_token: String,
    pub email_client_id: String,
    pub email_client_secret: String,
}

impl Credentials {
    pub fn resolve(accessor: &SecretAccessor, http: &Client) -> Result<Self> {
        Ok(Credentials {
            contentful_access_token: accessor.access(http, SecretKey::ContentfulAccessToken)?,
            email_client_id: accessor.access(http, SecretKey::EmailClientId)?,
            email_client_secret: accessor.access(http, SecretKey::EmailClientSecret)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("contentful_access_token", &"<redacted>")
            .field("email_client_id", &"<redacted>")
            .field("email_client_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(pairs: &[(SecretKey, &str)]) -> SecretAccessor {
        SecretAccessor::Local(pairs.iter().map(|(k, v)| (*k, v.to_string())).collect())
    }

    #[test]
    fn resource_path_addresses_latest_version() {
        assert_eq!(
            SecretKey::EmailClientId.resource_path("1234"),
            "projects/1234/secrets/EMAIL_TOKEN_CLIENT_ID/versions/latest"
        );
    }

    #[test]
    fn local_secrets_resolve_all_credentials() {
        let accessor = local(&[
            (SecretKey::ContentfulAccessToken, "cfpat-1"),
            (SecretKey::EmailClientId, "client"),
            (SecretKey::EmailClientSecret, "shh"),
        ]);
        let creds = Credentials::resolve(&accessor, &Client::new()).unwrap();
        assert_eq!(creds.contentful_access_token, "cfpat-1");
        assert_eq!(creds.email_client_id, "client");
        assert_eq!(creds.email_client_secret, "shh");
    }

    #[test]
    fn missing_local_secret_is_a_configuration_error() {
        let accessor = local(&[(SecretKey::ContentfulAccessToken, "cfpat-1")]);
        let err = Credentials::resolve(&accessor, &Client::new()).unwrap_err();
        assert!(matches!(err, AuditError::Configuration(ref m) if m.contains("EMAIL_TOKEN_CLIENT_ID")));
    }

    #[test]
    fn blank_secret_is_rejected() {
        let accessor = local(&[(SecretKey::EmailClientSecret, "   ")]);
        let err = accessor
            .access(&Client::new(), SecretKey::EmailClientSecret)
            .unwrap_err();
        assert!(matches!(err, AuditError::Configuration(_)));
    }

    #[test]
    fn debug_output_hides_secret_values() {
        let creds = Credentials {
            contentful_access_token: "cfpat-very-secret".into(),
            email_client_id: "id".into(),
            email_client_secret: "secret".into(),
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("cfpat-very-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn payload_is_base64_decoded() {
        let resp = AccessResponse {
            payload: Some(SecretPayload {
                data: STANDARD.encode("token-value"),
            }),
        };
        assert_eq!(
            decode_payload(SecretKey::ContentfulAccessToken, resp).unwrap(),
            "token-value"
        );
    }
}
