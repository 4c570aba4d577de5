use std::sync::Mutex;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{AuditError, Result};
use crate::services::http::{self, RetryPolicy};

pub const DEFAULT_METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

// Refresh a little before the server-side expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Where bearer tokens for Google APIs come from.
pub enum TokenSource {
    /// A token handed in through configuration (local development).
    Static(String),
    /// The compute metadata server of the runtime's service account.
    Metadata(MetadataToken),
}

impl TokenSource {
    pub fn metadata(url: impl Into<String>) -> Self {
        TokenSource::Metadata(MetadataToken {
            url: url.into(),
            cached: Mutex::new(None),
        })
    }

    pub fn bearer(&self, http: &Client) -> Result<String> {
        match self {
            TokenSource::Static(token) => {
                if token.trim().is_empty() {
                    return Err(AuditError::Configuration("empty Google access token".into()));
                }
                Ok(token.clone())
            }
            TokenSource::Metadata(m) => m.bearer(http),
        }
    }
}

pub struct MetadataToken {
    url: String,
    cached: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

impl MetadataToken {
    fn bearer(&self, http: &Client) -> Result<String> {
        let mut cached = self.cached.lock().unwrap_or_else(|p| p.into_inner());

        if let Some(t) = cached.as_ref() {
            if Instant::now() < t.expires_at {
                return Ok(t.value.clone());
            }
        }

        debug!(url = %self.url, "fetching access token from metadata server");
        let resp: TokenResponse = http::send_json("metadata server", RetryPolicy::NONE, || {
            http.get(&self.url).header("Metadata-Flavor", "Google")
        })?;

        *cached = expiry(Instant::now(), resp.expires_in).map(|expires_at| CachedToken {
            value: resp.access_token.clone(),
            expires_at,
        });

        Ok(resp.access_token)
    }
}

/// When a token issued at `now` should be refreshed. `None` means the
/// lifetime cannot be represented and the token is not cached.
fn expiry(now: Instant, expires_in: u64) -> Option<Instant> {
    let lifetime = Duration::from_secs(expires_in).saturating_sub(EXPIRY_MARGIN);
    now.checked_add(lifetime)
}
