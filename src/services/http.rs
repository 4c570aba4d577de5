use std::{thread, time::Duration};

use rand::{thread_rng, Rng};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{AuditError, Result};

const MAX_ERROR_SNIPPET: usize = 400;

/// How often and how patiently a request is retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    pub const NONE: RetryPolicy = RetryPolicy {
        max_attempts: 1,
        base_delay_ms: 0,
    };

    fn backoff(&self, attempt: usize) -> Duration {
        let jitter: u64 = thread_rng().gen_range(0..200);
        let ms = self.base_delay_ms * (2_u64.pow(attempt as u32)) + jitter;
        Duration::from_millis(ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 800,
        }
    }
}

pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AuditError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Sends a request and decodes a JSON body from a successful response.
///
/// `build` is called once per attempt since blocking request builders are
/// consumed by `send`. Transport errors and 408/429/5xx answers are retried
/// according to `policy`; anything else fails immediately.
pub fn send_json<T, F>(service: &'static str, policy: RetryPolicy, build: F) -> Result<T>
where
    T: DeserializeOwned,
    F: Fn() -> RequestBuilder,
{
    let text = send_text(service, policy, build)?;
    serde_json::from_str(&text)
        .map_err(|e| AuditError::upstream(service, format!("invalid JSON response: {e}")))
}

pub fn send_text<F>(service: &'static str, policy: RetryPolicy, build: F) -> Result<String>
where
    F: Fn() -> RequestBuilder,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_err = String::new();

    for attempt in 0..attempts {
        let retry_left = attempt + 1 < attempts;

        match build().send() {
            Ok(resp) => {
                let status = resp.status();

                // Read as text first so an error body is not lost to a JSON failure.
                let text = match resp.text() {
                    Ok(t) => t,
                    Err(err) => {
                        last_err = err.to_string();
                        if retry_left {
                            thread::sleep(policy.backoff(attempt));
                            continue;
                        }
                        break;
                    }
                };

                if status.is_success() {
                    return Ok(text);
                }

                last_err = extract_error_message(status, &text);
                if transient(status) && retry_left {
                    debug!(service, attempt, status = status.as_u16(), "retrying request");
                    thread::sleep(policy.backoff(attempt));
                    continue;
                }
                break;
            }
            Err(err) => {
                last_err = err.to_string();
                if retry_left {
                    debug!(service, attempt, error = %err, "retrying request");
                    thread::sleep(policy.backoff(attempt));
                    continue;
                }
            }
        }
    }

    Err(AuditError::upstream(service, last_err))
}

/// Fails with the service's own error message when the response is not 2xx.
pub fn ensure_success(service: &'static str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().unwrap_or_default();
    Err(AuditError::upstream(service, extract_error_message(status, &text)))
}

/// 408, 429 and 5xx answers are usually gone on the next attempt.
fn transient(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500..=599)
}

/// `HTTP <status>: <detail>`, where the detail is the service's own
/// `error.message` or `message` field, or else the start of the raw body.
pub(crate) fn extract_error_message(status: StatusCode, body_text: &str) -> String {
    let message = serde_json::from_str::<Value>(body_text).ok().and_then(|v| {
        v.pointer("/error/message")
            .or_else(|| v.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    let detail = message.unwrap_or_else(|| truncate(body_text.trim(), MAX_ERROR_SNIPPET));
    format!("HTTP {}: {}", status.as_u16(), detail)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
