use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::error::Result;
use crate::services::gcp::TokenSource;
use crate::services::http::{self, RetryPolicy};

pub const DEFAULT_TRANSLATE_URL: &str = "https://translation.googleapis.com";

/// The translation service rejects longer inputs.
pub const MAX_SUGGESTION_CHARS: usize = 1024;

pub const TEXT_TOO_LONG: &str = "Text exceeds the maximum allowed length of 1024 characters";

/// Language detection and machine translation.
pub trait LanguageService {
    /// Language code of the most likely candidate, if any.
    fn detect_language(&self, text: &str) -> Result<Option<String>>;

    /// Top translation candidate, if any.
    fn translate(&self, text: &str, source: &str, target: &str) -> Result<Option<String>>;
}

/// Google Cloud Translation v3 over REST.
pub struct TranslationClient {
    http: Client,
    endpoint: String,
    parent: String,
    token: TokenSource,
}

#[derive(Deserialize)]
struct DetectResponse {
    #[serde(default)]
    languages: Vec<DetectedLanguage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectedLanguage {
    #[serde(default)]
    language_code: String,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    #[serde(default)]
    translated_text: String,
}

impl TranslationClient {
    pub fn new(
        http: Client,
        endpoint: impl Into<String>,
        project_id: &str,
        location: &str,
        token: TokenSource,
    ) -> Self {
        TranslationClient {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            parent: format!("projects/{project_id}/locations/{location}"),
            token,
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/v3/{}:{}", self.endpoint, self.parent, method)
    }
}

impl LanguageService for TranslationClient {
    fn detect_language(&self, text: &str) -> Result<Option<String>> {
        let bearer = self.token.bearer(&self.http)?;
        let url = self.url("detectLanguage");
        let body = json!({ "content": text, "mimeType": "text/plain" });

        let resp: DetectResponse = http::send_json("translation", RetryPolicy::NONE, || {
            self.http.post(&url).bearer_auth(&bearer).json(&body)
        })?;

        Ok(resp
            .languages
            .into_iter()
            .next()
            .map(|l| l.language_code)
            .filter(|c| !c.is_empty()))
    }

    fn translate(&self, text: &str, source: &str, target: &str) -> Result<Option<String>> {
        let bearer = self.token.bearer(&self.http)?;
        let url = self.url("translateText");
        let body = json!({
            "contents": [text],
            "sourceLanguageCode": source,
            "targetLanguageCode": target,
            "mimeType": "text/plain"
        });

        let resp: TranslateResponse = http::send_json("translation", RetryPolicy::NONE, || {
            self.http.post(&url).bearer_auth(&bearer).json(&body)
        })?;

        Ok(resp.translations.into_iter().next().map(|t| t.translated_text))
    }
}

/// Whether `text` is already written in `target_locale`.
///
/// The check is a loose substring match: a detected `fr` counts for
/// `fr-CA`. Empty text is never translated, and a failing service reports
/// `false` so the value shows up in the report instead of aborting it.
pub fn is_translated(service: &dyn LanguageService, text: Option<&str>, target_locale: &str) -> bool {
    let text = match text {
        Some(t) if !t.is_empty() => t,
        _ => return false,
    };

    match service.detect_language(text) {
        Ok(Some(code)) => target_locale.contains(code.as_str()),
        Ok(None) => false,
        Err(e) => {
            warn!(error = %e, "language detection failed, treating value as untranslated");
            false
        }
    }
}

/// Machine translation of `text` for the report's suggestion column.
///
/// Never fails: over-long input yields [`TEXT_TOO_LONG`] and a failed or
/// empty answer yields an empty string.
pub fn suggest(service: &dyn LanguageService, text: &str, source_locale: &str, target_locale: &str) -> String {
    if text.chars().count() > MAX_SUGGESTION_CHARS {
        return TEXT_TOO_LONG.to_string();
    }

    match service.translate(text, language_code(source_locale), target_locale) {
        Ok(Some(t)) => t,
        Ok(None) => String::new(),
        Err(e) => {
            warn!(error = %e, "translation suggestion failed");
            String::new()
        }
    }
}

/// Primary language subtag of a locale (`en-US` -> `en`).
fn language_code(locale: &str) -> &str {
    locale.split(['-', '_']).next().unwrap_or(locale)
}


#[cfg(test)]
mod tests {
    use super::fake::FakeLanguage;
    use super::*;

    #[test]
    fn empty_text_is_never_translated() {
        let svc = FakeLanguage::detecting(&[("", "fr")]);
        for locale in ["fr-CA", "fr", "en-US", ""] {
            assert!(!is_translated(&svc, Some(""), locale));
            assert!(!is_translated(&svc, None, locale));
        }
        assert_eq!(svc.detect_calls.get(), 0);
    }

    #[test]
    fn detected_code_contained_in_locale_counts_as_translated() {
        let svc = FakeLanguage::detecting(&[("Bonjour", "fr"), ("Hello", "en")]);
        assert!(is_translated(&svc, Some("Bonjour"), "fr-CA"));
        assert!(!is_translated(&svc, Some("Hello"), "fr-CA"));
        assert_eq!(svc.detect_calls.get(), 2);
    }

    #[test]
    fn undetected_language_is_not_translated() {
        let svc = FakeLanguage::default();
        assert!(!is_translated(&svc, Some("???"), "fr-CA"));
    }

    #[test]
    fn detection_failure_fails_closed() {
        let svc = FakeLanguage {
            fail_detect: true,
            ..FakeLanguage::detecting(&[("Bonjour", "fr")])
        };
        assert!(!is_translated(&svc, Some("Bonjour"), "fr-CA"));
    }

    #[test]
    fn suggest_rejects_long_text_without_calling_service() {
        let svc = FakeLanguage::default();
        let long = "a".repeat(MAX_SUGGESTION_CHARS + 1);
        assert_eq!(suggest(&svc, &long, "en-US", "fr-CA"), TEXT_TOO_LONG);
        assert_eq!(svc.translate_calls.get(), 0);
    }

    #[test]
    fn suggest_accepts_text_at_the_limit() {
        let svc = FakeLanguage::default();
        let text = "é".repeat(MAX_SUGGESTION_CHARS);
        let out = suggest(&svc, &text, "en-US", "fr-CA");
        assert!(out.starts_with("[fr-CA] "));
        assert_eq!(svc.translate_calls.get(), 1);
    }

    #[test]
    fn suggest_sends_source_language_subtag() {
        let svc = FakeLanguage::default();
        assert_eq!(suggest(&svc, "Hello", "en-US", "fr-CA"), "[fr-CA] Hello");
        assert_eq!(
            *svc.last_translate.borrow(),
            Some(("en".to_string(), "fr-CA".to_string()))
        );
    }

    #[test]
    fn suggest_failure_yields_empty_string() {
        let svc = FakeLanguage {
            fail_translate: true,
            ..Default::default()
        };
        assert_eq!(suggest(&svc, "Hello", "en-US", "fr-CA"), "");
    }
}
