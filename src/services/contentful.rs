use reqwest::blocking::Client;

use crate::error::Result;
use crate::model::contentful::{ContentLocation, ContentType, Entry, Page};
use crate::services::http::{self, RetryPolicy};

pub const DEFAULT_API_URL: &str = "https://api.contentful.com";
pub const DEFAULT_APP_URL: &str = "https://app.contentful.com";

/// Listing access to a content-management space.
pub trait ContentSource {
    fn content_types(&self, location: &ContentLocation, skip: u32, limit: u32) -> Result<Page<ContentType>>;

    /// One page of entries of a content type, with linked entries expanded
    /// up to `include` levels.
    fn entries(
        &self,
        location: &ContentLocation,
        content_type_id: &str,
        include: u32,
        skip: u32,
        limit: u32,
    ) -> Result<Page<Entry>>;
}

/// Contentful Management API client.
pub struct ContentfulClient {
    http: Client,
    base_url: String,
    access_token: String,
    retry: RetryPolicy,
}

impl ContentfulClient {
    pub fn new(http: Client, base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        ContentfulClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn environment_url(&self, location: &ContentLocation, resource: &str) -> String {
        format!(
            "{}/spaces/{}/environments/{}/{}",
            self.base_url, location.space_id, location.environment_id, resource
        )
    }
}

impl ContentSource for ContentfulClient {
    fn content_types(&self, location: &ContentLocation, skip: u32, limit: u32) -> Result<Page<ContentType>> {
        let url = self.environment_url(location, "content_types");
        http::send_json("contentful", self.retry, || {
            self.http
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&[("skip", skip), ("limit", limit)])
        })
    }

    fn entries(
        &self,
        location: &ContentLocation,
        content_type_id: &str,
        include: u32,
        skip: u32,
        limit: u32,
    ) -> Result<Page<Entry>> {
        let url = self.environment_url(location, "entries");
        let include = include.to_string();
        let skip = skip.to_string();
        let limit = limit.to_string();

        http::send_json("contentful", self.retry, || {
            self.http
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&[
                    ("content_type", content_type_id),
                    ("include", include.as_str()),
                    ("limit", limit.as_str()),
                    ("skip", skip.as_str()),
                ])
        })
    }
}

/// Deep link to an entry in the Contentful web app.
pub fn entry_link(app_url: &str, location: &ContentLocation, entry_id: &str) -> String {
    format!(
        "{}/spaces/{}/environments/{}/entries/{}",
        app_url.trim_end_matches('/'),
        location.space_id,
        location.environment_id,
        entry_id
    )
}
