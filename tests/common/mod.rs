#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;

use tiny_http::{Header, Response, Server};
use translation_audit::AppConfig;

/// A request as the mock server saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or("")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

pub struct MockServer {
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, path_suffix: &str) -> usize {
        self.recorded()
            .iter()
            .filter(|r| r.path().ends_with(path_suffix))
            .count()
    }
}

/// Starts a server on a free local port that answers every request with
/// whatever `route` returns. The server thread lives until the test binary
/// exits.
pub fn spawn<F>(route: F) -> MockServer
where
    F: Fn(&Recorded) -> (u16, String) + Send + 'static,
{
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&requests);

    thread::spawn(move || {
        for mut request in server.incoming_requests() {
            let mut body = Vec::new();
            let _ = request.as_reader().read_to_end(&mut body);

            let recorded = Recorded {
                method: request.method().to_string(),
                url: request.url().to_string(),
                headers: request
                    .headers()
                    .iter()
                    .map(|h| (h.field.as_str().as_str().to_string(), h.value.as_str().to_string()))
                    .collect(),
                body,
            };

            let (status, body) = route(&recorded);
            log.lock().unwrap().push(recorded);

            let response = Response::from_string(body)
                .with_status_code(status)
                .with_header(Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap());
            let _ = request.respond(response);
        }
    });

    MockServer {
        base_url: format!("http://{addr}"),
        requests,
    }
}

/// Development-mode configuration with every endpoint pointed at `base`.
pub fn test_config(base: &str, report_path: &std::path::Path, extra: &[(&str, &str)]) -> AppConfig {
    let mut vars: HashMap<String, String> = [
        ("ENVIRONMENT", "development"),
        ("GCP_PROJECT_ID", "proj"),
        ("GCP_ACCESS_TOKEN", "google-token"),
        ("CONTENTFUL_ACCESS_TOKEN", "cfpat-test"),
        ("EMAIL_TOKEN_CLIENT_ID", "client-id"),
        ("EMAIL_TOKEN_CLIENT_SECRET", "client-secret"),
        ("EMAIL_LIST", "team@example.com,qa@example.com"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    vars.insert("CONTENTFUL_API_URL".into(), base.to_string());
    vars.insert("TRANSLATE_API_URL".into(), base.to_string());
    vars.insert("EMAIL_TOKEN_URL".into(), format!("{base}/token"));
    vars.insert("EMAIL_SEND_URL".into(), format!("{base}/send"));
    vars.insert("REPORT_PATH".into(), report_path.display().to_string());
    vars.insert("HTTP_TIMEOUT_SECS".into(), "10".into());

    for (k, v) in extra {
        vars.insert(k.to_string(), v.to_string());
    }

    AppConfig::from_lookup(|k| vars.get(k).cloned()).unwrap()
}
