use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::app::App;
use crate::error::{AuditError, Result};
use crate::model::contentful::ContentLocation;
use crate::services::contentful::ContentfulClient;
use crate::services::detector::{self, DetectOptions};
use crate::services::notifier::Notifier;
use crate::services::report;
use crate::services::scanner::ScanOptions;
use crate::services::secrets::Credentials;

mod stage;
pub use stage::Stage;

pub const INVALID_REQUEST: &str = "Invalid Request!";
pub const REPORT_SENT: &str = "Missing translations sent!";

/// Trigger payload.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    #[serde(default)]
    pub space_id: String,

    #[serde(default)]
    pub scan_all_entries: bool,
}

/// Status code and plain-text body answered to the trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Reply {
            status: 200,
            body: body.into(),
        }
    }

    pub fn bad_request() -> Self {
        Reply {
            status: 400,
            body: INVALID_REQUEST.to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Reply {
            status: 500,
            body: message.into(),
        }
    }
}

/// What a completed job produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub rows: usize,
    pub recipients: usize,
    pub report_path: PathBuf,
}

pub fn parse_request(body: &str) -> Result<TriggerRequest> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| AuditError::Validation(format!("invalid json: {e}")))?;

    let req: TriggerRequest = serde_json::from_value(value)
        .map_err(|e| AuditError::Validation(format!("invalid payload: {e}")))?;

    if req.space_id.trim().is_empty() {
        return Err(AuditError::Validation("spaceId is required".into()));
    }
    if !req.scan_all_entries {
        return Err(AuditError::Validation("scanAllEntries must be true".into()));
    }

    Ok(req)
}

/// Handles one trigger body: validate, run the job, map the outcome to a
/// reply. Invalid requests are answered with 400 before anything else
/// happens; any failure after that is a 500 carrying the error message.
pub fn handle(app: &App, body: &str) -> Reply {
    let mut job = Job::new();

    job.advance(Stage::Validating);
    let req = match parse_request(body) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "rejected trigger");
            job.advance(Stage::Failed);
            return Reply::bad_request();
        }
    };

    match job.run(app, &req.space_id) {
        Ok(_) => Reply::ok(REPORT_SENT),
        Err(e) => Reply::internal(e.to_string()),
    }
}

/// Runs a full scan → report → email cycle for one space.
pub fn run_job(app: &App, space_id: &str) -> Result<JobSummary> {
    Job::new().run(app, space_id)
}

struct Job {
    stage: Stage,
}

impl Job {
    fn new() -> Self {
        Job { stage: Stage::Idle }
    }

    fn advance(&mut self, next: Stage) {
        debug!(from = %self.stage, to = %next, "job stage");
        self.stage = next;
    }

    fn run(&mut self, app: &App, space_id: &str) -> Result<JobSummary> {
        match self.stages(app, space_id) {
            Ok(summary) => {
                self.advance(Stage::Done);
                info!(
                    space = space_id,
                    rows = summary.rows,
                    recipients = summary.recipients,
                    "missing translation report delivered"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(stage = %self.stage, space = space_id, error = %e, "job failed");
                self.advance(Stage::Failed);
                Err(e)
            }
        }
    }

    fn stages(&mut self, app: &App, space_id: &str) -> Result<JobSummary> {
        let cfg = &app.config;

        self.advance(Stage::Scanning);
        let credentials = Credentials::resolve(&app.secrets, &app.http)?;
        let location = ContentLocation::new(space_id, cfg.contentful_environment.as_str());
        let source = ContentfulClient::new(
            app.http.clone(),
            cfg.endpoints.contentful_api.as_str(),
            credentials.contentful_access_token.as_str(),
        );
        let opts = DetectOptions {
            scan: ScanOptions::new(&cfg.excluded_content_types),
            layout: cfg.layout,
            app_url: &cfg.endpoints.contentful_app,
        };
        let rows = detector::detect(&source, app.language.as_ref(), &location, &opts)?;

        self.advance(Stage::Writing);
        report::write(&rows, cfg.layout, &cfg.report_path)?;

        self.advance(Stage::Notifying);
        let recipients = Notifier::new(&app.http, &cfg.email).notify(&cfg.report_path, &credentials)?;

        Ok(JobSummary {
            rows: rows.len(),
            recipients,
            report_path: cfg.report_path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_request_parses() {
        let req = parse_request(r#"{"spaceId":"abc","scanAllEntries":true}"#).unwrap();
        assert_eq!(
            req,
            TriggerRequest {
                space_id: "abc".into(),
                scan_all_entries: true
            }
        );
    }

    #[test]
    fn scan_flag_must_be_true() {
        for body in [
            r#"{"spaceId":"abc","scanAllEntries":false}"#,
            r#"{"spaceId":"abc"}"#,
        ] {
            assert!(matches!(parse_request(body), Err(AuditError::Validation(_))));
        }
    }

    #[test]
    fn space_id_is_required() {
        let err = parse_request(r#"{"scanAllEntries":true}"#).unwrap_err();
        assert!(matches!(err, AuditError::Validation(ref m) if m.contains("spaceId")));
    }

    #[test]
    fn malformed_bodies_are_validation_errors() {
        for body in ["", "not json", "[1,2]", r#"{"spaceId":1,"scanAllEntries":true}"#] {
            assert!(matches!(parse_request(body), Err(AuditError::Validation(_))), "{body}");
        }
    }

    #[test]
    fn stage_names() {
        assert_eq!(Stage::Notifying.to_string(), "notifying");
        assert_eq!(Stage::Failed.to_string(), "failed");
    }
}
