//! Scans a Contentful space for localized fields without a French-Canadian
//! translation, writes the findings to a CSV report and emails it.

pub mod app;
pub mod config;
pub mod error;
pub mod model;
pub mod protocol;
pub mod server;
pub mod services;

pub use app::App;
pub use config::AppConfig;
pub use error::{AuditError, Result};
