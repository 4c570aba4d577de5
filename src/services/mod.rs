pub mod contentful;
pub mod detector;
pub mod gcp;
pub mod http;
pub mod notifier;
pub mod report;
pub mod scanner;
pub mod secrets;
pub mod translate;
