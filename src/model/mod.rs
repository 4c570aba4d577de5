pub mod contentful;
pub mod field;
pub mod report;
