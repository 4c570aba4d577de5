use super::field::FieldRecord;

/// One line of the missing-translation report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub content_type_id: String,
    pub entry_id: String,
    pub field: String,
    pub english_content: String,
    pub french_content: Option<String>,
    pub suggested_french_content: Option<String>,
    pub link_to_content: Option<String>,
}

impl From<FieldRecord> for ReportRow {
    fn from(r: FieldRecord) -> Self {
        ReportRow {
            content_type_id: r.content_type_id,
            entry_id: r.entry_id,
            field: r.field,
            english_content: r.english,
            french_content: r.french,
            suggested_french_content: None,
            link_to_content: None,
        }
    }
}

/// Which optional columns a report carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportLayout {
    pub suggestions: bool,
    pub links: bool,
}
