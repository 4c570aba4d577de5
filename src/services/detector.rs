use tracing::info;

use crate::error::Result;
use crate::model::contentful::ContentLocation;
use crate::model::report::{ReportLayout, ReportRow};
use crate::services::contentful::{self, ContentSource};
use crate::services::scanner::{self, ScanOptions};
use crate::services::translate::{self, LanguageService};

pub struct DetectOptions<'a> {
    pub scan: ScanOptions<'a>,
    pub layout: ReportLayout,
    /// Web app base URL used for `linkToContent`.
    pub app_url: &'a str,
}

/// Scans the environment and keeps the leaf pairs whose French value is not
/// already French, in scan order.
pub fn detect(
    source: &dyn ContentSource,
    language: &dyn LanguageService,
    location: &ContentLocation,
    opts: &DetectOptions,
) -> Result<Vec<ReportRow>> {
    let records = scanner::scan(source, location, &opts.scan)?;
    let scanned = records.len();

    let mut rows = Vec::new();

    for record in records {
        if translate::is_translated(language, record.french.as_deref(), opts.scan.french_locale) {
            continue;
        }

        let mut row = ReportRow::from(record);

        if opts.layout.suggestions {
            row.suggested_french_content = Some(translate::suggest(
                language,
                &row.english_content,
                opts.scan.english_locale,
                opts.scan.french_locale,
            ));
        }

        if opts.layout.links {
            row.link_to_content = Some(contentful::entry_link(opts.app_url, location, &row.entry_id));
        }

        rows.push(row);
    }

    info!(scanned, missing = rows.len(), "missing translation detection finished");
    Ok(rows)
}
