use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::model::report::{ReportLayout, ReportRow};

pub const DEFAULT_REPORT_PATH: &str = "missing_translations.csv";

const BASE_COLUMNS: [&str; 5] = [
    "contentTypeId",
    "entryId",
    "field",
    "englishContent",
    "frenchContent",
];

pub fn headers(layout: ReportLayout) -> Vec<&'static str> {
    let mut cols = BASE_COLUMNS.to_vec();
    if layout.suggestions {
        cols.push("suggestedFrenchContent");
    }
    if layout.links {
        cols.push("linkToContent");
    }
    cols
}

fn record(row: &ReportRow, layout: ReportLayout) -> Vec<&str> {
    let mut out = vec![
        row.content_type_id.as_str(),
        row.entry_id.as_str(),
        row.field.as_str(),
        row.english_content.as_str(),
        row.french_content.as_deref().unwrap_or(""),
    ];
    if layout.suggestions {
        out.push(row.suggested_french_content.as_deref().unwrap_or(""));
    }
    if layout.links {
        out.push(row.link_to_content.as_deref().unwrap_or(""));
    }
    out
}

/// Encodes the rows as CSV with a header line.
pub fn to_csv(rows: &[ReportRow], layout: ReportLayout) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers(layout))?;
    for row in rows {
        writer.write_record(record(row, layout))?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}

/// Writes the report to `path`, replacing any previous report.
pub fn write(rows: &[ReportRow], layout: ReportLayout, path: &Path) -> Result<()> {
    let bytes = to_csv(rows, layout)?;
    write_atomic(path, &bytes)?;
    info!(path = %path.display(), rows = rows.len(), "report written");
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = tmp_path(path);

    if let Some(parent) = tmp.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;

    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut p = path.to_path_buf();
    let file_name = match path.file_name().and_then(|s| s.to_str()) {
        Some(n) => n.to_string(),
        None => "report.csv".to_string(),
    };
    p.set_file_name(format!("{file_name}.tmp"));
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(english: &str, french: Option<&str>) -> ReportRow {
        ReportRow {
            content_type_id: "page".into(),
            entry_id: "e1".into(),
            field: "title".into(),
            english_content: english.into(),
            french_content: french.map(str::to_string),
            suggested_french_content: None,
            link_to_content: None,
        }
    }

    #[test]
    fn base_layout_header_order() {
        assert_eq!(
            headers(ReportLayout::default()),
            vec!["contentTypeId", "entryId", "field", "englishContent", "frenchContent"]
        );
    }

    #[test]
    fn enriched_layout_appends_optional_columns() {
        let layout = ReportLayout {
            suggestions: true,
            links: true,
        };
        let h = headers(layout);
        assert_eq!(&h[5..], &["suggestedFrenchContent", "linkToContent"]);

        let links_only = headers(ReportLayout {
            suggestions: false,
            links: true,
        });
        assert_eq!(links_only.last(), Some(&"linkToContent"));
        assert_eq!(links_only.len(), 6);
    }

    #[test]
    fn absent_french_is_an_empty_cell() {
        let csv = to_csv(&[row("Hello", None)], ReportLayout::default()).unwrap();
        let text = String::from_utf8(csv).unwrap();
        assert_eq!(
            text,
            "contentTypeId,entryId,field,englishContent,frenchContent\npage,e1,title,Hello,\n"
        );
    }

    #[test]
    fn special_characters_are_quoted() {
        let csv = to_csv(
            &[row("a, \"quoted\"\nvalue", Some("b"))],
            ReportLayout::default(),
        )
        .unwrap();
        let text = String::from_utf8(csv).unwrap();
        assert!(text.contains("\"a, \"\"quoted\"\"\nvalue\""));

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let rec = reader.records().next().unwrap().unwrap();
        assert_eq!(&rec[3], "a, \"quoted\"\nvalue");
        assert_eq!(&rec[4], "b");
    }

    #[test]
    fn write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing_translations.csv");
        fs::write(&path, "stale contents that are longer than the report\n".repeat(10)).unwrap();

        write(&[row("Hello", None)], ReportLayout::default(), &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("contentTypeId,"));
        assert!(!text.contains("stale"));
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn empty_report_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.csv");

        write(&[], ReportLayout::default(), &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "contentTypeId,entryId,field,englishContent,frenchContent\n");
    }
}
