use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::model::contentful::{ContentLocation, ContentType};
use crate::model::field::{french_leaf, FieldRecord, LeafPair, Node};
use crate::services::contentful::ContentSource;

pub const ENGLISH_LOCALE: &str = "en-US";
pub const FRENCH_LOCALE: &str = "fr-CA";
pub const PAGE_SIZE: u32 = 1000;
pub const INCLUDE_DEPTH: u32 = 10;

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions<'a> {
    pub english_locale: &'a str,
    pub french_locale: &'a str,
    pub excluded: &'a BTreeSet<String>,
    pub page_size: u32,
    pub include_depth: u32,
}

impl<'a> ScanOptions<'a> {
    pub fn new(excluded: &'a BTreeSet<String>) -> Self {
        ScanOptions {
            english_locale: ENGLISH_LOCALE,
            french_locale: FRENCH_LOCALE,
            excluded,
            page_size: PAGE_SIZE,
            include_depth: INCLUDE_DEPTH,
        }
    }
}

/// Collects every English/French leaf pair of every localized field in the
/// environment.
///
/// Content types are scanned independently: if reading one of them fails,
/// the failure is logged and that type contributes nothing, while the rest
/// of the scan goes on. Failing to list the content types themselves is an
/// error.
pub fn scan(source: &dyn ContentSource, location: &ContentLocation, opts: &ScanOptions) -> Result<Vec<FieldRecord>> {
    let content_types = list_content_types(source, location, opts.page_size)?;
    info!(
        space = %location.space_id,
        environment = %location.environment_id,
        content_types = content_types.len(),
        "scanning content types"
    );

    let mut records = Vec::new();

    for ct in &content_types {
        if opts.excluded.contains(ct.id()) {
            debug!(content_type = ct.id(), "content type excluded from scan");
            continue;
        }

        match scan_content_type(source, location, ct, opts) {
            Ok(found) => {
                debug!(content_type = ct.id(), leaf_pairs = found.len(), "content type scanned");
                records.extend(found);
            }
            Err(e) => {
                warn!(content_type = ct.id(), error = %e, "failed to scan content type, skipping");
            }
        }
    }

    Ok(records)
}

fn list_content_types(source: &dyn ContentSource, location: &ContentLocation, page_size: u32) -> Result<Vec<ContentType>> {
    let limit = page_size.max(1);
    let mut skip = 0u32;
    let mut out = Vec::new();

    loop {
        let page = source.content_types(location, skip, limit)?;
        out.extend(page.items);
        skip += limit;
        if skip >= page.total {
            break;
        }
    }

    Ok(out)
}

fn scan_content_type(
    source: &dyn ContentSource,
    location: &ContentLocation,
    ct: &ContentType,
    opts: &ScanOptions,
) -> Result<Vec<FieldRecord>> {
    let limit = opts.page_size.max(1);
    let mut skip = 0u32;
    let mut out = Vec::new();

    loop {
        let page = source.entries(location, ct.id(), opts.include_depth, skip, limit)?;
        debug!(content_type = ct.id(), skip, total = page.total, items = page.items.len(), "entries page");

        for entry in &page.items {
            for field_id in entry.fields.keys() {
                if !ct.is_localized(field_id) {
                    continue;
                }

                let Some(english) = entry.localized_value(field_id, opts.english_locale) else {
                    continue;
                };
                let french = entry.localized_value(field_id, opts.french_locale);

                for pair in flatten(english, french) {
                    out.push(FieldRecord {
                        content_type_id: ct.id().to_string(),
                        entry_id: entry.id().to_string(),
                        field: field_id.clone(),
                        english: pair.english,
                        french: pair.french,
                    });
                }
            }
        }

        skip += limit;
        if skip >= page.total {
            break;
        }
    }

    Ok(out)
}

struct Frame<'a> {
    english: &'a [Value],
    french: Option<&'a [Value]>,
    next: usize,
}

fn seq(value: Option<&Value>) -> Option<&[Value]> {
    match value.and_then(Node::of) {
        Some(Node::Seq(items)) => Some(items),
        _ => None,
    }
}

/// Walks an English value and its French counterpart in lockstep and
/// returns one pair per English string leaf, in document order.
///
/// Nested sequences are followed with an explicit stack. A French value that
/// is missing, shorter, or shaped differently at some position yields
/// `None` there. English positions that are neither strings nor sequences
/// (link objects and the like) are skipped.
pub fn flatten(english: &Value, french: Option<&Value>) -> Vec<LeafPair> {
    let mut out = Vec::new();

    let root = match Node::of(english) {
        Some(Node::Leaf(text)) => {
            out.push(LeafPair {
                english: text.to_string(),
                french: french_leaf(french),
            });
            return out;
        }
        Some(Node::Seq(items)) => items,
        None => return out,
    };

    let mut stack = vec![Frame {
        english: root,
        french: seq(french),
        next: 0,
    }];

    while let Some(frame) = stack.last_mut() {
        let english = frame.english;
        let french = frame.french;
        let i = frame.next;

        let Some(item) = english.get(i) else {
            stack.pop();
            continue;
        };
        frame.next += 1;

        let french_item = french.and_then(|f| f.get(i));

        match Node::of(item) {
            Some(Node::Leaf(text)) => out.push(LeafPair {
                english: text.to_string(),
                french: french_leaf(french_item),
            }),
            Some(Node::Seq(children)) => stack.push(Frame {
                english: children,
                french: seq(french_item),
                next: 0,
            }),
            None => debug!(value = %item, "skipping non-text value in localized array"),
        }
    }

    out
}
