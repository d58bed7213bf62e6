//! Source join scanner.
//!
//! Streams the (potentially very large) source dataset exactly once and
//! merges every record whose id appears in the post index into the
//! registry's per-image accumulators. The scanner owns the registry
//! mutably for the duration of the pass; memory use is bounded by the
//! number of downloaded images, never by the source size.

use chrono::Datelike;
use serde_json::Value;
use tracing::{debug, warn};

use vizpipe_core::defaults::DESCRIPTION_MAX_CHARS;
use vizpipe_core::{ImageMetadata, ItemMapper, Result, SourceRecord};

use crate::registry::ImageRegistry;

/// Description fields rendered first, in this order; any remaining record
/// fields follow in document order.
const ORDERED_FIELDS: [&str; 5] = ["id", "timestamp", "subject", "body", "author"];

/// Counters describing one scan pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Records read from the stream.
    pub records_seen: u64,
    /// Records whose id matched at least one downloaded image.
    pub records_matched: u64,
    /// Records skipped: unreadable, or missing an id.
    pub skipped_records: u64,
    /// Matching records whose timestamp could not be parsed.
    pub bad_timestamps: u64,
}

/// Stream the source records once, merging matches into the registry.
///
/// Each record is first normalized through the optional `mapper`. A record
/// matches when its id (string or integer) is present in the post index;
/// the match is applied to every filename listed under that id. Unreadable
/// records and records without an id are counted, not fatal.
pub fn scan_source<I>(
    registry: &mut ImageRegistry,
    records: I,
    mapper: Option<&dyn ItemMapper>,
) -> ScanStats
where
    I: IntoIterator<Item = Result<SourceRecord>>,
{
    let mut stats = ScanStats::default();

    for record in records {
        stats.records_seen += 1;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Unreadable source record, skipping");
                stats.skipped_records += 1;
                continue;
            }
        };
        let record = match mapper {
            Some(mapper) => mapper.map_item(record),
            None => record,
        };
        let id = match record.id() {
            Some(id) => id,
            None => {
                stats.skipped_records += 1;
                continue;
            }
        };

        let filenames = match registry.filenames_for_post(&id) {
            Some(filenames) => filenames.to_vec(),
            None => continue,
        };
        stats.records_matched += 1;

        for filename in filenames {
            if let Some(image) = registry.get_mut(&filename) {
                apply_post(image, &record, &mut stats);
            }
        }
    }

    debug!(
        seen = stats.records_seen,
        matched = stats.records_matched,
        skipped = stats.skipped_records,
        bad_timestamps = stats.bad_timestamps,
        "Source scan complete"
    );
    stats
}

/// Fold one matching source record into an image's accumulators.
fn apply_post(image: &mut ImageMetadata, record: &SourceRecord, stats: &mut ScanStats) {
    image.number_of_posts += 1;

    let mut block = format!("<br/><br/><b>Post {}</b>", image.number_of_posts);
    for key in ORDERED_FIELDS {
        if let Some(value) = record.get(key) {
            if is_truthy(value) {
                push_detail(&mut block, key, value);
            }
        }
    }
    for (key, value) in record.fields() {
        if !ORDERED_FIELDS.contains(&key.as_str()) {
            push_detail(&mut block, key, value);
        }
    }
    image.description.push_str(&block);
    // Hard cap, applied after every append rather than once at the end.
    truncate_chars(&mut image.description, DESCRIPTION_MAX_CHARS);

    let tag_source = match record.get("tags") {
        Some(tags) => Some(tags),
        None => record.get("hashtags"),
    };
    if let Some(tags) = tag_source {
        merge_tags(&mut image.tags, tags);
    }

    if let Some(timestamp) = record.get("timestamp") {
        match parse_year(timestamp) {
            // Last write wins: a later post referencing the same image
            // replaces the previously recorded year.
            Some(year) => image.year = Some(year),
            None => stats.bad_timestamps += 1,
        }
    }
}

fn push_detail(block: &mut String, key: &str, value: &Value) {
    block.push_str("<br/><br/><b>");
    block.push_str(key);
    block.push_str(":</b> ");
    block.push_str(&render_value(value));
}

/// Render a field value as plain text: strings verbatim, everything else
/// as compact JSON.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Empty strings, zeros, nulls, and empty containers are omitted from the
/// ordered description fields.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

/// Truncate a string to at most `max` characters, on a char boundary.
fn truncate_chars(s: &mut String, max: usize) {
    if let Some((index, _)) = s.char_indices().nth(max) {
        s.truncate(index);
    }
}

/// Merge a `tags`/`hashtags` value into the accumulated tag list.
///
/// Accepts either a sequence of strings or a comma-delimited string;
/// accumulation is append-only in encounter order, duplicates allowed.
fn merge_tags(tags: &mut Vec<String>, value: &Value) {
    match value {
        Value::Array(items) => {
            for item in items {
                tags.push(render_value(item));
            }
        }
        Value::String(s) if !s.is_empty() => {
            for piece in s.split(',') {
                tags.push(piece.to_string());
            }
        }
        _ => {}
    }
}

/// Extract a calendar year from a timestamp value.
///
/// Accepts epoch seconds (number or numeric string), RFC 3339, and the
/// common `YYYY-MM-DD[ HH:MM:SS]` shapes source datasets use.
fn parse_year(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => {
            let secs = n.as_i64()?;
            chrono::DateTime::from_timestamp(secs, 0).map(|dt| dt.year())
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(secs) = s.parse::<i64>() {
                return chrono::DateTime::from_timestamp(secs, 0).map(|dt| dt.year());
            }
            if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
                return Some(dt.year());
            }
            for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
                if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, format) {
                    return Some(dt.year());
                }
            }
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.year())
        }
        _ => None,
    }
}
