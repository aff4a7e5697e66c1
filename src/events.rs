//! Event loading and tag explosion.
//!
//! A data directory holds any number of `*.json` result files, each shaped
//! `{"results": [EventRecord, ...]}`. Loading concatenates every file's
//! records (file-name order, then in-file order); exploding turns each record
//! into one row per tag so downstream views can filter on a single tag value.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{ReportError, ReportResult};

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// One raw event as it appears in a result file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    pub entry_url: String,
    /// Every other field of the source object, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One (record, tag) pair after explosion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRow {
    pub title: String,
    /// `None` only for rows produced from a record with no tags.
    pub tag: Option<String>,
    pub entry_url: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl EventRow {
    pub fn tag_starts_with(&self, prefix: &str) -> bool {
        self.tag.as_deref().is_some_and(|t| t.starts_with(prefix))
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Missing `results` handling
// ---------------------------------------------------------------------------

/// What to do with a result file that has no `results` key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResultsPolicy {
    /// Treat the file as contributing no records.
    #[default]
    DefaultEmpty,
    /// Reject the file with a format error.
    Require,
}

impl ResultsPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            ResultsPolicy::Require
        } else {
            ResultsPolicy::DefaultEmpty
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// List the `*.json` files directly inside `dir`, sorted by file name.
///
/// Hidden files are skipped, as a shell glob would. A directory that does not
/// exist yields an empty list.
pub fn json_files(dir: &Path) -> ReportResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(dir = %dir.display(), "event directory does not exist");
            return Ok(Vec::new());
        }
        Err(e) => return Err(ReportError::io(dir, e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ReportError::io(dir, e))?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        if is_json && !hidden && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Parse the raw bytes of one result file. Bytes that are not UTF-8 are a
/// format error like any other malformed JSON.
pub fn parse_event_file(
    source_name: &str,
    contents: impl AsRef<[u8]>,
    policy: ResultsPolicy,
) -> ReportResult<Vec<EventRecord>> {
    let value: Value = serde_json::from_slice(contents.as_ref())
        .map_err(|e| ReportError::data_format(source_name, e.to_string()))?;
    let Value::Object(mut object) = value else {
        return Err(ReportError::data_format(
            source_name,
            "expected a JSON object at top level",
        ));
    };

    let raw = match (object.remove("results"), policy) {
        (Some(Value::Array(items)), _) => items,
        (None | Some(Value::Null), ResultsPolicy::DefaultEmpty) => {
            warn!(file = source_name, "no `results` key, treating as empty");
            Vec::new()
        }
        (None | Some(Value::Null), ResultsPolicy::Require) => {
            return Err(ReportError::data_format(source_name, "missing `results` key"));
        }
        (Some(_), _) => {
            return Err(ReportError::data_format(source_name, "`results` must be a list"));
        }
    };

    raw.into_iter()
        .enumerate()
        .map(|(i, value)| {
            serde_json::from_value::<EventRecord>(value).map_err(|e| {
                ReportError::data_format(source_name, format!("results[{i}]: {e}"))
            })
        })
        .collect()
}

/// Load and concatenate every result file in `dir`.
pub fn load_event_files(dir: &Path, policy: ResultsPolicy) -> ReportResult<Vec<EventRecord>> {
    let files = json_files(dir)?;
    if files.is_empty() {
        warn!(dir = %dir.display(), "no *.json event files found");
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    for path in &files {
        let bytes = fs::read(path).map_err(|e| ReportError::io(path, e))?;
        let source_name = path.display().to_string();
        let parsed = parse_event_file(&source_name, &bytes, policy)?;
        debug!(file = %source_name, records = parsed.len(), "loaded event file");
        records.extend(parsed);
    }

    info!(files = files.len(), records = records.len(), "event files loaded");
    Ok(records)
}

// ---------------------------------------------------------------------------
// Explosion
// ---------------------------------------------------------------------------

/// Turn every record into one row per tag, preserving tag order.
pub fn explode(records: Vec<EventRecord>) -> Vec<EventRow> {
    let mut rows = Vec::with_capacity(records.iter().map(|r| r.tags.len().max(1)).sum());
    for record in records {
        let EventRecord {
            title,
            tags,
            entry_url,
            extra,
        } = record;

        if tags.is_empty() {
            rows.push(EventRow {
                title,
                tag: None,
                entry_url,
                extra,
            });
            continue;
        }

        for tag in tags {
            rows.push(EventRow {
                title: title.clone(),
                tag: Some(tag),
                entry_url: entry_url.clone(),
                extra: extra.clone(),
            });
        }
    }
    rows
}

/// Load and explode in one step.
pub fn load_event_table(dir: &Path, policy: ResultsPolicy) -> ReportResult<Vec<EventRow>> {
    let rows = explode(load_event_files(dir, policy)?);
    debug!(rows = rows.len(), "event table exploded");
    Ok(rows)
}
