//! Data model for the visualization pipeline.
//!
//! These types mirror the three inputs the pipeline consumes (download
//! manifest records, streamed source records) and the two things it
//! produces (per-image metadata, the remote plot job state).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single identifier that may arrive as a JSON string or number.
///
/// Source datasets are not consistent about id types; the index keys
/// everything by the string form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostId {
    Str(String),
    Num(i64),
}

impl PostId {
    /// Normalized string form used as the index key.
    pub fn as_key(&self) -> String {
        match self {
            PostId::Str(s) => s.clone(),
            PostId::Num(n) => n.to_string(),
        }
    }
}

/// One entry of the per-image download manifest, keyed by source URL.
///
/// Produced by an external downloader; read-only input. Parsing is
/// deliberately lenient: missing fields deserialize as `None`/`false` and
/// the loader decides what to do with incomplete records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadRecord {
    /// Whether the image was downloaded successfully.
    #[serde(default)]
    pub success: bool,
    /// Filename of the downloaded image, relative to the staging area.
    #[serde(default)]
    pub filename: Option<String>,
    /// Ids of the posts this image appeared in. One image may belong to
    /// many posts and one post may reference many images.
    #[serde(default)]
    pub post_ids: Option<Vec<PostId>>,
}

/// Accumulated metadata for one successfully downloaded image.
///
/// Mutated incrementally as matching source records are found; immutable
/// once serialized to the metadata file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Unique key: the image filename.
    pub filename: String,
    /// Source URL the image was downloaded from.
    pub permalink: String,
    /// HTML-ish description, append-only, capped at
    /// [`crate::defaults::DESCRIPTION_MAX_CHARS`] characters.
    pub description: String,
    /// Tags accumulated in encounter order, pipe-joined on output.
    /// Duplicates are allowed.
    pub tags: Vec<String>,
    /// Number of distinct source records matched so far.
    pub number_of_posts: u32,
    /// Calendar year of the last matching record's timestamp.
    pub year: Option<i32>,
}

/// One record of the streamed source dataset.
///
/// An opaque, order-preserving JSON object with at least an `id` field;
/// everything else is folded into description text by the scanner. Records
/// are streamed and never fully materialized as a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRecord {
    fields: Map<String, Value>,
}

impl SourceRecord {
    /// Wrap a JSON object. Non-object values are rejected.
    pub fn from_value(value: Value) -> crate::Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(crate::Error::InvalidInput(format!(
                "source record must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Build a record directly from a field map.
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Normalized record id, if present (string or integer accepted).
    pub fn id(&self) -> Option<String> {
        match self.fields.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Raw field access.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// All fields in document order.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Consume the record, yielding its field map.
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Lifecycle state of a remote plot job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotJobStatus {
    /// Created locally, not yet accepted by the remote service.
    Pending,
    /// Accepted (202) or already in flight on the remote service.
    Running,
    /// Completion marker observed; terminal.
    Done,
    /// Unexpected response at trigger or poll; terminal.
    Error,
}

/// The remote service's unit of work for one visualization build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotJob {
    /// Dataset identifier, used as the polling key.
    pub key: String,
    /// Current lifecycle state.
    pub status: PlotJobStatus,
    /// URL of the finished plot, set on completion.
    pub result_url: Option<String>,
}

impl PlotJob {
    /// Create a job in the pending state.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            status: PlotJobStatus::Pending,
            result_url: None,
        }
    }

    /// Mark the job as accepted/in flight.
    pub fn running(mut self) -> Self {
        self.status = PlotJobStatus::Running;
        self
    }

    /// Mark the job as complete with its result URL.
    pub fn done(mut self, result_url: impl Into<String>) -> Self {
        self.status = PlotJobStatus::Done;
        self.result_url = Some(result_url.into());
        self
    }

    /// Mark the job as failed.
    pub fn failed(mut self) -> Self {
        self.status = PlotJobStatus::Error;
        self
    }

    /// Whether the job reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, PlotJobStatus::Done | PlotJobStatus::Error)
    }
}
