//! Wire payloads exchanged with the chat backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod backend;

/// Body of `POST /chat` and `POST /chat/stream`.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ChatRequest {
    pub question: String,
    pub top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ops: Option<Vec<String>>,
}

/// One line of the NDJSON chat stream.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    Status(StatusEvent),
    AnswerStart,
    AnswerChunk {
        #[serde(default)]
        text: String,
    },
    Final {
        data: StructuredResponse,
    },
    /// Event types this client does not know about yet.
    #[serde(other)]
    Unknown,
}

/// Progress report for one pipeline stage.
///
/// Only `stage` is common to every status event; the remaining fields are
/// filled in by the stage that reports them (`rag` sets `used`/`hits`, `mcp`
/// sets `invoked`/`ops`, and so on).
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct StatusEvent {
    #[serde(default)]
    pub stage: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub used: bool,
    #[serde(default)]
    pub hits: usize,
    #[serde(default)]
    pub min_score: Option<f64>,
    #[serde(default)]
    pub relaxed: bool,
    #[serde(default)]
    pub invoked: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ops: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct StructuredResponse {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub trace: TraceInfo,
    #[serde(default, deserialize_with = "null_as_default")]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub analysis: AnalysisResult,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct TraceInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub tools: Vec<String>,
    #[serde(default)]
    pub latency_ms: u64,
}

impl TraceInfo {
    /// Returns the first tool entry carrying the given route prefix, e.g.
    /// `route.rag:` yields `route.rag:true`.
    pub fn route_decision(&self, prefix: &str) -> Option<&str> {
        self.tools
            .iter()
            .map(String::as_str)
            .find(|tool| tool.starts_with(prefix))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Citation {
    pub doc_id: String,
    #[serde(default)]
    pub chunk_id: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub line_start: Option<u32>,
    #[serde(default)]
    pub line_end: Option<u32>,
}

impl Citation {
    /// Line range label when both ends are known and non-zero, otherwise the
    /// chunk id.
    pub fn location_label(&self) -> String {
        match (self.line_start, self.line_end) {
            (Some(start), Some(end)) if start > 0 && end > 0 => format!("lines {start}-{end}"),
            _ => self.chunk_id.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct AnalysisResult {
    #[serde(default)]
    pub invoked: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ops: Vec<AnalysisOp>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct AnalysisOp {
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stats: BTreeMap<String, f64>,
    #[serde(default)]
    pub artifact_uri: Option<String>,
}

/// Response of `POST /upload-image`.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct UploadResponse {
    #[serde(default)]
    pub image_uri: String,
    #[serde(default)]
    pub preview_url: String,
}

/// Error envelope returned by the backend for non-2xx responses.
#[derive(Debug, Deserialize, Default)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorBody {
    /// The `detail` field as display text. Strings are returned verbatim;
    /// structured details (validation errors) are rendered as compact JSON.
    pub fn detail_text(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::Null => None,
            Value::String(text) if text.is_empty() => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
