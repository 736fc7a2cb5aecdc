//! Canonical candidate representation and per-source field extraction.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::sources::SourceId;

/// A single result object exactly as a source returned it.
pub type RawRecord = Map<String, Value>;

const TEXT_SEPARATOR: &str = " ";

/// Which raw fields feed a source's embedding text.
///
/// A missing or non-string field extracts as an empty string. Records are
/// never rejected for lacking a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPolicy {
    pub title: &'static str,
    pub description: Option<&'static str>,
}

pub const fn field_policy(source: SourceId) -> FieldPolicy {
    match source {
        SourceId::Medcred => FieldPolicy {
            title: "name",
            description: Some("description"),
        },
        SourceId::Eduplay => FieldPolicy {
            title: "title",
            description: Some("description"),
        },
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    source: SourceId,
    #[serde(skip)]
    embeddable_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    relevance: Option<f32>,
    payload: RawRecord,
}

impl Candidate {
    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn embeddable_text(&self) -> &str {
        &self.embeddable_text
    }

    pub fn payload(&self) -> &RawRecord {
        &self.payload
    }

    pub fn relevance(&self) -> Option<f32> {
        self.relevance
    }

    /// Attaches the ranking score. A candidate is scored at most once.
    pub(crate) fn with_relevance(mut self, score: f32) -> Self {
        debug_assert!(self.relevance.is_none(), "candidate scored twice");
        self.relevance = Some(score);
        self
    }
}

/// Tags a raw record with its source and derives its embedding text.
pub fn normalize(source: SourceId, record: RawRecord) -> Candidate {
    let policy = field_policy(source);

    let title = string_field(&record, policy.title).unwrap_or_else(|| {
        debug!(%source, field = policy.title, "record has no title, embedding empty text");
        ""
    });

    let mut text = title.trim().to_string();
    if let Some(description) = policy
        .description
        .and_then(|key| string_field(&record, key))
        .map(str::trim)
        .filter(|d| !d.is_empty())
    {
        if !text.is_empty() {
            text.push_str(TEXT_SEPARATOR);
        }
        text.push_str(description);
    }

    Candidate {
        source,
        embeddable_text: text,
        relevance: None,
        payload: record,
    }
}

/// Looks up a dotted path such as `user.name` through nested objects.
pub fn lookup<'a>(record: &'a RawRecord, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = record.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn string_field<'a>(record: &'a RawRecord, path: &str) -> Option<&'a str> {
    lookup(record, path).and_then(Value::as_str)
}

#[cfg(test)]
pub(crate) fn record(value: Value) -> RawRecord {
    match value {
        Value::Object(map) => map,
        other => panic!("expected JSON object, got {other}"),
    }
}
