use std::collections::HashMap;

use serde_json::Value;

use crate::candidate::{Candidate, RawRecord, lookup};
use crate::sources::SourceId;

pub const NO_RESULTS: &str = "No educational resources found for this query.";

const UNTITLED: &str = "Untitled";
const UNKNOWN: &str = "Unknown";
const NOT_DESCRIBED: &str = "Not described";
const MAX_DESCRIPTION_CHARS: usize = 200;

/// Renders the source-specific body of one result block.
pub type Template = fn(&RawRecord) -> String;

/// Source → template table. Candidates from a source with no template
/// are left out of the report.
pub struct FormatRegistry {
    templates: HashMap<SourceId, Template>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::empty()
            .register(SourceId::Medcred, medcred_block)
            .register(SourceId::Eduplay, eduplay_block)
    }
}

impl FormatRegistry {
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    pub fn register(mut self, source: SourceId, template: Template) -> Self {
        self.templates.insert(source, template);
        self
    }

    /// One numbered block per candidate, in the given order, separated by a
    /// blank line. Returns [`NO_RESULTS`] when nothing renders.
    pub fn format(&self, candidates: &[Candidate]) -> String {
        let blocks: Vec<String> = candidates
            .iter()
            .filter_map(|c| {
                let template = self.templates.get(&c.source())?;
                Some((template(c.payload()), c.relevance()))
            })
            .enumerate()
            .map(|(i, (body, relevance))| {
                let relevance = relevance
                    .map(|r| format!("{r:.4}"))
                    .unwrap_or_else(|| "n/a".to_string());
                format!("{}. {body}\n   Relevance: {relevance}", i + 1)
            })
            .collect();

        if blocks.is_empty() {
            NO_RESULTS.to_string()
        } else {
            blocks.join("\n\n")
        }
    }
}

pub fn format_json(candidates: &[Candidate]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(candidates)
}

fn medcred_block(record: &RawRecord) -> String {
    format!(
        "{} [medcred]\n   Views: {} | Likes: {} | Owner: {}",
        field_or(record, "name", UNTITLED),
        field_or(record, "views", NOT_DESCRIBED),
        field_or(record, "likes", NOT_DESCRIBED),
        field_or(record, "user.name", UNKNOWN),
    )
}

fn eduplay_block(record: &RawRecord) -> String {
    let description = field_or(record, "description", NOT_DESCRIBED);
    let description = if description.chars().count() > MAX_DESCRIPTION_CHARS {
        let cut: String = description.chars().take(MAX_DESCRIPTION_CHARS).collect();
        format!("{}...", cut.trim_end())
    } else {
        description
    };
    format!(
        "{} [eduplay, {}]\n   {}\n   Owner: {} | Link: {}",
        field_or(record, "title", UNTITLED),
        field_or(record, "contentType", UNKNOWN),
        description,
        field_or(record, "owner.name", UNKNOWN),
        field_or(record, "embedUrl", UNKNOWN),
    )
}

fn field_or(record: &RawRecord, path: &str, default: &str) -> String {
    match lookup(record, path) {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
