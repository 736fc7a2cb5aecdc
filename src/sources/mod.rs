//! Source adapters: one per external resource catalog.

pub mod eduplay;
pub mod medcred;

use std::fmt;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

pub use eduplay::EduplayClient;
pub use medcred::MedcredClient;

use crate::candidate::RawRecord;

/// Identifies the catalog a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    Medcred,
    Eduplay,
}

impl SourceId {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::Medcred => "medcred",
            SourceId::Eduplay => "eduplay",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceFetchError {
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {code}: {message}")]
    Status { code: u16, message: String },

    #[error("invalid JSON body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A search backend that turns a query into raw, source-shaped records.
///
/// Each call issues at most one request and never retries.
pub trait SourceAdapter {
    fn id(&self) -> SourceId;

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<RawRecord>, SourceFetchError>;
}

/// The configured adapters, dispatched by variant.
#[derive(Clone)]
pub enum Source {
    Medcred(MedcredClient),
    Eduplay(EduplayClient),
    /// Configured but switched off: always yields no records.
    Disabled(SourceId),
}

impl SourceAdapter for Source {
    fn id(&self) -> SourceId {
        match self {
            Source::Medcred(_) => SourceId::Medcred,
            Source::Eduplay(_) => SourceId::Eduplay,
            Source::Disabled(id) => *id,
        }
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<RawRecord>, SourceFetchError> {
        match self {
            Source::Medcred(client) => client.fetch(query, limit).await,
            Source::Eduplay(client) => client.fetch(query, limit).await,
            Source::Disabled(id) => {
                debug!(source = %id, "source disabled, skipping");
                Ok(Vec::new())
            }
        }
    }
}

pub(crate) async fn get_json(http: &Client, url: Url) -> Result<Value, SourceFetchError> {
    let response = http
        .get(url)
        .header("Accept", "application/json")
        .header("User-Agent", crate::USER_AGENT)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(SourceFetchError::Status {
            code: status.as_u16(),
            message: text.chars().take(200).collect(),
        });
    }

    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Flattens a response body into records.
///
/// Accepts a top-level array or an object holding the array under `key`.
/// Any other shape yields no records. Non-object array items are dropped.
pub(crate) fn unwrap_envelope(body: Value, key: &str) -> Vec<RawRecord> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut envelope) => match envelope.remove(key) {
            Some(Value::Array(items)) => items,
            _ => {
                warn!(key, "response envelope has no result list");
                return Vec::new();
            }
        },
        _ => {
            warn!(key, "unexpected response body shape");
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(record) => Some(record),
            _ => {
                debug!("skipping non-object result item");
                None
            }
        })
        .collect()
}
