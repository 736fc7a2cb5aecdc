use reqwest::Client;
use tracing::debug;
use url::Url;

use super::{SourceAdapter, SourceFetchError, SourceId, get_json, unwrap_envelope};
use crate::candidate::RawRecord;

pub const API_URL: &str = "https://eduplay.rnp.br/api/v1/search";
const CONTENT_TYPE: &str = "video";
const ORDER: &str = "relevance";
const FIRST_PAGE: &str = "1";
const ENVELOPE_KEY: &str = "contents";

/// Client for the eduplay media search (richer metadata: `title`,
/// `description`, `contentType`, `owner.name`, `embedUrl`).
#[derive(Clone)]
pub struct EduplayClient {
    http: Client,
    base_url: String,
}

impl EduplayClient {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }

    fn search_url(&self, query: &str, limit: usize) -> Result<Url, url::ParseError> {
        let limit = limit.to_string();
        Url::parse_with_params(
            &self.base_url,
            &[
                ("term", query),
                ("limit", limit.as_str()),
                ("page", FIRST_PAGE),
                ("type", CONTENT_TYPE),
                ("order", ORDER),
            ],
        )
    }
}

impl SourceAdapter for EduplayClient {
    fn id(&self) -> SourceId {
        SourceId::Eduplay
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<RawRecord>, SourceFetchError> {
        let url = self.search_url(query, limit)?;
        let body = get_json(&self.http, url).await?;
        let records = unwrap_envelope(body, ENVELOPE_KEY);
        debug!(count = records.len(), "eduplay search complete");
        Ok(records)
    }
}
