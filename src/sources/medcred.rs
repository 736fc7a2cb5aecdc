use reqwest::Client;
use tracing::debug;
use url::Url;

use super::{SourceAdapter, SourceFetchError, SourceId, get_json, unwrap_envelope};
use crate::candidate::RawRecord;

pub const API_URL: &str = "https://api.mecred.c3sl.ufpr.br/public/elastic/search";
const INDEX: &str = "resources";
const ENVELOPE_KEY: &str = "results";

/// Client for the MEC RED resource search (brief resource metadata:
/// `name`, `views`, `likes`, `user.name`).
#[derive(Clone)]
pub struct MedcredClient {
    http: Client,
    base_url: String,
}

impl MedcredClient {
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
                ("indexes", INDEX),
                ("query", query),
                ("limit", limit.as_str()),
            ],
        )
    }
}

impl SourceAdapter for MedcredClient {
    fn id(&self) -> SourceId {
        SourceId::Medcred
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<RawRecord>, SourceFetchError> {
        let url = self.search_url(query, limit)?;
        let body = get_json(&self.http, url).await?;
        let records = unwrap_envelope(body, ENVELOPE_KEY);
        debug!(count = records.len(), "medcred search complete");
        Ok(records)
    }
}
