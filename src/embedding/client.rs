use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use super::{Embedder, EmbeddingError};

pub const API_BASE: &str = "https://router.huggingface.co/hf-inference/models";
pub const DEFAULT_MODEL: &str = "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
struct ApiToken(String);

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Debug, Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [String],
}

/// Client for a Hugging Face feature-extraction endpoint serving a
/// sentence-transformers model (one pooled vector per input).
#[derive(Clone, Debug)]
pub struct HfEmbedder {
    http: Client,
    token: Option<ApiToken>,
    model: String,
    base_url: String,
}

impl HfEmbedder {
    pub fn new(http: Client, base_url: &str, model: &str, token: Option<String>) -> Self {
        Self {
            http,
            token: token.map(ApiToken),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}/pipeline/feature-extraction", self.base_url, self.model)
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = self.endpoint();

        let mut req = self
            .http
            .post(&url)
            .header("User-Agent", crate::USER_AGENT)
            .json(&FeatureExtractionRequest { inputs: texts })
            .timeout(REQUEST_TIMEOUT);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(&token.0);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = extract_error_message(&text);
            let err = classify_status(status.as_u16(), message);
            warn!(error = %err, "embedding API error");
            return Err(err);
        }

        let body = response.bytes().await?;
        let vectors: Vec<Vec<f32>> = serde_json::from_slice(&body)?;
        debug!(model = %self.model, count = vectors.len(), "embedding batch complete");
        Ok(vectors)
    }
}

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;

impl Embedder for HfEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut last_err = None;
        for attempt in 0..MAX_RETRIES {
            match self.request(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) if is_retriable(&e) => {
                    last_err = Some(e);
                    if attempt + 1 < MAX_RETRIES {
                        let delay_ms = jittered_backoff(attempt);
                        debug!(
                            attempt = attempt + 1,
                            delay_ms, "retrying embedding after transient error"
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(EmbeddingError::RateLimited))
    }
}

fn is_retriable(e: &EmbeddingError) -> bool {
    matches!(
        e,
        EmbeddingError::RateLimited
            | EmbeddingError::Unavailable(_)
            | EmbeddingError::Api {
                code: 500..=599,
                ..
            }
    )
}

/// Equal jitter backoff: base/2 + rand(0, base/2).
fn jittered_backoff(attempt: u32) -> u64 {
    let base = INITIAL_BACKOFF_MS * 2u64.pow(attempt);
    let half = base / 2;
    half + fastrand::u64(..half.max(1))
}

fn classify_status(code: u16, message: String) -> EmbeddingError {
    match code {
        401 | 403 => EmbeddingError::Unauthorized,
        429 => EmbeddingError::RateLimited,
        // The inference API answers 503 while the model is loading.
        503 => EmbeddingError::Unavailable(message),
        _ => EmbeddingError::Api { code, message },
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"].as_str().map(String::from))
        .unwrap_or_else(|| body.chars().take(200).collect())
}
