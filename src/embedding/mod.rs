//! Sentence embeddings: the model is remote, only the vectors matter here.

pub mod client;
#[cfg(test)]
pub(crate) mod testing;

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding service rejected the access token. Check HF_TOKEN.")]
    Unauthorized,

    #[error("embedding service rate limit exceeded. Please retry later.")]
    RateLimited,

    #[error("embedding model unavailable: {0}")]
    Unavailable(String),

    #[error("embedding API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed embedding response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("expected {expected} embeddings, got {got}")]
    Shape { expected: usize, got: usize },

    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Maps a batch of texts to fixed-dimension vectors, one per input, in order.
/// Implemented by `HfEmbedder` for production; deterministic fakes in tests.
pub trait Embedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Cosine similarity of two equal-length vectors.
/// Returns 0.0 when either vector has zero norm, the lengths differ, or the
/// result is not finite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    let score = dot / (na.sqrt() * nb.sqrt());
    if score.is_finite() {
        score as f32
    } else {
        0.0
    }
}
