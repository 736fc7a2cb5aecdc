use tracing::debug;

use crate::candidate::Candidate;
use crate::embedding::{Embedder, EmbeddingError, cosine_similarity};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankOptions {
    /// Maximum number of candidates returned.
    pub top_k: usize,
    /// Candidates scoring below this are dropped before truncation.
    /// `None` keeps everything.
    pub min_similarity: Option<f32>,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_similarity: None,
        }
    }
}

/// Scores every candidate against the query and keeps the best `top_k`.
///
/// The query is embedded once, the candidate texts in a single batch.
/// Results come back in descending score order; equal scores keep their
/// aggregation order. An empty candidate list never reaches the embedder.
pub async fn rank(
    embedder: &impl Embedder,
    query: &str,
    candidates: Vec<Candidate>,
    options: RankOptions,
) -> Result<Vec<Candidate>, EmbeddingError> {
    if candidates.is_empty() || options.top_k == 0 {
        return Ok(Vec::new());
    }

    let mut query_batch = embedder.embed(&[query.to_string()]).await?;
    if query_batch.len() != 1 {
        return Err(EmbeddingError::Shape {
            expected: 1,
            got: query_batch.len(),
        });
    }
    let query_vec = query_batch.swap_remove(0);

    let texts: Vec<String> = candidates
        .iter()
        .map(|c| c.embeddable_text().to_string())
        .collect();
    let vectors = embedder.embed(&texts).await?;

    if vectors.len() != candidates.len() {
        return Err(EmbeddingError::Shape {
            expected: candidates.len(),
            got: vectors.len(),
        });
    }
    if let Some(v) = vectors.iter().find(|v| v.len() != query_vec.len()) {
        return Err(EmbeddingError::DimensionMismatch {
            expected: query_vec.len(),
            got: v.len(),
        });
    }

    let mut scored: Vec<(usize, f32)> = vectors
        .iter()
        .map(|v| cosine_similarity(&query_vec, v))
        .enumerate()
        .collect();
    // `sort_by` is stable, so ties keep aggregation order.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut slots: Vec<Option<Candidate>> = candidates.into_iter().map(Some).collect();
    let ranked: Vec<Candidate> = scored
        .into_iter()
        .filter(|(_, score)| options.min_similarity.is_none_or(|floor| *score >= floor))
        .take(options.top_k)
        .filter_map(|(idx, score)| slots[idx].take().map(|c| c.with_relevance(score)))
        .collect();

    debug!(
        scored = slots.len(),
        kept = ranked.len(),
        top = ranked.first().and_then(Candidate::relevance),
        "ranking complete"
    );
    Ok(ranked)
}
