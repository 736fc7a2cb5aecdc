//! Deterministic embedders for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{Embedder, EmbeddingError};

const DIM: usize = 64;

/// Hashes lowercase word tokens into a fixed number of buckets.
/// Identical texts embed identically; the empty string embeds to zeros.
#[derive(Default)]
pub(crate) struct BagOfWords {
    batches: Mutex<Vec<Vec<String>>>,
}

impl BagOfWords {
    pub(crate) fn calls(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    pub(crate) fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }

    fn vectorize(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; DIM];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = fnv1a(&token.to_lowercase()) as usize % DIM;
            v[bucket] += 1.0;
        }
        v
    }
}

fn fnv1a(s: &str) -> u64 {
    s.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}

impl Embedder for BagOfWords {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.batches.lock().unwrap().push(texts.to_vec());
        Ok(texts.iter().map(|t| Self::vectorize(t)).collect())
    }
}

/// Always fails, as an unreachable backend would.
pub(crate) struct Unavailable;

impl Embedder for Unavailable {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Unavailable("backend offline".into()))
    }
}

/// Answers each call with the next scripted batch, then with nothing.
pub(crate) struct Scripted(Mutex<VecDeque<Vec<Vec<f32>>>>);

impl Scripted {
    pub(crate) fn new(responses: Vec<Vec<Vec<f32>>>) -> Self {
        Self(Mutex::new(responses.into()))
    }
}

impl Embedder for Scripted {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(self.0.lock().unwrap().pop_front().unwrap_or_default())
    }
}
