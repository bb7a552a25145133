/// Mock embedder for testing.
///
/// Produces deterministic unit vectors derived from a text hash, so tests can
/// exercise the index and pipeline without a running embedding backend.
use std::hash::{DefaultHasher, Hash, Hasher};

use super::{Embedder, EmbedderError};

pub struct MockEmbedder {
    pub dimensions: usize,
}

impl MockEmbedder {
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self { dimensions: 768 }
    }
}

impl Embedder for MockEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);

        // Expand the 64-bit hash into `dimensions` values with an xorshift
        // walk; identical input always yields the identical vector.
        let mut state = hasher.finish() | 1;
        let mut embedding = Vec::with_capacity(self.dimensions);
        for _ in 0..self.dimensions {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            embedding.push(((state % 2048) as f32 / 1024.0) - 1.0);
        }

        // L2 normalize
        let norm_sq: f32 = embedding.iter().map(|v| v * v).sum();
        if norm_sq > 0.0 {
            let inv = 1.0 / norm_sq.sqrt();
            for v in &mut embedding {
                *v *= inv;
            }
        }

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
