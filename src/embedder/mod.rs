/// Embedder trait and shared types for text embedding.
///
/// The embedding backend is an external collaborator: text in, fixed-dimension
/// vector out, deterministic for identical input.
pub mod mock;
pub mod ollama;

use thiserror::Error;

/// Errors that can occur during embedding operations.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("embedding backend unreachable: {0}")]
    Unreachable(String),

    #[error("embedding backend returned a malformed response: {0}")]
    BadResponse(String),
}

/// Trait for text embedding implementations.
///
/// All implementations must be `Send + Sync` to allow shared use behind a
/// trait object.
pub trait Embedder: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    /// Embed multiple text strings into vectors.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Return the dimensionality of the embedding vectors.
    fn dimensions(&self) -> usize;
}
