/// Ollama-backed embedder.
///
/// Calls `POST /api/embeddings` on a local Ollama server with a bounded
/// timeout. Transient failures (connection errors, 429, 5xx) are retried with
/// exponential backoff; anything else fails immediately.
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Embedder, EmbedderError};
use crate::config::OllamaConfig;

pub struct OllamaEmbedder {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    dimensions: usize,
    max_retries: u32,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    pub fn new(config: &OllamaConfig, dimensions: usize) -> Result<Self, EmbedderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbedderError::Unreachable(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.embed_model.clone(),
            dimensions,
            max_retries: config.max_retries,
        })
    }
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let body = EmbedRequest {
            model: &self.model,
            prompt: text,
        };

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                debug!("Retrying embedding request after {delay:?}");
                std::thread::sleep(delay);
            }

            match self.client.post(&url).json(&body).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: EmbedResponse = resp.json().map_err(|e| {
                            EmbedderError::BadResponse(format!("invalid JSON: {e}"))
                        })?;
                        if parsed.embedding.len() != self.dimensions {
                            return Err(EmbedderError::BadResponse(format!(
                                "expected {} dimensions, got {}",
                                self.dimensions,
                                parsed.embedding.len()
                            )));
                        }
                        return Ok(parsed.embedding);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(EmbedderError::Unreachable(format!(
                            "embedding API returned {status}"
                        )));
                        continue;
                    }

                    let detail = resp.text().unwrap_or_default();
                    return Err(EmbedderError::BadResponse(format!(
                        "embedding API returned {status}: {detail}"
                    )));
                }
                Err(e) => {
                    last_err = Some(EmbedderError::Unreachable(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| EmbedderError::Unreachable("embedding failed after retries".into())))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_backend_is_an_error() {
        let config = OllamaConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 1,
            max_retries: 0,
            ..OllamaConfig::default()
        };
        let embedder = OllamaEmbedder::new(&config, 768).unwrap();
        let err = embedder.embed("hello").unwrap_err();
        assert!(matches!(err, EmbedderError::Unreachable(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = OllamaConfig {
            base_url: "http://localhost:11434/".to_string(),
            ..OllamaConfig::default()
        };
        let embedder = OllamaEmbedder::new(&config, 768).unwrap();
        assert_eq!(embedder.base_url, "http://localhost:11434");
    }
}
