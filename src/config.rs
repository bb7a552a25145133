/// Configuration module for studymate.
///
/// Handles loading, validating, and providing default configuration values.
/// The retrieval thresholds (strong-keyword length, score weight, context
/// budget) were tuned on a specific corpus, so they are configuration rather
/// than constants.
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ── Default value functions ──────────────────────────────────────────

fn default_docs_dir() -> String {
    "./course_notes".to_string()
}

fn default_index_path() -> String {
    "./index.db".to_string()
}

fn default_history_path() -> String {
    "./memory_store.json".to_string()
}

fn default_todo_path() -> String {
    "./todo_store.json".to_string()
}

fn default_max_history_turns() -> usize {
    30
}

fn default_chunk_size() -> usize {
    900
}

fn default_chunk_overlap() -> usize {
    150
}

fn default_top_k() -> usize {
    4
}

fn default_context_budget() -> usize {
    2200
}

fn default_keyword_weight() -> f64 {
    0.3
}

fn default_min_title_similarity() -> f64 {
    0.5
}

fn default_min_keyword_overlap() -> usize {
    2
}

fn default_strong_keyword_len() -> usize {
    5
}

fn default_dimensions() -> usize {
    768
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_chat_model() -> String {
    "llama3.2:1b".to_string()
}

fn default_embed_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    2
}

fn default_max_display_chars() -> usize {
    600
}

fn default_history_window() -> usize {
    6
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Directory scanned for course documents (.md, .txt, .pdf, .docx).
    #[serde(default = "default_docs_dir")]
    pub docs_dir: String,

    /// Path of the persisted index artifact. Deleting it and running
    /// `reindex` rebuilds it from scratch.
    #[serde(default = "default_index_path")]
    pub index_path: String,

    #[serde(default = "default_history_path")]
    pub history_path: String,

    #[serde(default = "default_todo_path")]
    pub todo_path: String,

    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,

    #[serde(default)]
    pub chunk: ChunkConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub answer: AnswerConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChunkConfig {
    #[serde(default = "default_chunk_size")]
    pub size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

/// Thresholds of the retriever and the relevance gate.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Character budget for the consolidated context string.
    #[serde(default = "default_context_budget")]
    pub context_budget: usize,

    /// Weight of keyword overlap in the lexical composite score.
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f64,

    /// Below this title similarity a lexical candidate needs keyword
    /// overlap to be accepted.
    #[serde(default = "default_min_title_similarity")]
    pub min_title_similarity: f64,

    #[serde(default = "default_min_keyword_overlap")]
    pub min_keyword_overlap: usize,

    /// Question tokens at least this long (and not generic interrogative
    /// words) must all appear in the context.
    #[serde(default = "default_strong_keyword_len")]
    pub strong_keyword_len: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    /// Embedding-backed nearest-neighbor search (requires an embedding model).
    Vector,
    /// Title/keyword matching over parsed sections; no embedding backend.
    Lexical,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_mode")]
    pub mode: IndexMode,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

fn default_index_mode() -> IndexMode {
    IndexMode::Vector
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OllamaConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    #[serde(default = "default_embed_model")]
    pub embed_model: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMode {
    /// Forward a constrained prompt to the chat model.
    Generative,
    /// Return the winning section verbatim, truncated at a sentence boundary.
    Extractive,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AnswerConfig {
    #[serde(default = "default_answer_mode")]
    pub mode: AnswerMode,

    /// Display cap for extractive answers.
    #[serde(default = "default_max_display_chars")]
    pub max_display_chars: usize,

    /// How many prior turns accompany the question (coreference only).
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_answer_mode() -> AnswerMode {
    AnswerMode::Generative
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            docs_dir: default_docs_dir(),
            index_path: default_index_path(),
            history_path: default_history_path(),
            todo_path: default_todo_path(),
            max_history_turns: default_max_history_turns(),
            chunk: ChunkConfig::default(),
            retrieval: RetrievalConfig::default(),
            index: IndexConfig::default(),
            ollama: OllamaConfig::default(),
            answer: AnswerConfig::default(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            size: default_chunk_size(),
            overlap: default_chunk_overlap(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            context_budget: default_context_budget(),
            keyword_weight: default_keyword_weight(),
            min_title_similarity: default_min_title_similarity(),
            min_keyword_overlap: default_min_keyword_overlap(),
            strong_keyword_len: default_strong_keyword_len(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            mode: default_index_mode(),
            dimensions: default_dimensions(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            chat_model: default_chat_model(),
            embed_model: default_embed_model(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            mode: default_answer_mode(),
            max_display_chars: default_max_display_chars(),
            history_window: default_history_window(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to `"config.json"`.
    /// If the file does not exist, returns a default config and generates a
    /// template for the default path.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            "config.json"
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            if path == "config.json" {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.chunk.size > 0, "chunk.size must be positive");
        anyhow::ensure!(
            self.chunk.overlap < self.chunk.size,
            "chunk.overlap must be smaller than chunk.size"
        );
        anyhow::ensure!(self.retrieval.top_k > 0, "retrieval.top_k must be positive");
        anyhow::ensure!(
            self.retrieval.context_budget > 0,
            "retrieval.context_budget must be positive"
        );
        anyhow::ensure!(
            self.index.dimensions > 0,
            "index.dimensions must be positive"
        );
        anyhow::ensure!(!self.docs_dir.is_empty(), "docs_dir must be set");
        anyhow::ensure!(!self.index_path.is_empty(), "index_path must be set");
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.chunk.size, 900);
        assert_eq!(config.chunk.overlap, 150);
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.retrieval.context_budget, 2200);
        assert_eq!(config.index.mode, IndexMode::Vector);
        assert_eq!(config.answer.mode, AnswerMode::Generative);
        assert_eq!(config.ollama.chat_model, "llama3.2:1b");
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{"chunk": {"size": 500}, "index": {"mode": "lexical"}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.chunk.size, 500);
        assert_eq!(config.index.mode, IndexMode::Lexical);
        // Other fields keep their defaults
        assert_eq!(config.chunk.overlap, 150);
        assert_eq!(config.retrieval.top_k, 4);
    }

    #[test]
    fn test_validate_ok() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_overlap() {
        let mut config = Config::default();
        config.chunk.overlap = config.chunk.size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_top_k() {
        let mut config = Config::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.chunk.size, config.chunk.size);
        assert_eq!(parsed.index.mode, config.index.mode);
        assert_eq!(parsed.ollama.base_url, config.ollama.base_url);
    }

    #[test]
    fn test_answer_mode_parsing() {
        let json = r#"{"answer": {"mode": "extractive"}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.answer.mode, AnswerMode::Extractive);
    }
}
