//! The retrieval-and-answer engine.
//!
//! Pipeline: question → retrieval (vector or lexical) → same-source
//! consolidation → context assembly → relevance gate → extractive or
//! generative composition. Every gate rejection returns the same contract:
//! the fixed sentinel, an empty source list, `grounded = false`. Exceptions
//! are reserved for infrastructure failures.

pub mod compose;
pub mod gate;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{AnswerMode, Config, IndexMode};
use crate::embedder::{Embedder, EmbedderError};
use crate::index::Index;
use crate::index::search::Retrieved;
use crate::llm::{ChatError, ChatModel, ChatTurn};

/// Fixed response for every query the gate refuses to answer.
pub const NOT_FOUND_SENTINEL: &str = "The answer is not in the internal documents.";

/// Infrastructure failures. A refused query is never an error.
#[derive(Error, Debug)]
pub enum RagError {
    #[error("index unavailable: {0}")]
    IndexUnavailable(#[from] rusqlite::Error),

    #[error("embedding backend unavailable: {0}")]
    EmbeddingUnavailable(#[from] EmbedderError),

    #[error("chat backend unavailable: {0}")]
    ChatUnavailable(#[from] ChatError),
}

/// Provenance of one section used to answer.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRef {
    pub source: String,
    pub title: Option<String>,
    pub position: usize,
}

/// The result of `answer_question`.
///
/// `grounded == false` implies `sources` is empty and `answer` is the
/// sentinel; `grounded == true` implies every source shares the top-ranked
/// candidate's document.
#[derive(Debug, Clone)]
pub struct AnswerRecord {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub grounded: bool,
}

impl AnswerRecord {
    fn not_found() -> Self {
        Self {
            answer: NOT_FOUND_SENTINEL.to_string(),
            sources: Vec::new(),
            grounded: false,
        }
    }
}

/// The engine: document store + index + backends, built once at startup and
/// passed by reference to every request path.
pub struct RagEngine {
    config: Config,
    store: crate::store::DocumentStore,
    index: Index,
    embedder: Box<dyn Embedder>,
    chat: Box<dyn ChatModel>,
}

impl RagEngine {
    /// Open (or heal, or build) the index and return a ready engine.
    ///
    /// After this returns, `answer_question` never fails for "no documents" —
    /// an empty corpus just answers with the sentinel.
    pub fn open(
        config: Config,
        embedder: Box<dyn Embedder>,
        chat: Box<dyn ChatModel>,
    ) -> Result<Self, RagError> {
        let store = crate::store::DocumentStore::new(config.chunk.size, config.chunk.overlap);
        let index = Index::open_or_heal(&config.index_path, embedder.dimensions())?;

        let mut engine = Self {
            config,
            store,
            index,
            embedder,
            chat,
        };

        if engine.index.section_count()? == 0 {
            engine.populate()?;
        } else {
            debug!(
                "Index already populated ({} sections), skipping build",
                engine.index.section_count()?
            );
        }

        Ok(engine)
    }

    /// Discard the index contents and rebuild from the document directory.
    /// Safe to call on an empty corpus; calling it twice in a row yields an
    /// index that answers identically.
    pub fn reindex(&mut self) -> Result<(), RagError> {
        info!("Rebuilding index from {}", self.config.docs_dir);
        self.index.clear()?;
        self.populate()
    }

    fn populate(&mut self) -> Result<(), RagError> {
        let sections = self.store.load(&self.config.docs_dir);
        if sections.is_empty() {
            info!("No documents found in {}", self.config.docs_dir);
            return Ok(());
        }

        let embeddings = match self.config.index.mode {
            IndexMode::Vector => {
                let texts: Vec<&str> = sections.iter().map(|s| s.content.as_str()).collect();
                Some(self.embedder.embed_batch(&texts)?)
            }
            IndexMode::Lexical => None,
        };

        self.index.populate(&sections, embeddings.as_deref())?;
        info!(
            "Indexed {} sections from {} documents",
            self.index.section_count()?,
            self.index.document_count()?
        );
        Ok(())
    }

    /// Answer a question from the internal documents.
    ///
    /// `history` is a rolling window of prior turns, used for coreference
    /// only. Never fails for the "not found" case; infrastructure failures
    /// (index or backend unreachable) are returned as errors.
    pub fn answer_question(
        &mut self,
        question: &str,
        history: &[ChatTurn],
    ) -> Result<AnswerRecord, RagError> {
        if self.index.section_count()? == 0 {
            debug!("gate: index is empty");
            return Ok(AnswerRecord::not_found());
        }

        // 1) Retrieval
        let top_k = self.config.retrieval.top_k;
        let candidates = match self.config.index.mode {
            IndexMode::Vector => {
                let query_vector = self.embedder.embed(question)?;
                self.index.search_vector(&query_vector, top_k)?
            }
            IndexMode::Lexical => {
                self.index
                    .search_lexical(question, top_k, &self.config.retrieval)?
            }
        };

        if candidates.is_empty() {
            debug!("gate: no retrieval candidates");
            return Ok(AnswerRecord::not_found());
        }

        // 2) Same-source consolidation: never blend documents.
        let main_source = candidates[0].source.clone();
        let candidates: Vec<Retrieved> = candidates
            .into_iter()
            .filter(|c| c.source == main_source)
            .collect();

        // 3) Context assembly within the character budget.
        let (context, used_indices) =
            compose::build_context(&candidates, self.config.retrieval.context_budget);
        let used: Vec<&Retrieved> = used_indices.iter().map(|&i| &candidates[i]).collect();

        if context.trim().is_empty() {
            debug!("gate rejected: {}", gate::Rejection::EmptyContext);
            return Ok(AnswerRecord::not_found());
        }

        if !gate::lexical_overlap(question, &context) {
            debug!("gate rejected: {}", gate::Rejection::NoLexicalOverlap);
            return Ok(AnswerRecord::not_found());
        }

        let sources: Vec<SourceRef> = used
            .iter()
            .map(|r| SourceRef {
                source: r.source.clone(),
                title: r.title.clone(),
                position: r.position,
            })
            .collect();

        // 4) Extractive mode returns the winning section directly.
        if self.config.answer.mode == AnswerMode::Extractive {
            let answer = compose::extractive(&used[0].content, self.config.answer.max_display_chars);
            return Ok(AnswerRecord {
                answer,
                sources: vec![sources[0].clone()],
                grounded: true,
            });
        }

        // 5) Order-sensitive enumerations bypass generation entirely.
        if let Some(answer) = compose::try_list_override(question, &used) {
            debug!("list override answered structurally");
            return Ok(AnswerRecord {
                answer,
                sources,
                grounded: true,
            });
        }

        // 6) Strong-keyword coverage, before spending a model call.
        let uncovered = gate::uncovered_strong_keywords(
            question,
            &context,
            self.config.retrieval.strong_keyword_len,
        );
        if !uncovered.is_empty() {
            debug!(
                "gate rejected: {}",
                gate::Rejection::UncoveredKeywords(uncovered)
            );
            return Ok(AnswerRecord::not_found());
        }

        // 7) Generative composition with post-validation.
        let turns = compose::build_prompt(
            question,
            &context,
            history,
            self.config.answer.history_window,
        );
        let answer = self.chat.complete(compose::SYSTEM_PROMPT, &turns)?;

        if gate::is_refusal(&answer) {
            debug!("gate rejected: {}", gate::Rejection::RefusalEcho);
            return Ok(AnswerRecord::not_found());
        }

        if !gate::numbers_consistent(&answer, &context) {
            warn!("gate rejected: {}", gate::Rejection::InconsistentNumbers);
            return Ok(AnswerRecord::not_found());
        }

        Ok(AnswerRecord {
            answer,
            sources,
            grounded: true,
        })
    }

    /// The generative backend, shared with the small-talk path.
    #[must_use]
    pub fn chat_model(&self) -> &dyn ChatModel {
        self.chat.as_ref()
    }

    /// Number of indexed sections (0 means the corpus is empty).
    pub fn section_count(&self) -> Result<usize, RagError> {
        Ok(self.index.section_count()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnswerMode, IndexMode};
    use crate::embedder::mock::MockEmbedder;
    use crate::llm::mock::MockChat;
    use std::fs;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir, index_mode: IndexMode, answer_mode: AnswerMode) -> Config {
        let mut config = Config::default();
        config.docs_dir = dir.path().join("docs").to_string_lossy().to_string();
        config.index_path = dir.path().join("index.db").to_string_lossy().to_string();
        config.index.mode = index_mode;
        config.answer.mode = answer_mode;
        config
    }

    fn engine_with(
        dir: &TempDir,
        index_mode: IndexMode,
        answer_mode: AnswerMode,
        chat: MockChat,
    ) -> RagEngine {
        let config = test_config(dir, index_mode, answer_mode);
        RagEngine::open(config, Box::new(MockEmbedder::new(16)), Box::new(chat)).unwrap()
    }

    #[test]
    fn test_empty_corpus_answers_sentinel() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        let mut engine = engine_with(
            &dir,
            IndexMode::Lexical,
            AnswerMode::Generative,
            MockChat::default(),
        );

        let record = engine.answer_question("anything?", &[]).unwrap();
        assert!(!record.grounded);
        assert_eq!(record.answer, NOT_FOUND_SENTINEL);
        assert!(record.sources.is_empty());
    }

    #[test]
    fn test_refusal_echo_normalized() {
        let dir = TempDir::new().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(
            docs.join("notes.md"),
            "# Transport protocols\n\nThe transport protocol moves segments between hosts.",
        )
        .unwrap();

        let chat = MockChat::new(["Hmm, I don't know about that."]);
        let mut engine = engine_with(&dir, IndexMode::Lexical, AnswerMode::Generative, chat);

        let record = engine
            .answer_question("Explain the transport protocol", &[])
            .unwrap();
        assert!(!record.grounded);
        assert_eq!(record.answer, NOT_FOUND_SENTINEL);
        assert!(record.sources.is_empty());
    }

    #[test]
    fn test_fabricated_number_rejected() {
        let dir = TempDir::new().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(
            docs.join("notes.md"),
            "# Transport protocols\n\nThe transport protocol moves segments between hosts.",
        )
        .unwrap();

        let chat = MockChat::new(["The transport protocol uses port 9999."]);
        let mut engine = engine_with(&dir, IndexMode::Lexical, AnswerMode::Generative, chat);

        let record = engine
            .answer_question("Explain the transport protocol", &[])
            .unwrap();
        assert!(!record.grounded);
        assert_eq!(record.answer, NOT_FOUND_SENTINEL);
    }

    #[test]
    fn test_grounded_answer_carries_sources() {
        let dir = TempDir::new().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(
            docs.join("notes.md"),
            "# Transport protocols\n\nThe transport protocol moves segments between hosts.",
        )
        .unwrap();

        let chat = MockChat::new(["The transport protocol moves segments."]);
        let mut engine = engine_with(&dir, IndexMode::Lexical, AnswerMode::Generative, chat);

        let record = engine
            .answer_question("Explain the transport protocol", &[])
            .unwrap();
        assert!(record.grounded);
        assert!(!record.sources.is_empty());
        assert!(record.sources[0].source.ends_with("notes.md"));
    }

    #[test]
    fn test_uncovered_entity_refused_before_generation() {
        let dir = TempDir::new().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(
            docs.join("notes.md"),
            "# Protocols\n\nThe HTTP default port is 80. A protocol defines message rules.",
        )
        .unwrap();

        let chat = std::sync::Arc::new(MockChat::new(["HTTPS uses port 443."]));
        let config = test_config(&dir, IndexMode::Lexical, AnswerMode::Generative);
        let mut engine = RagEngine::open(
            config,
            Box::new(MockEmbedder::new(16)),
            Box::new(std::sync::Arc::clone(&chat)),
        )
        .unwrap();

        let record = engine
            .answer_question("What port does the HTTPS protocol use?", &[])
            .unwrap();
        assert!(!record.grounded);
        assert_eq!(record.answer, NOT_FOUND_SENTINEL);
        // The model was never consulted: the gate refused on keyword coverage.
        assert_eq!(chat.call_count(), 0);
    }
}
