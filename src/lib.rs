//! # studymate — terminal academic assistant
//!
//! Routes free-text questions to a calculator, a weather lookup, a web
//! search, a TODO list, small talk, or a retrieval-augmented answer engine
//! over a private directory of course notes. The answer engine refuses — via
//! deterministic checks, not model judgment — whenever the documents do not
//! actually contain the answer.
//!
//! ## Architecture
//!
//! - **[`config`]** — JSON configuration with defaults, validation, and all retrieval thresholds
//! - **[`text`]** — normalization primitives (diacritic folding, keywords, similarity)
//! - **[`store`]** — document loading (loader registry) and heading/window splitting
//! - **[`index`]** — SQLite + sqlite-vec persistent index; vector and lexical retrieval
//! - **[`embedder`]** — embedding backend boundary (Ollama + deterministic mock)
//! - **[`llm`]** — generative backend boundary (Ollama chat + scripted mock)
//! - **[`rag`]** — retrieval, same-source consolidation, relevance gate, answer composition
//! - **[`router`]** — regex intent detection for the non-RAG handlers
//! - **[`agents`]** — calculator, weather, web search, TODO tools
//! - **[`chat`]** — the assistant: REPL, history persistence, web-search consent flow

pub mod agents;
pub mod chat;
pub mod config;
pub mod embedder;
pub mod index;
pub mod llm;
pub mod rag;
pub mod router;
pub mod store;
pub mod text;
