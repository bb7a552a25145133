//! The assistant: routes each message to a tool, small talk, or the document
//! engine, keeps the persisted conversation history, and runs the web-search
//! consent flow when the documents cannot answer.

use std::io::{BufRead, Write};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::warn;

use crate::agents::{calculator, todo::TodoStore, weather, websearch};
use crate::config::Config;
use crate::embedder::ollama::OllamaEmbedder;
use crate::llm::ChatTurn;
use crate::llm::ollama::OllamaChat;
use crate::rag::RagEngine;
use crate::router::{self, Intent};

static YES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^\s*(yes|y|oui|o)\b").unwrap());
static NO_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^\s*(no|n|non)\b").unwrap());

const SMALLTALK_SYSTEM: &str = "You are a friendly and brief assistant.";

const CONSENT_QUESTION: &str = "I found nothing in the **internal documents**.\n\n\
    👉 Do you want me to search **the web**? Answer **yes** or **no**.";

pub struct Assistant {
    config: Config,
    engine: RagEngine,
    todo: TodoStore,
    history: Vec<ChatTurn>,
    /// The original query we are awaiting web-search consent for.
    pending_web: Option<String>,
}

impl Assistant {
    /// Build the whole context once: backends, engine, stores, history.
    /// Everything downstream borrows from here — no global state.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let embedder = OllamaEmbedder::new(&config.ollama, config.index.dimensions)
            .context("failed to initialize embedding backend")?;
        let chat =
            OllamaChat::new(&config.ollama).context("failed to initialize chat backend")?;

        let engine = RagEngine::open(config.clone(), Box::new(embedder), Box::new(chat))
            .context("failed to open the document index")?;

        Ok(Self::with_engine(config, engine))
    }

    /// Assemble an assistant around an existing engine (tests inject mock
    /// backends through this).
    pub fn with_engine(config: Config, engine: RagEngine) -> Self {
        let todo = TodoStore::load(&config.todo_path);
        let history = load_history(&config.history_path);
        Self {
            config,
            engine,
            todo,
            history,
            pending_web: None,
        }
    }

    /// Rebuild the index from the document directory.
    pub fn reindex(&mut self) -> Result<()> {
        self.engine.reindex()?;
        Ok(())
    }

    /// Handle one message in a conversation (stateful: history, consent).
    pub fn handle(&mut self, input: &str) -> String {
        // An earlier turn asked for web-search consent?
        if let Some(query) = self.pending_web.take() {
            return self.handle_consent(input, query);
        }

        let (intent, payload) = router::route(input);

        let reply = match intent {
            Intent::Smalltalk => self.smalltalk(input),
            Intent::Calc => calculator::calculate(&payload),
            Intent::Weather => weather::current_weather(&payload),
            Intent::Todo => format!("🛠️ TODO\n\n{}", self.todo.handle(&payload)),
            Intent::Web => {
                let raw = websearch::search(&payload, 5);
                format!("🛠️ Web search\n\n{}", render_web_results(&raw))
            }
            Intent::Rag => return self.handle_rag(input),
        };

        self.remember(input, &reply);
        reply
    }

    /// One-shot answer without consent flow or persisted history: used by the
    /// `ask` subcommand.
    pub fn answer_once(&mut self, input: &str) -> String {
        let (intent, payload) = router::route(input);
        match intent {
            Intent::Smalltalk => self.smalltalk(input),
            Intent::Calc => calculator::calculate(&payload),
            Intent::Weather => weather::current_weather(&payload),
            Intent::Todo => format!("🛠️ TODO\n\n{}", self.todo.handle(&payload)),
            Intent::Web => {
                let raw = websearch::search(&payload, 5);
                format!("🛠️ Web search\n\n{}", render_web_results(&raw))
            }
            Intent::Rag => match self.engine.answer_question(input, &[]) {
                Ok(record) => {
                    if record.grounded {
                        with_source_footer(&record.answer, record.sources.first())
                    } else {
                        record.answer
                    }
                }
                Err(e) => format!("⚠️ Internal documents unavailable: {e}"),
            },
        }
    }

    /// Interactive REPL on stdin/stdout. `exit` or `quit` leaves.
    pub fn run_repl(&mut self) -> Result<()> {
        println!("🎓 studymate — ask about your course notes, or try the calculator,");
        println!("   weather, web search and todo list. Type 'exit' to leave.");

        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();

        loop {
            print!("> ");
            stdout.flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if matches!(line.to_lowercase().as_str(), "exit" | "quit") {
                break;
            }

            let reply = self.handle(line);
            println!("{reply}\n");
        }

        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────

    fn handle_consent(&mut self, input: &str, query: String) -> String {
        if YES_RE.is_match(input) {
            let raw = websearch::search(&query, 5);
            let reply = format!(
                "🛠️ Web search (with your consent)\n\n{}",
                render_web_results(&raw)
            );
            self.remember(input, &reply);
            return reply;
        }

        if NO_RE.is_match(input) {
            let reply =
                "👍 Okay, staying with your internal documents. How else can I help?".to_string();
            self.remember(input, &reply);
            return reply;
        }

        // Neither yes nor no: ask again.
        self.pending_web = Some(query);
        let reply = "I didn't catch that. Should I search **the web**? \
                     Answer **yes** or **no**."
            .to_string();
        self.remember(input, &reply);
        reply
    }

    fn handle_rag(&mut self, input: &str) -> String {
        match self.engine.answer_question(input, &self.history) {
            Ok(record) if record.grounded => {
                let reply = with_source_footer(&record.answer, record.sources.first());
                self.remember(input, &reply);
                reply
            }
            Ok(_) => {
                // Not grounded: propose a web search instead of guessing.
                self.pending_web = Some(input.to_string());
                let reply = CONSENT_QUESTION.to_string();
                self.remember(input, &reply);
                reply
            }
            Err(e) => {
                warn!("Answer engine unavailable: {e}");
                self.pending_web = Some(input.to_string());
                let reply = format!("⚠️ Internal documents unavailable: {e}\n\n{CONSENT_QUESTION}");
                self.remember(input, &reply);
                reply
            }
        }
    }

    fn smalltalk(&self, input: &str) -> String {
        match self
            .engine
            .chat_model()
            .complete(SMALLTALK_SYSTEM, &[ChatTurn::user(input)])
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Smalltalk backend unavailable: {e}");
                "Hello! (The local model is unreachable right now, but I can still \
                 calculate, check the weather, search the web and manage your tasks.)"
                    .to_string()
            }
        }
    }

    fn remember(&mut self, user: &str, assistant: &str) {
        self.history.push(ChatTurn::user(user));
        self.history.push(ChatTurn::assistant(assistant));

        let max = self.config.max_history_turns;
        if self.history.len() > max {
            self.history.drain(0..self.history.len() - max);
        }

        if let Err(e) = save_history(&self.config.history_path, &self.history) {
            warn!("History not persisted: {e}");
        }
    }

    #[must_use]
    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    #[must_use]
    pub fn awaiting_web_consent(&self) -> bool {
        self.pending_web.is_some()
    }
}

fn with_source_footer(answer: &str, source: Option<&crate::rag::SourceRef>) -> String {
    match source {
        Some(s) => format!("{answer}\n\n---\n📎 Source: `{}`", s.source),
        None => answer.to_string(),
    }
}

fn load_history(path: &str) -> Vec<ChatTurn> {
    match std::fs::read_to_string(path) {
        Ok(data) => match serde_json::from_str(&data) {
            Ok(turns) => turns,
            Err(e) => {
                warn!("Corrupt history file {path}: {e}, starting fresh");
                Vec::new()
            }
        },
        Err(_) => Vec::new(),
    }
}

fn save_history(path: &str, history: &[ChatTurn]) -> Result<()> {
    let data = serde_json::to_string_pretty(history).context("serialize history")?;
    std::fs::write(path, data).with_context(|| format!("write history file {path}"))
}

/// Format DuckDuckGo results for display. Invalid JSON falls back to the raw
/// payload in a code block.
fn render_web_results(json_payload: &str) -> String {
    let parsed: serde_json::Value = match serde_json::from_str(json_payload) {
        Ok(v) => v,
        Err(_) => return format!("Results (raw):\n\n```json\n{json_payload}\n```"),
    };

    if let Some(err) = parsed.get("error").and_then(|e| e.as_str()) {
        return format!("Search error: {err}");
    }

    let Some(items) = parsed.as_array() else {
        return format!("Results (raw):\n\n```json\n{json_payload}\n```");
    };

    if items.is_empty() {
        return "No web results.".to_string();
    }

    let mut lines = vec!["**Web results:**".to_string()];
    for (i, item) in items.iter().take(8).enumerate() {
        let title = item
            .get("title")
            .and_then(|t| t.as_str())
            .unwrap_or("(untitled)");
        let href = item.get("href").and_then(|h| h.as_str()).unwrap_or("");
        let body = item.get("body").and_then(|b| b.as_str()).unwrap_or("");
        if href.is_empty() {
            lines.push(format!("- {}. {title}  \n  {body}", i + 1));
        } else {
            lines.push(format!("- {}. [{title}]({href})  \n  {body}", i + 1));
        }
    }
    lines.join("\n")
}
