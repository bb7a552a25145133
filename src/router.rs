//! Intent routing: decide whether a message goes to a tool, small talk, or
//! the document answer engine.
//!
//! The math detector is deliberately strict — a digit plus an operator or a
//! math function — so "the 7 layers of the OSI model" never lands in the
//! calculator.

use std::sync::LazyLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Smalltalk,
    Calc,
    Weather,
    Todo,
    Web,
    Rag,
}

static WEATHER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(weather|meteo|météo|temperature|température|forecast)\b").unwrap()
});

static WEB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(search|look up|google|cherche|recherche)\b").unwrap());

static TODO_ADD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(add|ajoute|ajouter)\b").unwrap());
static TODO_DONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(done|finish|finished|complete|termine|fini)\b").unwrap());
static TODO_LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(tasks|todos?|liste?)\b").unwrap());
static TODO_CLEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(clear all|clear the list|reset|empty the list|delete everything)\b")
        .unwrap()
});

static MATH_HINT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9+\-*/^()]").unwrap());
static MATH_OP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[+\-*/^]").unwrap());
static MATH_FUNC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(sin|cos|tan|sqrt|log10|log|ln|exp|pi|π)\b").unwrap());

static GREETINGS: &[&str] = &[
    "hello", "hi", "hey", "good morning", "good evening", "bonjour", "salut",
];

/// Strict math detection: at least one digit, plus an operator or a known
/// math function, plus a math-shaped character somewhere.
fn looks_like_math(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }

    let squeezed: String = text.chars().filter(|c| !c.is_whitespace()).collect();

    if !squeezed.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    if !MATH_OP_RE.is_match(&squeezed) && !MATH_FUNC_RE.is_match(&squeezed) {
        return false;
    }
    MATH_HINT_RE.is_match(text)
}

/// Route a message to an intent. The payload is the raw text; each tool does
/// its own extraction.
///
/// Priority: weather, calculator, todo, explicit web search, small talk,
/// and the document engine by default.
pub fn route(text: &str) -> (Intent, String) {
    let t = text.trim().to_lowercase();

    if WEATHER_RE.is_match(&t) {
        return (Intent::Weather, text.to_string());
    }

    if looks_like_math(text) {
        return (Intent::Calc, text.to_string());
    }

    if TODO_ADD_RE.is_match(&t)
        || TODO_DONE_RE.is_match(&t)
        || TODO_LIST_RE.is_match(&t)
        || TODO_CLEAR_RE.is_match(&t)
    {
        return (Intent::Todo, text.to_string());
    }

    if WEB_RE.is_match(&t) {
        return (Intent::Web, text.to_string());
    }

    if GREETINGS.contains(&t.trim_end_matches(['!', '.', ' '])) {
        return (Intent::Smalltalk, text.to_string());
    }

    (Intent::Rag, text.to_string())
}
