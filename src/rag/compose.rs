//! Answer composition: context assembly, the extractive and generative
//! composers, and the enumerated-list override.

use std::sync::LazyLock;

use regex::Regex;

use crate::index::search::Retrieved;
use crate::llm::{ChatTurn, Role};
use crate::text;

/// System instruction for the generative composer. Strict by design: the
/// model must answer from the supplied context or use the refusal phrase.
pub const SYSTEM_PROMPT: &str = "You are a precise and concise academic tutor.\n\
    You must answer ONLY with content provided in the context.\n\
    If the context does not clearly answer the question, reply exactly: I don't know.\n\
    No generalities, no invention, and do not copy long passages word for word.\n\
    Answer in one to three sentences.";

/// Assemble the consolidated context string from ranked candidates.
///
/// Contents are whitespace-collapsed and appended in rank order until the
/// character budget would be exceeded; a candidate never enters partially.
/// Returns the context and the indices of the candidates actually used.
pub fn build_context(candidates: &[Retrieved], budget: usize) -> (String, Vec<usize>) {
    let mut context = String::new();
    let mut used = Vec::new();
    let mut char_count = 0usize;

    for (i, candidate) in candidates.iter().enumerate() {
        let part = text::collapse_whitespace(&candidate.content);
        if part.is_empty() {
            continue;
        }
        let part_chars = part.chars().count();
        if char_count + part_chars > budget {
            break;
        }
        context.push_str(&part);
        context.push_str("\n\n");
        char_count += part_chars;
        used.push(i);
    }

    (context, used)
}

/// Extractive composer: the winning section verbatim, truncated at the last
/// sentence-ending punctuation before the display limit.
pub fn extractive(content: &str, max_chars: usize) -> String {
    let text = content.trim();
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text.to_string();
    }

    let mut cut = max_chars;
    for i in (0..max_chars).rev() {
        if matches!(chars[i], '.' | '!' | '?') {
            cut = i + 1;
            break;
        }
    }

    let truncated: String = chars[..cut].iter().collect();
    format!("{} […]", truncated.trim_end())
}

/// Build the generative prompt: a short rolling window of prior turns for
/// coreference, then the context and question. Prior turns are never a source
/// of facts — the system instruction binds the model to the context.
pub fn build_prompt(
    question: &str,
    context: &str,
    history: &[ChatTurn],
    history_window: usize,
) -> Vec<ChatTurn> {
    let mut turns = Vec::new();

    let start = history.len().saturating_sub(history_window);
    for turn in &history[start..] {
        if matches!(turn.role, Role::User | Role::Assistant) {
            turns.push(turn.clone());
        }
    }

    turns.push(ChatTurn::user(format!(
        "Context:\n{context}\n\nQuestion: {question}\n\n\
         Answer in one to three sentences, using ONLY this context. \
         If the context does not answer the question, reply exactly: I don't know."
    )));

    turns
}

// ── Enumerated-list override ─────────────────────────────────────────

/// A canonical, order-sensitive enumeration that free-form generation is
/// known to scramble. When a question asks for one, the items are extracted
/// structurally from the context and rendered in canonical order instead of
/// being paraphrased by the model.
struct ListOverride {
    /// Rendered name, e.g. "OSI model".
    subject: &'static str,
    /// Any of these must appear in the question keywords.
    subject_keywords: &'static [&'static str],
    /// And any of these (the "list shape" words) must appear too.
    shape_keywords: &'static [&'static str],
    /// Sections mentioning one of these labels hold the right enumeration;
    /// a co-retrieved competing enumeration (TCP/IP next to OSI) does not.
    labels: &'static [&'static str],
    /// Item names in canonical order.
    canonical: &'static [&'static str],
}

static LIST_OVERRIDES: &[ListOverride] = &[ListOverride {
    subject: "OSI model",
    subject_keywords: &["osi"],
    shape_keywords: &["layer", "layers", "couche", "couches"],
    labels: &["osi", "open systems interconnection"],
    canonical: &[
        "Physical",
        "Data Link",
        "Network",
        "Transport",
        "Session",
        "Presentation",
        "Application",
    ],
}];

static BOLD_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+[.)]\s*\*\*([^*\n]+?)\*\*").unwrap());
static LINE_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+[.)]\s+(.+?)\s*$").unwrap());
static BULLET_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*[-*•]\s+(.+?)\s*$").unwrap());

/// Try the enumerated-list override for this question.
///
/// Returns the rendered numbered list if a matching override triggers and
/// structural extraction finds at least one canonical item; `None` means the
/// caller falls through to the generative path.
pub fn try_list_override(question: &str, used: &[&Retrieved]) -> Option<String> {
    let q_kw = text::keywords(question, 2);

    let override_ = LIST_OVERRIDES.iter().find(|o| {
        o.subject_keywords.iter().any(|k| q_kw.contains(*k))
            && o.shape_keywords.iter().any(|k| q_kw.contains(*k))
    })?;

    // Prefer the sections that explicitly carry the subject's label, so a
    // co-retrieved competing enumeration is never harvested.
    let labeled: Vec<&&Retrieved> = used
        .iter()
        .filter(|r| {
            let haystack = match &r.title {
                Some(t) => text::normalize(&format!("{t} {}", r.content)),
                None => text::normalize(&r.content),
            };
            override_.labels.iter().any(|l| haystack.contains(l))
        })
        .collect();

    let source_text: String = if labeled.is_empty() {
        used.iter().map(|r| r.content.as_str()).collect::<Vec<_>>().join("\n")
    } else {
        labeled
            .iter()
            .map(|r| r.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    };

    let items = extract_items(&source_text);
    if items.is_empty() {
        return None;
    }

    // Map extracted items onto the canonical table; membership both filters
    // foreign items and deduplicates, ordering falls out of the table.
    let mut found = vec![false; override_.canonical.len()];
    for item in &items {
        let item_norm = text::normalize(item);
        for (i, canon) in override_.canonical.iter().enumerate() {
            let canon_norm = text::normalize(canon);
            if item_norm == canon_norm || item_norm == format!("{canon_norm} layer") {
                found[i] = true;
            }
        }
    }

    let ordered: Vec<&str> = override_
        .canonical
        .iter()
        .zip(&found)
        .filter(|&(_, &hit)| hit)
        .map(|(name, _)| *name)
        .collect();

    if ordered.is_empty() {
        return None;
    }

    let mut out = format!(
        "The {} layers of the {} are:",
        ordered.len(),
        override_.subject
    );
    for (i, name) in ordered.iter().enumerate() {
        out.push_str(&format!("\n{}. {}", i + 1, name));
    }
    Some(out)
}

/// Pull list items out of text via structural markers: bold numbered items
/// first, then plain numbered lines, then bullet lines.
fn extract_items(text: &str) -> Vec<String> {
    for re in [&*BOLD_ITEM_RE, &*LINE_ITEM_RE, &*BULLET_ITEM_RE] {
        let items: Vec<String> = re
            .captures_iter(text)
            .map(|c| c[1].trim_matches(['*', ' ']).to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if !items.is_empty() {
            return items;
        }
    }
    Vec::new()
}
