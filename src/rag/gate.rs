//! Relevance gate: the deterministic checks that decide whether retrieved
//! material is trustworthy enough to answer from, and whether a generated
//! answer is consistent with it. Every check here is pure string work — no
//! model judgment is involved in refusing.

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::text;

/// Why the gate refused. Recorded in the per-request decision trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    EmptyContext,
    NoLexicalOverlap,
    UncoveredKeywords(Vec<String>),
    InconsistentNumbers,
    RefusalEcho,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::EmptyContext => write!(f, "empty context"),
            Rejection::NoLexicalOverlap => write!(f, "no lexical overlap"),
            Rejection::UncoveredKeywords(words) => {
                write!(f, "strong keywords not covered: {}", words.join(", "))
            }
            Rejection::InconsistentNumbers => write!(f, "answer numbers absent from context"),
            Rejection::RefusalEcho => write!(f, "model refused"),
        }
    }
}

/// Interrogative and generic words that carry no topical information; they
/// never count as strong keywords.
static GENERIC_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "about",
        "could",
        "course",
        "define",
        "definition",
        "describe",
        "example",
        "examples",
        "explain",
        "explanation",
        "gives",
        "introduce",
        "introduction",
        "lecture",
        "please",
        "should",
        "summary",
        "their",
        "there",
        "these",
        "thing",
        "things",
        "usage",
        "using",
        "what",
        "where",
        "which",
        "would",
    ]
    .into_iter()
    .collect()
});

/// Check 2: the question and context must share at least one keyword.
///
/// The primary pass compares exact normalized tokens (length ≥ 3). A
/// secondary fuzzy pass tolerates misspellings and morphological variants:
/// two tokens of length ≥ 4 overlap if they share a four-character prefix or
/// one contains the other.
pub fn lexical_overlap(question: &str, context: &str) -> bool {
    let q_kw = text::keywords(question, 3);
    let c_kw = text::keywords(context, 3);

    if q_kw.intersection(&c_kw).next().is_some() {
        return true;
    }

    // Normalized tokens are ASCII, so byte slicing is safe here.
    for q in q_kw.iter().filter(|w| w.len() >= 4) {
        for c in c_kw.iter().filter(|w| w.len() >= 4) {
            if q[..4] == c[..4] || q.contains(c.as_str()) || c.contains(q.as_str()) {
                return true;
            }
        }
    }

    false
}

/// Check 3: strong question keywords that the context does not mention.
///
/// Strong keywords are tokens of at least `min_len` characters that are not
/// generic interrogative words. An uncovered strong keyword means the context
/// is probably about something else entirely (a person, a protocol, a port
/// the corpus never mentions), so the caller must refuse rather than let the
/// model improvise. Returns the uncovered words for the decision trail.
pub fn uncovered_strong_keywords(question: &str, context: &str, min_len: usize) -> Vec<String> {
    let q_kw = text::keywords(question, 3);
    let c_kw = text::keywords(context, 3);

    let mut uncovered: Vec<String> = q_kw
        .into_iter()
        .filter(|w| w.chars().count() >= min_len)
        .filter(|w| !GENERIC_WORDS.contains(w.as_str()))
        .filter(|w| !c_kw.contains(w))
        .collect();
    uncovered.sort();
    uncovered
}

/// Check 4: every integer in the answer must also appear in the context.
///
/// Catches fabricated ports, dates, and ages even when the prose looks
/// plausible. An answer without integers passes.
pub fn numbers_consistent(answer: &str, context: &str) -> bool {
    let answer_nums = text::integers(answer);
    if answer_nums.is_empty() {
        return true;
    }
    let context_nums = text::integers(context);
    answer_nums.is_subset(&context_nums)
}

/// Check 5: did the model refuse in its own words?
///
/// A free-form refusal must be normalized to the canonical sentinel with an
/// empty source list, never forwarded with sources attached.
pub fn is_refusal(answer: &str) -> bool {
    let norm = text::normalize(answer);
    norm.contains("i don t know")
        || norm.contains("i do not know")
        || norm.contains("the answer is not in the internal documents")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexical_overlap_direct() {
        assert!(lexical_overlap(
            "What is the capital of France?",
            "Paris is the capital of France."
        ));
    }

    #[test]
    fn test_lexical_overlap_none() {
        assert!(!lexical_overlap(
            "quantum entanglement",
            "Paris is a city in Europe."
        ));
    }

    #[test]
    fn test_lexical_overlap_fuzzy_prefix() {
        // "networking" vs "networks": no exact token match, shared 4-prefix
        assert!(lexical_overlap(
            "basics of networking",
            "Computer networks connect machines."
        ));
    }

    #[test]
    fn test_lexical_overlap_fuzzy_substring() {
        assert!(lexical_overlap("the ethernet", "Fast ethernets everywhere"));
    }

    #[test]
    fn test_uncovered_strong_keywords() {
        let uncovered = uncovered_strong_keywords(
            "What is the HTTPS protocol?",
            "The HTTP default port is 80. A protocol defines message rules.",
            5,
        );
        assert_eq!(uncovered, vec!["https".to_string()]);
    }

    #[test]
    fn test_covered_strong_keywords() {
        let uncovered = uncovered_strong_keywords(
            "Explain the transport protocol",
            "The transport protocol moves segments between hosts.",
            5,
        );
        assert!(uncovered.is_empty());
    }

    #[test]
    fn test_generic_words_are_not_strong() {
        let uncovered = uncovered_strong_keywords(
            "explain definition example course",
            "unrelated text about cooking",
            5,
        );
        assert!(uncovered.is_empty());
    }

    #[test]
    fn test_numbers_consistent_subset() {
        assert!(numbers_consistent(
            "The port is 80.",
            "The HTTP default port is 80."
        ));
    }

    #[test]
    fn test_numbers_consistent_fabricated() {
        assert!(!numbers_consistent(
            "HTTPS uses port 443.",
            "The HTTP default port is 80."
        ));
    }

    #[test]
    fn test_numbers_consistent_no_numbers() {
        assert!(numbers_consistent(
            "Paris is the capital.",
            "The HTTP default port is 80."
        ));
    }

    #[test]
    fn test_is_refusal() {
        assert!(is_refusal("I don't know."));
        assert!(is_refusal("Sorry, I DO NOT know the answer."));
        assert!(is_refusal("The answer is not in the internal documents."));
        assert!(!is_refusal("Paris is the capital of France."));
    }
}
