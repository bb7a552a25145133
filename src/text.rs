//! Text normalization helpers shared by the retriever and the relevance gate.
//!
//! Everything here is a pure function over `&str`: diacritic folding, keyword
//! extraction, integer-token extraction, and a normalized edit-distance
//! similarity ratio. Course notes mix English and French, so folding accents
//! before comparing keywords matters ("présentation" vs "presentation").

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static INT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d+\b").unwrap());

/// Fold common Latin diacritics to their ASCII base letter.
///
/// Covers the accented characters that actually occur in the supported corpus
/// languages; anything else passes through unchanged.
pub fn fold_diacritics(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => out.push('a'),
            'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => out.push('A'),
            'è' | 'é' | 'ê' | 'ë' => out.push('e'),
            'È' | 'É' | 'Ê' | 'Ë' => out.push('E'),
            'ì' | 'í' | 'î' | 'ï' => out.push('i'),
            'Ì' | 'Í' | 'Î' | 'Ï' => out.push('I'),
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' => out.push('o'),
            'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => out.push('O'),
            'ù' | 'ú' | 'û' | 'ü' => out.push('u'),
            'Ù' | 'Ú' | 'Û' | 'Ü' => out.push('U'),
            'ç' => out.push('c'),
            'Ç' => out.push('C'),
            'ñ' => out.push('n'),
            'Ñ' => out.push('N'),
            'ý' | 'ÿ' => out.push('y'),
            'œ' => out.push_str("oe"),
            'Œ' => out.push_str("OE"),
            'æ' => out.push_str("ae"),
            'Æ' => out.push_str("AE"),
            _ => out.push(c),
        }
    }
    out
}

/// Lowercase, fold diacritics, and collapse runs of non-alphanumeric
/// characters into single spaces.
pub fn normalize(text: &str) -> String {
    let folded = fold_diacritics(text).to_lowercase();
    let mut out = String::with_capacity(folded.len());
    let mut last_was_space = true;
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Extract the normalized keyword set: alphanumeric tokens of at least
/// `min_len` characters.
pub fn keywords(text: &str, min_len: usize) -> HashSet<String> {
    normalize(text)
        .split_whitespace()
        .filter(|w| w.chars().count() >= min_len)
        .map(str::to_string)
        .collect()
}

/// All integer tokens appearing in the text, as strings ("80", "443", "7").
pub fn integers(text: &str) -> HashSet<String> {
    INT_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Collapse all whitespace (including newlines) into single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized string similarity in `[0, 1]` based on edit distance.
///
/// `1.0` means identical, `0.0` means nothing in common. Operates on `char`s
/// so accented input does not skew the length denominator.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein(a, b) as f64 / max_len as f64)
}

/// Plain dynamic-programming Levenshtein distance over chars.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    // Single-row formulation: prev[j] holds the previous row.
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0usize; b_chars.len() + 1];

    for (i, &ca) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_diacritics() {
        assert_eq!(fold_diacritics("présentation"), "presentation");
        assert_eq!(fold_diacritics("Réseau çà et là"), "Reseau ca et la");
        assert_eq!(fold_diacritics("plain ascii"), "plain ascii");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize("Quelle est la météo, à Paris ?"),
            "quelle est la meteo a paris"
        );
        assert_eq!(normalize("HTTP/1.1 -- port 80!"), "http 1 1 port 80");
    }

    #[test]
    fn test_keywords_min_len() {
        let kw = keywords("What is the capital of France?", 3);
        assert!(kw.contains("capital"));
        assert!(kw.contains("france"));
        assert!(kw.contains("what"));
        // "is" and "of" are below the length floor
        assert!(!kw.contains("is"));
        assert!(!kw.contains("of"));
    }

    #[test]
    fn test_integers() {
        let nums = integers("Port 80 and port 443, but not x86_64.");
        assert!(nums.contains("80"));
        assert!(nums.contains("443"));
        assert_eq!(nums.len(), 2);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a\nb\t\tc   d"), "a b c d");
        assert_eq!(collapse_whitespace("  "), "");
    }

    #[test]
    fn test_similarity_ratio() {
        assert_eq!(similarity_ratio("osi model", "osi model"), 1.0);
        assert!(similarity_ratio("osi model", "osi modele") > 0.8);
        assert!(similarity_ratio("weather", "calculator") < 0.5);
        assert_eq!(similarity_ratio("", ""), 1.0);
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", "abc"), 0);
    }
}
