//! Web search through the DuckDuckGo HTML endpoint.
//!
//! Returns a JSON string — a list of `{title, href, body}` hits, or an
//! `{"error": ...}` object — so the chat layer owns the presentation.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) studymate/0.3";
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);
const SNIPPET_CLIP: usize = 300;

static QUERY_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(search( the web)?( for)?|look up|google|cherche( sur (le )?web)?|recherche)\s*:?\s*")
        .unwrap()
});

#[derive(Debug, Serialize, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub href: String,
    pub body: String,
}

/// Strip the "search for ..." preamble, keeping the actual query.
pub fn clean_query(text: &str) -> String {
    let cleaned = QUERY_PREFIX_RE.replace(text, "").trim().to_string();
    if cleaned.is_empty() {
        text.trim().to_string()
    } else {
        cleaned
    }
}

fn clip(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Parse DuckDuckGo's HTML results page into hits.
fn parse_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    // Static selectors; unwrap is fine, they are checked by tests.
    let result_sel = Selector::parse("div.result").unwrap();
    let title_sel = Selector::parse("a.result__a").unwrap();
    let snippet_sel = Selector::parse("a.result__snippet").unwrap();

    let mut hits = Vec::new();
    for result in document.select(&result_sel) {
        let Some(link) = result.select(&title_sel).next() else {
            continue;
        };
        let title = clip(link.text().collect::<String>().trim(), SNIPPET_CLIP);
        let href = link.value().attr("href").unwrap_or_default().to_string();
        let body = result
            .select(&snippet_sel)
            .next()
            .map(|s| clip(s.text().collect::<String>().trim(), SNIPPET_CLIP))
            .unwrap_or_default();

        if title.is_empty() {
            continue;
        }
        hits.push(SearchHit { title, href, body });
        if hits.len() >= max_results {
            break;
        }
    }
    hits
}

/// Text search via DuckDuckGo. Returns a JSON array of hits, or a JSON error
/// object on failure — never panics, never raises.
pub fn search(query: &str, max_results: usize) -> String {
    let q = clean_query(query);

    let run = || -> Result<Vec<SearchHit>, String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| e.to_string())?;

        let resp = client
            .post(SEARCH_URL)
            .form(&[("q", q.as_str())])
            .send()
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?;

        let html = resp.text().map_err(|e| e.to_string())?;
        Ok(parse_results(&html, max_results))
    };

    match run() {
        Ok(hits) => serde_json::to_string(&hits)
            .unwrap_or_else(|e| format!(r#"{{"error": "serialization failed: {e}"}}"#)),
        Err(e) => serde_json::json!({ "error": format!("search failed: {e}") }).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_query() {
        assert_eq!(clean_query("search: rust lifetimes"), "rust lifetimes");
        assert_eq!(clean_query("search the web for rust lifetimes"), "rust lifetimes");
        assert_eq!(clean_query("look up borrow checker"), "borrow checker");
        assert_eq!(clean_query("plain query"), "plain query");
    }

    #[test]
    fn test_clean_query_only_prefix() {
        // Nothing left after the prefix: keep the original text.
        assert_eq!(clean_query("search"), "search");
    }

    #[test]
    fn test_parse_results() {
        let html = r#"
            <html><body>
              <div class="result">
                <a class="result__a" href="https://example.com/a">First title</a>
                <a class="result__snippet">First snippet text</a>
              </div>
              <div class="result">
                <a class="result__a" href="https://example.com/b">Second title</a>
              </div>
            </body></html>
        "#;
        let hits = parse_results(html, 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "First title");
        assert_eq!(hits[0].href, "https://example.com/a");
        assert_eq!(hits[0].body, "First snippet text");
        assert_eq!(hits[1].body, "");
    }

    #[test]
    fn test_parse_results_limit() {
        let item = r#"<div class="result"><a class="result__a" href="x">T</a></div>"#;
        let html = format!("<html><body>{}</body></html>", item.repeat(10));
        let hits = parse_results(&html, 3);
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_parse_results_empty_page() {
        assert!(parse_results("<html><body></body></html>", 5).is_empty());
    }
}
