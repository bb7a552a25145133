//! Document splitting: markdown-heading sections first, sliding window as the
//! fallback, so section boundaries survive where the author provided them and
//! chunk size stays bounded where they did not.

/// Split a document into `(title, content)` parts.
///
/// Lines starting with a markdown heading marker (`#` .. `######`) open a new
/// section whose title is the heading text. Documents without headings, and
/// section bodies larger than `chunk_size`, are window-split with `overlap`
/// characters carried between windows. Empty bodies are dropped.
pub fn split_document(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<(Option<String>, String)> {
    let sections = split_by_headings(text);

    // No headings found: bound chunk size with the sliding window.
    if sections.len() == 1 && sections[0].0.is_none() {
        return window_split(&sections[0].1, chunk_size, overlap)
            .into_iter()
            .map(|part| (None, part))
            .collect();
    }

    let mut out = Vec::new();
    for (title, body) in sections {
        if body.trim().is_empty() {
            continue;
        }
        if body.chars().count() <= chunk_size {
            out.push((title, body.trim().to_string()));
        } else {
            // Oversized section: window-split the body, every part keeps the title.
            for part in window_split(&body, chunk_size, overlap) {
                out.push((title.clone(), part));
            }
        }
    }
    out
}

/// Split on heading lines, keeping the preamble before the first heading as an
/// untitled section.
fn split_by_headings(text: &str) -> Vec<(Option<String>, String)> {
    let mut sections: Vec<(Option<String>, String)> = Vec::new();
    let mut current_title: Option<String> = None;
    let mut current_body = String::new();

    for line in text.lines() {
        if let Some(title) = heading_text(line) {
            if !current_body.trim().is_empty() {
                sections.push((current_title.take(), current_body.trim().to_string()));
            }
            current_title = Some(title);
            current_body = String::new();
        } else {
            current_body.push_str(line);
            current_body.push('\n');
        }
    }

    if !current_body.trim().is_empty() {
        sections.push((current_title, current_body.trim().to_string()));
    }

    if sections.is_empty() {
        // Whole document fallback (possibly empty; the caller drops it).
        sections.push((None, text.trim().to_string()));
    }

    sections
}

/// Return the heading text if the line is a markdown heading (`#` to `######`
/// followed by a space).
fn heading_text(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &trimmed[hashes..];
    if !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }
    let title = rest.trim();
    if title.is_empty() {
        return None;
    }
    Some(title.to_string())
}

/// Fixed-size sliding-window split with overlap.
///
/// Windows prefer to end at a sentence boundary found in the back half of the
/// window; the next window starts `overlap` characters before the cut.
pub fn window_split(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if chars.len() <= chunk_size {
        return vec![trimmed.to_string()];
    }

    let mut parts = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());

        let cut = if end == chars.len() {
            end
        } else {
            find_sentence_cut(&chars, start, end)
        };

        let part: String = chars[start..cut].iter().collect();
        let part = part.trim();
        if !part.is_empty() {
            parts.push(part.to_string());
        }

        if cut == chars.len() {
            break;
        }
        // Overlap with the previous window, but always make progress.
        start = cut.saturating_sub(overlap).max(start + 1);
    }

    parts
}

/// Search backwards from `end` to the middle of the window for a sentence
/// boundary; fall back to the hard cut.
fn find_sentence_cut(chars: &[char], start: usize, end: usize) -> usize {
    let min_cut = start + (end - start) / 2;
    for i in (min_cut..end).rev() {
        match chars[i] {
            '.' | '!' | '?' | '\n' => return i + 1,
            _ => {}
        }
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_text() {
        assert_eq!(heading_text("# Title"), Some("Title".to_string()));
        assert_eq!(heading_text("### Sub heading "), Some("Sub heading".to_string()));
        assert_eq!(heading_text("#NoSpace"), None);
        assert_eq!(heading_text("plain text"), None);
        assert_eq!(heading_text("####### too deep"), None);
        assert_eq!(heading_text("# "), None);
    }

    #[test]
    fn test_split_with_headings() {
        let doc = "intro line\n\n# One\n\nbody one\n\n## Two\n\nbody two";
        let parts = split_document(doc, 900, 150);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], (None, "intro line".to_string()));
        assert_eq!(parts[1].0.as_deref(), Some("One"));
        assert_eq!(parts[2].0.as_deref(), Some("Two"));
    }

    #[test]
    fn test_split_without_headings_small() {
        let parts = split_document("just a short paragraph", 900, 150);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].0, None);
    }

    #[test]
    fn test_split_without_headings_windows() {
        let sentence = "This is a filler sentence for the window splitter. ";
        let doc = sentence.repeat(40); // ~2000 chars
        let parts = split_document(&doc, 500, 100);
        assert!(parts.len() >= 3);
        for (title, body) in &parts {
            assert!(title.is_none());
            assert!(!body.is_empty());
            assert!(body.chars().count() <= 500);
        }
    }

    #[test]
    fn test_windows_overlap() {
        let sentence = "Filler content for overlap checks, sentence ends here. ";
        let doc = sentence.repeat(30);
        let parts = window_split(&doc, 400, 120);
        assert!(parts.len() >= 2);
        // Consecutive windows share text because of the overlap carry-back.
        let tail: String = parts[0].chars().rev().take(40).collect::<String>();
        let tail: String = tail.chars().rev().collect();
        assert!(
            parts[1].contains(tail.trim()),
            "expected overlap between windows"
        );
    }

    #[test]
    fn test_oversized_section_keeps_title() {
        let big_body = "A sentence that pads the section body out. ".repeat(30);
        let doc = format!("# Big\n\n{big_body}");
        let parts = split_document(&doc, 400, 80);
        assert!(parts.len() >= 2);
        for (title, _) in &parts {
            assert_eq!(title.as_deref(), Some("Big"));
        }
    }

    #[test]
    fn test_empty_sections_dropped() {
        let doc = "# A\n\ncontent\n\n# B\n\n\n\n# C\n\nmore";
        let parts = split_document(doc, 900, 150);
        let titles: Vec<_> = parts.iter().map(|(t, _)| t.as_deref()).collect();
        assert_eq!(titles, vec![Some("A"), Some("C")]);
    }

    #[test]
    fn test_window_split_empty() {
        assert!(window_split("   ", 500, 100).is_empty());
    }
}
