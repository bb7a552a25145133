//! Format-specific text extraction.
//!
//! Each loader turns one file into plain text; everything downstream works on
//! text only. Failures are reported to the caller, which skips the file.

use std::path::Path;

use anyhow::{Context, Result};
use docx_rs::{DocumentChild, ParagraphChild, RunChild};

/// `.md` / `.txt`: read as UTF-8.
pub fn load_plain_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// `.pdf`: extract text from every page via lopdf.
pub fn load_pdf(path: &Path) -> Result<String> {
    let doc = lopdf::Document::load(path)
        .with_context(|| format!("failed to parse PDF {}", path.display()))?;
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return Ok(String::new());
    }
    let text = doc
        .extract_text(&pages)
        .with_context(|| format!("failed to extract text from {}", path.display()))?;
    Ok(text)
}

/// `.docx`: concatenate the text runs of every paragraph.
pub fn load_docx(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let docx = docx_rs::read_docx(&bytes)
        .map_err(|e| anyhow::anyhow!("failed to parse DOCX {}: {e:?}", path.display()))?;

    let mut out = String::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(para) = child {
            let mut line = String::new();
            for pc in &para.children {
                if let ParagraphChild::Run(run) = pc {
                    for rc in &run.children {
                        if let RunChild::Text(t) = rc {
                            line.push_str(&t.text);
                        }
                    }
                }
            }
            if !line.trim().is_empty() {
                out.push_str(line.trim_end());
            }
            out.push('\n');
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_plain_text() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, "# Heading\n\nBody text.").unwrap();
        let text = load_plain_text(tmp.path()).unwrap();
        assert!(text.contains("Heading"));
        assert!(text.contains("Body text."));
    }

    #[test]
    fn test_load_plain_text_missing() {
        assert!(load_plain_text(Path::new("/no/such/file.txt")).is_err());
    }

    #[test]
    fn test_load_pdf_rejects_garbage() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"this is not a pdf").unwrap();
        assert!(load_pdf(tmp.path()).is_err());
    }

    #[test]
    fn test_load_docx_rejects_garbage() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"this is not a docx").unwrap();
        assert!(load_docx(tmp.path()).is_err());
    }
}
