//! Document store: loads course documents and splits them into sections.
//!
//! Format support is a registry mapping file extension → loader function,
//! resolved at construction time, so adding a format is a registration rather
//! than another branch. A file that fails to load or yields no text
//! contributes zero sections; it never aborts the whole load.

pub mod loaders;
pub mod split;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, warn};

/// The atomic retrievable unit: a section of a source document.
///
/// `content` is never empty; empty splits are dropped during ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub content: String,
    /// Originating document path, normalized with forward slashes.
    pub source: String,
    /// Heading the section was split under, if any.
    pub title: Option<String>,
    /// Position within the source document, for ordering.
    pub position: usize,
}

/// Loader function: path in, extracted plain text out.
pub type LoaderFn = fn(&Path) -> Result<String>;

pub struct DocumentStore {
    loaders: HashMap<&'static str, LoaderFn>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DocumentStore {
    /// Create a store with the default loader registry
    /// (`md`/`txt` plain text, `pdf`, `docx`).
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let mut loaders: HashMap<&'static str, LoaderFn> = HashMap::new();
        loaders.insert("md", loaders::load_plain_text);
        loaders.insert("txt", loaders::load_plain_text);
        loaders.insert("pdf", loaders::load_pdf);
        loaders.insert("docx", loaders::load_docx);
        Self {
            loaders,
            chunk_size,
            chunk_overlap,
        }
    }

    /// Register an additional extension → loader mapping.
    pub fn register(&mut self, extension: &'static str, loader: LoaderFn) {
        self.loaders.insert(extension, loader);
    }

    /// Load every supported document under `dir` and split it into sections.
    ///
    /// A missing directory yields an empty list. Unreadable or empty files are
    /// skipped with a warning.
    pub fn load<P: AsRef<Path>>(&self, dir: P) -> Vec<Section> {
        let dir = dir.as_ref();
        let mut sections = Vec::new();

        for path in walk_files(dir) {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_lowercase)
                .unwrap_or_default();

            let Some(loader) = self.loaders.get(ext.as_str()) else {
                continue;
            };

            let text = match loader(&path) {
                Ok(t) => t,
                Err(e) => {
                    warn!("Skipping {}: {e}", path.display());
                    continue;
                }
            };

            if text.trim().is_empty() {
                debug!("No extractable text in {}", path.display());
                continue;
            }

            let source = path.to_string_lossy().replace('\\', "/");
            let parts = split::split_document(&text, self.chunk_size, self.chunk_overlap);
            for (position, (title, content)) in parts.into_iter().enumerate() {
                sections.push(Section {
                    content,
                    source: source.clone(),
                    title,
                    position,
                });
            }
        }

        sections
    }
}

/// Recursive directory walk collecting regular files, sorted for stable
/// section ordering across rebuilds.
fn walk_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if !dir.is_dir() {
        return files;
    }
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("Cannot read {}: {e}", dir.display());
            return files;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(walk_files(&path));
        } else {
            files.push(path);
        }
    }
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_markdown_sections() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("notes.md"),
            "# Intro\n\nFirst part.\n\n# Details\n\nSecond part.",
        )
        .unwrap();

        let store = DocumentStore::new(900, 150);
        let sections = store.load(dir.path());

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title.as_deref(), Some("Intro"));
        assert_eq!(sections[1].title.as_deref(), Some("Details"));
        assert_eq!(sections[0].position, 0);
        assert_eq!(sections[1].position, 1);
        assert!(sections[0].source.ends_with("notes.md"));
    }

    #[test]
    fn test_load_missing_dir() {
        let store = DocumentStore::new(900, 150);
        let sections = store.load("/does/not/exist");
        assert!(sections.is_empty());
    }

    #[test]
    fn test_load_skips_unsupported_and_empty() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();
        fs::write(dir.path().join("empty.txt"), "   \n\n ").unwrap();
        fs::write(dir.path().join("ok.txt"), "Some real content here.").unwrap();

        let store = DocumentStore::new(900, 150);
        let sections = store.load(dir.path());

        assert_eq!(sections.len(), 1);
        assert!(sections[0].source.ends_with("ok.txt"));
    }

    #[test]
    fn test_load_recurses_subdirectories() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/deep.md"), "# Deep\n\nNested content.").unwrap();

        let store = DocumentStore::new(900, 150);
        let sections = store.load(dir.path());
        assert_eq!(sections.len(), 1);
        assert!(sections[0].source.contains("sub/"));
    }

    #[test]
    fn test_no_empty_section_content() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("gaps.md"), "# A\n\ntext\n\n# B\n\n# C\n\nmore").unwrap();

        let store = DocumentStore::new(900, 150);
        let sections = store.load(dir.path());
        for s in &sections {
            assert!(!s.content.trim().is_empty(), "empty section leaked: {s:?}");
        }
    }

    #[test]
    fn test_register_custom_loader() {
        fn upper_loader(path: &Path) -> Result<String> {
            Ok(fs::read_to_string(path)?.to_uppercase())
        }

        let dir = tempdir().unwrap();
        fs::write(dir.path().join("custom.note"), "hello").unwrap();

        let mut store = DocumentStore::new(900, 150);
        store.register("note", upper_loader);
        let sections = store.load(dir.path());
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].content, "HELLO");
    }
}
