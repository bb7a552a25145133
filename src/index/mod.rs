//! Persistent retrieval index using SQLite and sqlite-vec.
//!
//! One index entry per section; the artifact is a single database file that
//! can be deleted and rebuilt at any time from the document store. A corrupt
//! artifact is discarded and recreated on open rather than surfaced to the
//! caller.

pub mod search;

use std::path::{Path, PathBuf};
use std::sync::Once;

use rusqlite::{Connection, Result, params};
use sqlite_vec::sqlite3_vec_init;
use tracing::{info, warn};

use crate::store::Section;

fn schema_sql(dimensions: usize) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL UNIQUE,
    indexed_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_source ON documents(source);

CREATE TABLE IF NOT EXISTS sections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    title TEXT,
    content TEXT NOT NULL,
    FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_document_id ON sections(document_id);

CREATE VIRTUAL TABLE IF NOT EXISTS vec_sections USING vec0(
    embedding FLOAT[{dimensions}]
);
"#
    )
}

static INIT_VEC: Once = Once::new();

/// Initialize the sqlite-vec extension. Safe to call multiple times.
fn init_sqlite_vec() {
    INIT_VEC.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// A wrapper around a SQLite connection initialized with sqlite-vec and the
/// application schema.
pub struct Index {
    pub(crate) conn: Connection,
    path: Option<PathBuf>,
}

impl Index {
    /// Open the index at the given path and initialize the schema.
    ///
    /// Executing the schema doubles as a corruption probe: a file that is not
    /// a database fails here, not on first query.
    pub fn open<P: AsRef<Path>>(path: P, dimensions: usize) -> Result<Self> {
        let path = path.as_ref();
        init_sqlite_vec();

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(&schema_sql(dimensions))?;

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open the index, discarding and recreating the artifact once if the
    /// persisted state is corrupt.
    pub fn open_or_heal<P: AsRef<Path>>(path: P, dimensions: usize) -> Result<Self> {
        let path = path.as_ref();
        match Self::open(path, dimensions) {
            Ok(index) => Ok(index),
            Err(e) => {
                warn!(
                    "Persisted index at {} is unreadable ({e}), rebuilding from scratch",
                    path.display()
                );
                discard_artifact(path);
                Self::open(path, dimensions)
            }
        }
    }

    /// Open an in-memory index (useful for testing).
    pub fn open_in_memory(dimensions: usize) -> Result<Self> {
        init_sqlite_vec();
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(&schema_sql(dimensions))?;
        Ok(Self { conn, path: None })
    }

    /// Purge every entry. The artifact stays in place but answers queries
    /// with empty results until repopulated.
    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM vec_sections", [])?;
        self.conn.execute("DELETE FROM sections", [])?;
        self.conn.execute("DELETE FROM documents", [])?;
        Ok(())
    }

    /// Insert a batch of sections (and their embeddings, when the index runs
    /// in vector mode) in one transaction.
    ///
    /// `embeddings`, when given, must be parallel to `sections`.
    pub fn populate(
        &mut self,
        sections: &[Section],
        embeddings: Option<&[Vec<f32>]>,
    ) -> Result<()> {
        if let Some(vecs) = embeddings {
            assert_eq!(
                sections.len(),
                vecs.len(),
                "sections and embeddings length mismatch"
            );
        }

        let tx = self.conn.transaction()?;

        for (i, section) in sections.iter().enumerate() {
            tx.execute(
                "INSERT OR IGNORE INTO documents (source) VALUES (?)",
                params![section.source],
            )?;
            let doc_id: i64 = tx.query_row(
                "SELECT id FROM documents WHERE source = ?",
                params![section.source],
                |row| row.get(0),
            )?;

            tx.execute(
                "INSERT INTO sections (document_id, position, title, content) VALUES (?, ?, ?, ?)",
                params![doc_id, section.position as i64, section.title, section.content],
            )?;

            if let Some(vecs) = embeddings {
                let section_id = tx.last_insert_rowid();
                tx.execute(
                    "INSERT INTO vec_sections (rowid, embedding) VALUES (?, ?)",
                    params![section_id, serialize_vector(&vecs[i])],
                )?;
            }
        }

        tx.commit()?;
        info!("Indexed {} sections", sections.len());
        Ok(())
    }

    /// Number of indexed sections.
    pub fn section_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sections", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Number of indexed source documents.
    pub fn document_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Path of the persisted artifact, if this index is file-backed.
    #[must_use]
    pub fn artifact_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Remove a broken artifact (plus SQLite sidecar files) from disk.
fn discard_artifact(path: &Path) {
    for suffix in ["", "-wal", "-shm"] {
        let mut p = path.as_os_str().to_owned();
        p.push(suffix);
        let p = PathBuf::from(p);
        if p.exists() {
            if let Err(e) = std::fs::remove_file(&p) {
                warn!("Failed to remove {}: {e}", p.display());
            }
        }
    }
}

/// Serialize a float32 vector into bytes for the vec0 virtual table.
pub fn serialize_vector(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}
