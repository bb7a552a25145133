//! Persistent TODO list with natural-language commands.
//!
//! The store is a JSON file; saving returns a `Result` so the caller can
//! distinguish "saved" from "failed, proceeding in memory" instead of
//! silently dropping the error.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

static ADD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:add|ajoute|ajouter)\s*:?\s*(.*)").unwrap());
static DONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:done|finish(?:ed)?|complete|termine|fini)\s*:?\s*(\d+)").unwrap()
});
static LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(tasks|todos?|liste?)\b").unwrap());
static CLEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(clear all|clear the list|reset|empty the list|delete everything)\b")
        .unwrap()
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TodoItem {
    pub id: u64,
    pub text: String,
    pub done: bool,
}

/// Canonical command parsed out of free text.
#[derive(Debug, Clone, PartialEq)]
pub enum TodoCommand {
    Add(String),
    Done(u64),
    List,
    Clear,
    Unknown,
}

/// Map natural language onto a canonical command.
///
/// "add: review chapter 3" → `Add`, "done 2" → `Done(2)`, "show my tasks" →
/// `List`, "clear the list" → `Clear`.
pub fn parse_command(text: &str) -> TodoCommand {
    let t = text.trim();

    if CLEAR_RE.is_match(t) {
        return TodoCommand::Clear;
    }

    if let Some(caps) = ADD_RE.captures(t) {
        let payload = caps[1].trim().to_string();
        if payload.is_empty() {
            return TodoCommand::List;
        }
        return TodoCommand::Add(payload);
    }

    if let Some(caps) = DONE_RE.captures(t) {
        if let Ok(id) = caps[1].parse() {
            return TodoCommand::Done(id);
        }
    }

    if LIST_RE.is_match(t) {
        return TodoCommand::List;
    }

    TodoCommand::Unknown
}

pub struct TodoStore {
    path: PathBuf,
    items: Vec<TodoItem>,
}

impl TodoStore {
    /// Load the list from disk; a missing or corrupt file starts empty.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let items = match std::fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(items) => items,
                Err(e) => {
                    warn!("Corrupt todo store {}: {e}, starting empty", path.display());
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self { path, items }
    }

    /// Persist the list. The caller decides what a failure means.
    pub fn save(&self) -> Result<()> {
        let data = serde_json::to_string_pretty(&self.items).context("serialize todo list")?;
        std::fs::write(&self.path, data)
            .with_context(|| format!("write todo store {}", self.path.display()))
    }

    #[must_use]
    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }

    /// Execute a natural-language command and return a display-ready reply.
    /// Persistence failures degrade to in-memory operation with a warning.
    pub fn handle(&mut self, text: &str) -> String {
        match parse_command(text) {
            TodoCommand::Add(task) => {
                let id = self.items.iter().map(|i| i.id).max().unwrap_or(0) + 1;
                let item = TodoItem {
                    id,
                    text: task,
                    done: false,
                };
                self.items.push(item.clone());
                self.save_or_warn();
                format!("Added task {}: {}", item.id, item.text)
            }
            TodoCommand::Done(id) => match self.items.iter_mut().find(|i| i.id == id) {
                Some(item) => {
                    item.done = true;
                    let text = item.text.clone();
                    self.save_or_warn();
                    format!("Completed task {id}: {text}")
                }
                None => format!("No task with id {id}."),
            },
            TodoCommand::List => {
                if self.items.is_empty() {
                    "No tasks yet. Try \"add: review chapter 3\".".to_string()
                } else {
                    let lines: Vec<String> = self
                        .items
                        .iter()
                        .map(|i| {
                            format!("{} [{}] {}", i.id, if i.done { "x" } else { " " }, i.text)
                        })
                        .collect();
                    lines.join("\n")
                }
            }
            TodoCommand::Clear => {
                self.items.clear();
                self.save_or_warn();
                "Task list cleared.".to_string()
            }
            TodoCommand::Unknown => {
                "Unknown todo command (use \"add\", \"done\", \"list\" or \"clear\").".to_string()
            }
        }
    }

    fn save_or_warn(&self) {
        if let Err(e) = self.save() {
            warn!("Todo list not persisted: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_command() {
        assert_eq!(
            parse_command("add: review chapter 3"),
            TodoCommand::Add("review chapter 3".to_string())
        );
        assert_eq!(parse_command("done 2"), TodoCommand::Done(2));
        assert_eq!(parse_command("finished: 7"), TodoCommand::Done(7));
        assert_eq!(parse_command("show my tasks"), TodoCommand::List);
        assert_eq!(parse_command("clear the list"), TodoCommand::Clear);
        assert_eq!(parse_command("gibberish"), TodoCommand::Unknown);
    }

    #[test]
    fn test_parse_add_without_payload_lists() {
        assert_eq!(parse_command("add:"), TodoCommand::List);
    }

    #[test]
    fn test_add_done_list_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("todo.json");
        let mut store = TodoStore::load(&path);

        let reply = store.handle("add: review chapter 3");
        assert!(reply.contains("review chapter 3"));
        store.handle("add: solve exercise sheet");
        assert_eq!(store.items().len(), 2);

        let reply = store.handle("done 1");
        assert!(reply.contains("Completed task 1"));
        assert!(store.items()[0].done);

        let listing = store.handle("list");
        assert!(listing.contains("review chapter 3"));
        assert!(listing.contains("[x]"));
        assert!(listing.contains("[ ]"));
    }

    #[test]
    fn test_persistence_across_loads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("todo.json");

        {
            let mut store = TodoStore::load(&path);
            store.handle("add: persisted task");
        }

        let store = TodoStore::load(&path);
        assert_eq!(store.items().len(), 1);
        assert_eq!(store.items()[0].text, "persisted task");
    }

    #[test]
    fn test_corrupt_store_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("todo.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = TodoStore::load(&path);
        assert!(store.items().is_empty());
    }

    #[test]
    fn test_done_unknown_id() {
        let dir = tempdir().unwrap();
        let mut store = TodoStore::load(dir.path().join("todo.json"));
        assert_eq!(store.handle("done 99"), "No task with id 99.");
    }

    #[test]
    fn test_clear() {
        let dir = tempdir().unwrap();
        let mut store = TodoStore::load(dir.path().join("todo.json"));
        store.handle("add: one");
        store.handle("add: two");
        store.handle("clear the list");
        assert!(store.items().is_empty());
    }
}
