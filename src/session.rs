use std::path::{Path, PathBuf};

use regex::Regex;

use crate::cleaning::{self, CleaningOptions};
use crate::document::Document;
use crate::gateway;
use crate::merge::{MergeQueue, basename};

/// Everything a session operation can tell its caller. Each operation
/// returns the events it produced, in order; the UI layer renders them in
/// whatever idiom fits. No operation returns a `Result`: gateway failures
/// are absorbed here and re-emitted as `Error` events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The current document was swapped for a fresh buffer (load, merge).
    /// Consumers should treat the buffer as unmodified.
    DocumentReplaced(String),
    /// The current document's content changed in memory; the on-disk file
    /// does not match it yet.
    ContentTransformed(String),
    EncodingChanged(String),
    Saved(PathBuf),
    Error(String),
    Status(String),
    MergeQueueChanged(Vec<String>),
}

/// The stateful core: owns the one current document and the merge queue,
/// and mediates every operation on them. Two states only: no document, or
/// exactly one. Failed operations leave both untouched.
#[derive(Debug, Default)]
pub struct Session {
    current: Option<Document>,
    merge_queue: MergeQueue,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self) -> Option<&Document> {
        self.current.as_ref()
    }

    pub fn merge_queue(&self) -> &MergeQueue {
        &self.merge_queue
    }

    /// Open a file through the gateway and make it the current document.
    /// On failure the previous document (if any) stays current.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Vec<SessionEvent> {
        let path = path.as_ref();
        match gateway::open(path) {
            Ok(doc) => {
                let events = vec![
                    SessionEvent::DocumentReplaced(doc.content.clone()),
                    SessionEvent::EncodingChanged(doc.encoding.clone()),
                    SessionEvent::Status(format!("Loaded {}", doc.display_name())),
                ];
                self.current = Some(doc);
                events
            }
            Err(err) => vec![SessionEvent::Error(format!(
                "Cannot open file {}: {err}",
                path.display()
            ))],
        }
    }

    /// Persist `content` to `path`, reusing the current document's encoding
    /// (UTF-8 when nothing is loaded). The saved document becomes current.
    pub fn save_file(&mut self, path: impl AsRef<Path>, content: &str) -> Vec<SessionEvent> {
        let path = path.as_ref();
        let encoding = self
            .current
            .as_ref()
            .map(|doc| doc.encoding.clone())
            .unwrap_or_else(|| "utf-8".to_string());
        let doc = Document {
            path: path.to_path_buf(),
            content: content.to_string(),
            encoding,
            modified: false,
        };
        match gateway::save(&doc) {
            Ok(()) => {
                let events = vec![
                    SessionEvent::Saved(doc.path.clone()),
                    SessionEvent::Status(format!("Saved {}", doc.display_name())),
                ];
                self.current = Some(doc);
                events
            }
            Err(err) => vec![SessionEvent::Error(format!(
                "Cannot save file {}: {err}",
                path.display()
            ))],
        }
    }

    /// Run the cleaning pipeline over the live text when supplied (so edits
    /// made since the last load are not discarded), else over the current
    /// content. The result replaces the current document's content.
    pub fn apply_cleaning(
        &mut self,
        options: &CleaningOptions,
        live_text: Option<&str>,
    ) -> Vec<SessionEvent> {
        let Some(current) = self.current.as_ref() else {
            return vec![SessionEvent::Status("No document loaded".to_string())];
        };
        let source = live_text.unwrap_or(&current.content);
        let cleaned = cleaning::apply_options(source, options);
        let updated = Document {
            content: cleaned.clone(),
            modified: true,
            ..current.clone()
        };
        self.current = Some(updated);
        vec![SessionEvent::ContentTransformed(cleaned)]
    }

    /// Replace every literal, non-overlapping occurrence of `find`.
    /// Silent no-op when nothing is loaded or the find term is empty.
    pub fn replace_all(
        &mut self,
        find: &str,
        replace: &str,
        live_text: Option<&str>,
    ) -> Vec<SessionEvent> {
        let Some(current) = self.current.as_ref() else {
            return Vec::new();
        };
        if find.is_empty() {
            return Vec::new();
        }
        let source = live_text.unwrap_or(&current.content);
        let pattern = match Regex::new(&regex::escape(find)) {
            Ok(pattern) => pattern,
            Err(err) => return vec![SessionEvent::Error(format!("Cannot replace: {err}"))],
        };
        let mut count = 0usize;
        let replaced = pattern
            .replace_all(source, |_: &regex::Captures<'_>| {
                count += 1;
                replace.to_string()
            })
            .into_owned();
        let updated = Document {
            content: replaced.clone(),
            modified: true,
            ..current.clone()
        };
        self.current = Some(updated);
        vec![
            SessionEvent::ContentTransformed(replaced),
            SessionEvent::Status(format!(
                "Replaced {count} {}",
                plural(count, "occurrence", "occurrences")
            )),
        ]
    }

    /// Rewrite the current document on disk as UTF-8, using `live_text` as
    /// the content. Documents already effectively UTF-8 (with or without a
    /// BOM) are reported and left alone, so BOM files are not re-saved.
    pub fn convert_to_utf8(&mut self, live_text: &str) -> Vec<SessionEvent> {
        let Some(current) = self.current.as_ref() else {
            return vec![SessionEvent::Status("No document loaded".to_string())];
        };
        if current.is_effectively_utf8() {
            return vec![SessionEvent::Status(format!(
                "{} is already UTF-8; nothing to convert",
                current.display_name()
            ))];
        }
        let converted = Document {
            path: current.path.clone(),
            content: live_text.to_string(),
            encoding: "utf-8".to_string(),
            modified: false,
        };
        match gateway::save(&converted) {
            Ok(()) => {
                let events = vec![
                    SessionEvent::EncodingChanged(converted.encoding.clone()),
                    SessionEvent::Saved(converted.path.clone()),
                    SessionEvent::Status(format!(
                        "Converted {} to UTF-8",
                        converted.display_name()
                    )),
                ];
                self.current = Some(converted);
                events
            }
            Err(err) => vec![SessionEvent::Error(format!(
                "Cannot convert file {}: {err}",
                current.path.display()
            ))],
        }
    }

    /// Queue the current document's file for merging. Needs a document
    /// that actually came from a file; duplicates are silently ignored.
    pub fn add_current_to_merge(&mut self) -> Vec<SessionEvent> {
        let Some(current) = self.current.as_ref() else {
            return vec![SessionEvent::Error("No file loaded".to_string())];
        };
        if !current.has_path() {
            return vec![SessionEvent::Error("No file loaded".to_string())];
        }
        let path = current.path.clone();
        if self.merge_queue.add(path) {
            vec![SessionEvent::MergeQueueChanged(self.merge_queue.display_names())]
        } else {
            Vec::new()
        }
    }

    /// Queue several files at once; emits a single queue-changed event,
    /// and only when something was actually added.
    pub fn add_files_to_merge(&mut self, paths: &[PathBuf]) -> Vec<SessionEvent> {
        if self.merge_queue.add_many(paths.iter().cloned()) {
            vec![SessionEvent::MergeQueueChanged(self.merge_queue.display_names())]
        } else {
            Vec::new()
        }
    }

    pub fn remove_from_merge(&mut self, index: usize) -> Vec<SessionEvent> {
        if self.merge_queue.remove_at(index) {
            vec![SessionEvent::MergeQueueChanged(self.merge_queue.display_names())]
        } else {
            Vec::new()
        }
    }

    pub fn move_merge_item(&mut self, from: usize, to: usize) -> Vec<SessionEvent> {
        if self.merge_queue.move_item(from, to) {
            vec![SessionEvent::MergeQueueChanged(self.merge_queue.display_names())]
        } else {
            Vec::new()
        }
    }

    pub fn set_merge_separator(&mut self, separator: &str) {
        self.merge_queue.set_separator(separator);
    }

    /// Read every queued file in order and concatenate the contents with
    /// the queue separator. The first read failure abandons the whole
    /// merge. The result is an in-memory document with no path of its own;
    /// the queue itself is left intact.
    pub fn execute_merge(&mut self) -> Vec<SessionEvent> {
        if self.merge_queue.is_empty() {
            return vec![SessionEvent::Error("No files in merge list".to_string())];
        }
        let mut contents = Vec::with_capacity(self.merge_queue.len());
        for path in self.merge_queue.paths() {
            match gateway::open(path) {
                Ok(doc) => contents.push(doc.content),
                Err(err) => {
                    return vec![SessionEvent::Error(format!(
                        "Cannot read {}: {err}",
                        basename(path)
                    ))];
                }
            }
        }
        let merged = cleaning::merge_documents(&contents, self.merge_queue.separator());
        let count = contents.len();
        self.current = Some(Document {
            path: PathBuf::new(),
            content: merged.clone(),
            encoding: "utf-8".to_string(),
            modified: true,
        });
        vec![
            SessionEvent::DocumentReplaced(merged),
            SessionEvent::Status(format!("Merged {count} {}", plural(count, "file", "files"))),
        ]
    }
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}
