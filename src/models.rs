//! Data models for the notes client.
//!
//! This module contains the records owned by the stores (identity, notes,
//! selection metadata) and the chat contract (messages, citations, answers).
//! Field names serialize in camelCase so persisted snapshots stay readable by
//! any JavaScript-side consumer of the same storage.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::DEFAULT_TOP_K;

pub const UNTITLED: &str = "Untitled";
pub const EMPTY_SNIPPET: &str = "No content yet";
pub const SNIPPET_CHARS: usize = 160;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

pub type NoteId = Uuid;

// ============================================================================
// Identity
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

// ============================================================================
// Notes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub starred: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// A fresh "Untitled" note stamped with `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: UNTITLED.to_string(),
            content: String::new(),
            tags: Vec::new(),
            starred: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Title for list display; an empty title shows as "Untitled".
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            UNTITLED
        } else {
            &self.title
        }
    }

    /// Plain-text preview of the content: markup tags removed, first 160
    /// characters kept.
    pub fn snippet(&self) -> String {
        let stripped = TAG_RE.replace_all(&self.content, "");
        let snippet: String = stripped.chars().take(SNIPPET_CHARS).collect();
        if snippet.is_empty() {
            EMPTY_SNIPPET.to_string()
        } else {
            snippet
        }
    }

    /// Merge the provided fields into this note.
    ///
    /// Does not touch `updated_at`; the repository owns that.
    pub(crate) fn apply(&mut self, patch: NotePatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(starred) = patch.starred {
            self.starred = starred;
        }
    }
}

/// Partial update for a note. `id` and timestamps are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub starred: Option<bool>,
}

impl NotePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteFilter {
    #[default]
    All,
    Favorites,
}

impl NoteFilter {
    pub fn matches(self, note: &Note) -> bool {
        match self {
            NoteFilter::All => true,
            NoteFilter::Favorites => note.starred,
        }
    }
}

/// Which note is active, plus free-form tag metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionMeta {
    pub selected_note_id: Option<NoteId>,
    #[serde(default)]
    pub tags: Map<String, Value>,
}

// ============================================================================
// Chat
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

/// Normalized reply from the chat service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub text: String,
    pub citations: Vec<Citation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskOptions {
    pub top_k: u32,
}

impl Default for AskOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_with(title: &str, content: &str) -> Note {
        let mut note = Note::new(Utc::now());
        note.title = title.to_string();
        note.content = content.to_string();
        note
    }

    #[test]
    fn test_new_note_defaults() {
        let now = Utc::now();
        let note = Note::new(now);
        assert_eq!(note.title, "Untitled");
        assert!(note.content.is_empty());
        assert!(note.tags.is_empty());
        assert!(!note.starred);
        assert_eq!(note.created_at, now);
        assert_eq!(note.updated_at, now);
    }

    #[test]
    fn test_note_serializes_camel_case() {
        let note = Note::new(Utc::now());
        let json = serde_json::to_value(&note).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn test_snippet_strips_tags_and_truncates() {
        let note = note_with("t", "<p>Hello <b>world</b></p>");
        assert_eq!(note.snippet(), "Hello world");

        let long = note_with("t", &"x".repeat(500));
        assert_eq!(long.snippet().chars().count(), 160);

        let empty = note_with("t", "<br>");
        assert_eq!(empty.snippet(), "No content yet");
    }

    #[test]
    fn test_display_title_falls_back() {
        assert_eq!(note_with("", "").display_title(), "Untitled");
        assert_eq!(note_with("  ", "").display_title(), "  ");
        assert_eq!(note_with("Plan", "").display_title(), "Plan");
    }

    #[test]
    fn test_patch_deserializes_partial_fields() {
        let patch: NotePatch = serde_json::from_str(r#"{"title":"X"}"#).unwrap();
        assert_eq!(patch, NotePatch::title("X"));
    }

    #[test]
    fn test_selection_meta_shape() {
        let meta = SelectionMeta::default();
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json, serde_json::json!({"selectedNoteId": null, "tags": {}}));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Role::Assistant).unwrap(), "assistant");
    }
}
