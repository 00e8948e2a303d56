//! Note repository.
//!
//! Owns the ordered note collection and the selection metadata, each
//! persisted as its own snapshot. The stored order is the display order:
//! new notes are prepended, nothing is ever re-sorted.
//!
//! Mutations addressed at an unknown id are silent no-ops. An edit racing a
//! delete is normal UI traffic, not an error.

use chrono::{DateTime, Utc};
use log::debug;
use std::slice;

use crate::models::{Note, NoteFilter, NoteId, NotePatch, SelectionMeta};
use crate::snapshot::{Persisted, SnapshotStore};

/// Snapshot key for the note collection.
pub const NOTES_KEY: &str = "notes-data";
/// Snapshot key for the selection metadata.
pub const META_KEY: &str = "notes-meta";

pub type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct NoteRepository {
    notes: Persisted<Vec<Note>>,
    meta: Persisted<SelectionMeta>,
    clock: Clock,
}

impl NoteRepository {
    pub fn load(store: &SnapshotStore) -> Self {
        Self::with_clock(store, Box::new(Utc::now))
    }

    /// Like [`load`](Self::load) with a custom time source.
    pub fn with_clock(store: &SnapshotStore, clock: Clock) -> Self {
        Self {
            notes: Persisted::load(store, NOTES_KEY, Vec::new()),
            meta: Persisted::load(store, META_KEY, SelectionMeta::default()),
            clock,
        }
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Create an "Untitled" note at the front of the list and select it.
    pub fn create(&mut self) -> Note {
        let note = Note::new((self.clock)());
        self.notes.update(|notes| notes.insert(0, note.clone()));
        self.meta
            .update(|meta| meta.selected_note_id = Some(note.id));
        debug!("event=note_create module=notes status=ok id={}", note.id);
        note
    }

    /// Merge `patch` into the note and bump `updated_at`.
    pub fn update(&mut self, id: NoteId, patch: NotePatch) {
        let now = (self.clock)();
        self.notes.update_if(|notes| {
            match notes.iter_mut().find(|n| n.id == id) {
                Some(note) => {
                    note.apply(patch);
                    note.updated_at = now;
                    true
                }
                None => false,
            }
        });
    }

    /// Remove the note; clears the selection if it pointed at it.
    pub fn delete(&mut self, id: NoteId) {
        let removed = self.notes.update_if(|notes| {
            let before = notes.len();
            notes.retain(|n| n.id != id);
            notes.len() != before
        });
        self.meta.update_if(|meta| {
            if meta.selected_note_id == Some(id) {
                meta.selected_note_id = None;
                true
            } else {
                false
            }
        });
        if removed {
            debug!("event=note_delete module=notes status=ok id={}", id);
        }
    }

    /// Point the selection at `id` without checking that it exists.
    pub fn select(&mut self, id: NoteId) {
        self.meta.update(|meta| meta.selected_note_id = Some(id));
    }

    /// Flip `starred`. Starring is metadata, so `updated_at` is left alone.
    pub fn toggle_star(&mut self, id: NoteId) {
        self.notes.update_if(|notes| {
            match notes.iter_mut().find(|n| n.id == id) {
                Some(note) => {
                    note.starred = !note.starred;
                    true
                }
                None => false,
            }
        });
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn list(&self, filter: NoteFilter) -> NoteView<'_> {
        NoteView {
            notes: self.notes.get(),
            filter,
        }
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.get().iter().find(|n| n.id == id)
    }

    pub fn selected_id(&self) -> Option<NoteId> {
        self.meta.get().selected_note_id
    }

    /// The selected note, or `None` if nothing is selected or the selection
    /// dangles.
    pub fn selected(&self) -> Option<&Note> {
        self.selected_id().and_then(|id| self.get(id))
    }

    pub fn meta(&self) -> &SelectionMeta {
        self.meta.get()
    }

    /// Case-insensitive substring search over title and content, in display
    /// order.
    pub fn search(&self, filter: NoteFilter, query: &str) -> Vec<&Note> {
        let query_lower = query.trim().to_lowercase();
        self.list(filter)
            .iter()
            .filter(|note| {
                query_lower.is_empty()
                    || note.title.to_lowercase().contains(&query_lower)
                    || note.content.to_lowercase().contains(&query_lower)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.notes.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.get().is_empty()
    }
}

// ============================================================================
// Views
// ============================================================================

/// Lazy filtered view over the collection. Iterating twice restarts from the
/// front.
#[derive(Clone, Copy)]
pub struct NoteView<'a> {
    notes: &'a [Note],
    filter: NoteFilter,
}

impl<'a> NoteView<'a> {
    pub fn iter(&self) -> NoteIter<'a> {
        NoteIter {
            inner: self.notes.iter(),
            filter: self.filter,
        }
    }

    pub fn filter(&self) -> NoteFilter {
        self.filter
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl<'a> IntoIterator for NoteView<'a> {
    type Item = &'a Note;
    type IntoIter = NoteIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Clone)]
pub struct NoteIter<'a> {
    inner: slice::Iter<'a, Note>,
    filter: NoteFilter,
}

impl<'a> Iterator for NoteIter<'a> {
    type Item = &'a Note;

    fn next(&mut self) -> Option<Self::Item> {
        let filter = self.filter;
        self.inner.by_ref().find(|n| filter.matches(n))
    }
}
