//! Notes client core - stores, chat integration, and the command surface.
//!
//! The rendering layer drives two independent stores (session and notes),
//! both persisted as JSON snapshots, plus a web-search chat assistant. This
//! crate holds that state and exposes it as a local JSON API.

use std::sync::{Arc, Mutex, MutexGuard};

pub mod chat;
pub mod config;
pub mod conversation;
pub mod endpoint;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod notes;
pub mod session;
pub mod snapshot;

use chat::ChatClient;
use config::Config;
use conversation::Conversation;
use error::AppError;
use notes::NoteRepository;
use session::SessionStore;
use snapshot::SnapshotStore;

// ============================================================================
// Application State
// ============================================================================

/// Everything the command surface operates on.
///
/// Stores sit behind plain mutexes: every store operation is synchronous,
/// and no guard is held across an `.await`.
pub struct AppState {
    pub config: Config,
    pub snapshots: SnapshotStore,
    pub session: Mutex<SessionStore>,
    pub notes: Mutex<NoteRepository>,
    pub conversation: Mutex<Conversation>,
    pub chat: ChatClient,
}

impl AppState {
    /// Open the sled database named in `config` and restore both stores.
    pub fn open(config: Config) -> Result<Self, AppError> {
        let snapshots = SnapshotStore::open(&config.db_path)?;
        Self::with_store(config, snapshots)
    }

    /// Build the state on an already opened snapshot store.
    pub fn with_store(config: Config, snapshots: SnapshotStore) -> Result<Self, AppError> {
        let chat = ChatClient::new(config.chat.clone())?;
        Ok(Self {
            session: Mutex::new(SessionStore::load(&snapshots)),
            notes: Mutex::new(NoteRepository::load(&snapshots)),
            conversation: Mutex::new(Conversation::new()),
            chat,
            snapshots,
            config,
        })
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

/// Lock a store, recovering the guard if a previous holder panicked.
///
/// Store mutations are applied in one step, so a poisoned store still holds
/// a consistent value.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// Re-export commonly used types
pub use chat::{normalize_citation, normalize_response};
pub use error::{AuthError, ChatError, ConfigError, ConversationError, StorageError};
pub use models::{
    AskOptions, ChatAnswer, ChatMessage, Citation, Identity, Note, NoteFilter, NoteId, NotePatch,
    Role, SelectionMeta,
};
pub use notes::NoteView;
pub use session::SessionState;
pub use snapshot::{KvBackend, MemoryBackend, Persisted, SledBackend};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stores_share_one_snapshot_backend() {
        let snapshots = SnapshotStore::in_memory();
        let state = AppState::with_store(Config::default(), snapshots.clone()).unwrap();
        lock(&state.session).login("a@b.com", "pw").unwrap();
        let note = lock(&state.notes).create();
        drop(state);

        let restored = AppState::with_store(Config::default(), snapshots).unwrap();
        assert!(lock(&restored.session).is_authenticated());
        assert_eq!(lock(&restored.notes).selected_id(), Some(note.id));
        assert_eq!(lock(&restored.conversation).messages().len(), 1);
    }
}
