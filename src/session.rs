//! Session and identity store.
//!
//! Holds at most one signed-in identity and persists it as a snapshot, so
//! the session survives restarts. Credentials are only checked for presence;
//! there is no user registry behind `login`/`register`.

use log::info;
use sha2::{Digest, Sha256};

use crate::error::AuthError;
use crate::models::Identity;
use crate::snapshot::{Persisted, SnapshotStore};

/// Snapshot key for the current identity.
pub const AUTH_KEY: &str = "notes-auth-user";

const ID_HEX_CHARS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

pub struct SessionStore {
    user: Persisted<Option<Identity>>,
}

impl SessionStore {
    /// Restore the session from `store`; Authenticated if an identity was
    /// persisted.
    pub fn load(store: &SnapshotStore) -> Self {
        Self {
            user: Persisted::load(store, AUTH_KEY, None),
        }
    }

    pub fn current(&self) -> Option<&Identity> {
        self.user.get().as_ref()
    }

    pub fn state(&self) -> SessionState {
        match self.current() {
            Some(_) => SessionState::Authenticated,
            None => SessionState::Anonymous,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Sign in, replacing any current identity.
    pub fn login(&mut self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.sign_in(email, password, "login")
    }

    /// Same contract as [`login`](Self::login).
    pub fn register(&mut self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.sign_in(email, password, "register")
    }

    pub fn logout(&mut self) {
        self.user.set(None);
        info!("event=logout module=session status=ok");
    }

    fn sign_in(&mut self, email: &str, password: &str, op: &str) -> Result<Identity, AuthError> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Validation);
        }
        let identity = derive_identity(email);
        self.user.set(Some(identity.clone()));
        info!(
            "event={} module=session status=ok user_id={}",
            op, identity.id
        );
        Ok(identity)
    }
}

/// Stable identity for an email: the id is a SHA-256 prefix of the address.
pub fn derive_identity(email: &str) -> Identity {
    let digest = Sha256::digest(email.as_bytes());
    let hex = hex_encode(digest.as_slice());
    Identity {
        id: format!("user-{}", &hex[..ID_HEX_CHARS]),
        email: email.to_string(),
    }
}

/// Encode bytes as hexadecimal
fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_anonymous_on_empty_storage() {
        let store = SnapshotStore::in_memory();
        let session = SessionStore::load(&store);
        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(session.current().is_none());
    }

    #[test]
    fn test_login_commits_identity() {
        let store = SnapshotStore::in_memory();
        let mut session = SessionStore::load(&store);
        let identity = session.login("a@b.com", "pw").unwrap();
        assert_eq!(identity.email, "a@b.com");
        assert!(identity.id.starts_with("user-"));
        assert_eq!(session.current(), Some(&identity));
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_empty_fields_are_rejected_without_mutation() {
        let store = SnapshotStore::in_memory();
        let mut session = SessionStore::load(&store);
        let prior = session.login("prior@b.com", "pw").unwrap();

        assert_eq!(session.login("", "x"), Err(AuthError::Validation));
        assert_eq!(session.login("a@b.com", ""), Err(AuthError::Validation));
        assert_eq!(session.register("", ""), Err(AuthError::Validation));
        assert_eq!(session.current(), Some(&prior));
    }

    #[test]
    fn test_register_behaves_like_login() {
        let store = SnapshotStore::in_memory();
        let mut session = SessionStore::load(&store);
        let registered = session.register("new@b.com", "pw").unwrap();
        let logged_in = session.login("new@b.com", "other").unwrap();
        assert_eq!(registered, logged_in);
    }

    #[test]
    fn test_login_replaces_existing_identity() {
        let store = SnapshotStore::in_memory();
        let mut session = SessionStore::load(&store);
        session.login("first@b.com", "pw").unwrap();
        let second = session.login("second@b.com", "pw").unwrap();
        assert_eq!(session.current(), Some(&second));
    }

    #[test]
    fn test_logout_clears_identity() {
        let store = SnapshotStore::in_memory();
        let mut session = SessionStore::load(&store);
        session.login("a@b.com", "pw").unwrap();
        session.logout();
        assert_eq!(session.state(), SessionState::Anonymous);
        assert_eq!(store.load::<Option<Identity>>(AUTH_KEY, None), None);
    }

    #[test]
    fn test_session_is_restored_from_snapshot() {
        let store = SnapshotStore::in_memory();
        let identity = {
            let mut session = SessionStore::load(&store);
            session.login("a@b.com", "pw").unwrap()
        };
        let restored = SessionStore::load(&store);
        assert_eq!(restored.current(), Some(&identity));
    }

    #[test]
    fn test_identity_is_deterministic() {
        assert_eq!(derive_identity("a@b.com"), derive_identity("a@b.com"));
        assert_ne!(derive_identity("a@b.com").id, derive_identity("c@d.com").id);
        assert_eq!(derive_identity("a@b.com").id.len(), "user-".len() + 16);
    }
}
