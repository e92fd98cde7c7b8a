//! Accessors for the two analytics identifiers kept in the session.
//!
//! The client identifier is meant to outlive a single visit (it mirrors
//! the analytics cookie in the browser); the session identifier is scoped
//! to the current visit. Both are opaque strings stored under a configured
//! key, and nothing ties one to the other.

use crate::Session;

/// Reads and writes the visitor's client identifier.
pub trait ClientIdRepository {
    /// Stores `client_id`, replacing any previous value.
    fn update(&self, client_id: &str);

    /// Returns the stored client identifier, or `None` if never set.
    fn get(&self) -> Option<String>;
}

/// Reads and writes the visitor's session identifier.
pub trait SessionIdRepository {
    /// Stores `session_id`, replacing any previous value.
    fn update(&self, session_id: &str);

    /// Returns the stored session identifier, or `None` if never set.
    fn get(&self) -> Option<String>;
}

/// [`ClientIdRepository`] backed by a request's [`Session`].
#[derive(Debug, Clone)]
pub struct ClientIdSession {
    session: Session,
    key: String,
}

impl ClientIdSession {
    /// Binds the accessor to `session`, storing the id under `key`.
    pub fn new(session: Session, key: impl Into<String>) -> Self {
        Self {
            session,
            key: key.into(),
        }
    }
}

impl ClientIdRepository for ClientIdSession {
    fn update(&self, client_id: &str) {
        self.session.put(self.key.as_str(), client_id);
    }

    fn get(&self) -> Option<String> {
        self.session.get(&self.key)
    }
}

/// [`SessionIdRepository`] backed by a request's [`Session`].
#[derive(Debug, Clone)]
pub struct SessionIdSession {
    session: Session,
    key: String,
}

impl SessionIdSession {
    /// Binds the accessor to `session`, storing the id under `key`.
    pub fn new(session: Session, key: impl Into<String>) -> Self {
        Self {
            session,
            key: key.into(),
        }
    }
}

impl SessionIdRepository for SessionIdSession {
    fn update(&self, session_id: &str) {
        self.session.put(self.key.as_str(), session_id);
    }

    fn get(&self) -> Option<String> {
        self.session.get(&self.key)
    }
}
