//! Error types for the session layer.

/// Errors that can occur during session management.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session cookie doesn't hold a well-formed token.
    /// Callers treat this like a missing cookie and start a new session.
    #[error("malformed session token")]
    InvalidToken,

    /// The storage backend failed to load, save or destroy a record.
    #[error("session store failure: {0}")]
    Backend(String),
}
