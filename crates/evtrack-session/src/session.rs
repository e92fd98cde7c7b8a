//! Session types: the data structures that represent one visitor's session.
//!
//! A "session" is the server's record of a visitor between requests. It
//! tracks:
//! - WHICH visitor it belongs to (a random [`SessionToken`] in a cookie)
//! - WHAT we know about them (string attributes, [`SessionData`])
//! - WHETHER this request changed anything (so a brand-new session nobody
//!   wrote to is never stored)

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::SessionError;

/// Attributes stored for one visitor.
pub type SessionData = HashMap<String, String>;

/// Number of random bytes in a token (rendered as twice as many hex chars).
const TOKEN_BYTES: usize = 16;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the cookie that carries the session token.
    pub cookie_name: String,

    /// How long (in seconds) an untouched session survives.
    ///
    /// Default: 7200 seconds (two hours).
    pub lifetime_secs: u64,

    /// Mark the cookie `Secure` (HTTPS only).
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "evtrack_session".to_string(),
            lifetime_secs: 7200,
            secure: false,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionToken
// ---------------------------------------------------------------------------

/// The opaque value in the session cookie.
///
/// A 32-character lowercase hex string (128 bits of entropy), so guessing
/// another visitor's token is computationally infeasible.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generates a fresh random token.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let bytes: [u8; TOKEN_BYTES] = rng.random();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Parses a token received from a client.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidToken`] unless the value is exactly
    /// 32 lowercase hex characters.
    pub fn parse(value: &str) -> Result<Self, SessionError> {
        let well_formed = value.len() == TOKEN_BYTES * 2
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if well_formed {
            Ok(Self(value.to_string()))
        } else {
            Err(SessionError::InvalidToken)
        }
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only a prefix: full tokens are credentials and must not hit logs.
        write!(f, "{}…", &self.0[..8])
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Inner {
    token: SessionToken,
    data: SessionData,
    dirty: bool,
    is_new: bool,
}

/// One visitor's session for the duration of a request.
///
/// Cloning is cheap (an `Arc`); all clones see the same attributes. The HTTP
/// layer keeps one clone to write the session back after the handler ran,
/// and hands another to the handler.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<Mutex<Inner>>,
}

impl Session {
    /// Starts a brand-new, empty session with a fresh token.
    pub fn start() -> Self {
        Self::from_parts(SessionToken::generate(), SessionData::new(), true)
    }

    /// Resumes a session previously loaded from a store.
    pub fn resume(token: SessionToken, data: SessionData) -> Self {
        Self::from_parts(token, data, false)
    }

    fn from_parts(token: SessionToken, data: SessionData, is_new: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                token,
                data,
                dirty: false,
                is_new,
            })),
        }
    }

    /// The token identifying this session.
    pub fn token(&self) -> SessionToken {
        self.inner.lock().token.clone()
    }

    /// Returns the attribute stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().data.get(key).cloned()
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut inner = self.inner.lock();
        inner.data.insert(key.into(), value.into());
        inner.dirty = true;
    }

    /// Removes `key` and returns its previous value.
    pub fn forget(&self, key: &str) -> Option<String> {
        let mut inner = self.inner.lock();
        let previous = inner.data.remove(key);
        if previous.is_some() {
            inner.dirty = true;
        }
        previous
    }

    /// `true` once any attribute was written during this request.
    pub fn is_dirty(&self) -> bool {
        self.inner.lock().dirty
    }

    /// `true` if the session was started during this request.
    pub fn is_new(&self) -> bool {
        self.inner.lock().is_new
    }

    /// Copies the current attributes, e.g. to hand them to a store.
    pub fn snapshot(&self) -> SessionData {
        self.inner.lock().data.clone()
    }
}
