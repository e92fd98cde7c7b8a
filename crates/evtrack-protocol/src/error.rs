//! Error types for the protocol layer.
//!
//! Each crate in evtrack defines its own error enum. When you see a
//! `ProtocolError`, the problem is in the shape of a hit, not in the
//! network or the session.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The hit is missing a parameter the measurement API requires, or a
    /// parameter is out of range.
    ///
    /// Raised before encoding so that a hit the remote service would
    /// silently discard never leaves the process.
    #[error("invalid hit: {0}")]
    InvalidHit(String),

    /// The bytes could not be parsed back into a hit.
    ///
    /// Common causes: a body that is not UTF-8, an unknown hit type, or a
    /// non-numeric event value.
    #[error("decode failed: {0}")]
    Decode(String),
}
