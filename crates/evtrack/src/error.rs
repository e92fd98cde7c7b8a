//! Unified error type for evtrack.

use evtrack_analytics::AnalyticsError;
use evtrack_protocol::ProtocolError;
use evtrack_session::SessionError;
use evtrack_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `evtrack` crate you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant generates the `From` impls, so `?` converts
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum EvtrackError {
    /// Bad or inconsistent configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A hit couldn't be built or encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A hit couldn't be delivered.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The session store failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The analytics client or job queue failed.
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_error() {
        let err = ConfigError::Invalid("queue_capacity must be > 0".into());
        let evtrack_err: EvtrackError = err.into();
        assert!(matches!(evtrack_err, EvtrackError::Config(_)));
        assert!(evtrack_err.to_string().contains("queue_capacity"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidHit("missing tid".into());
        let evtrack_err: EvtrackError = err.into();
        assert!(matches!(evtrack_err, EvtrackError::Protocol(_)));
    }

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::Rejected { status: 400 };
        let evtrack_err: EvtrackError = err.into();
        assert!(matches!(evtrack_err, EvtrackError::Transport(_)));
        assert!(evtrack_err.to_string().contains("400"));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::Backend("disk full".into());
        let evtrack_err: EvtrackError = err.into();
        assert!(matches!(evtrack_err, EvtrackError::Session(_)));
    }

    #[test]
    fn test_from_analytics_error() {
        let evtrack_err: EvtrackError = AnalyticsError::QueueFull.into();
        assert!(matches!(evtrack_err, EvtrackError::Analytics(_)));
    }
}
