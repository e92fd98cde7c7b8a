//! Error types for the analytics layer.

use evtrack_protocol::ProtocolError;
use evtrack_transport::TransportError;

/// Errors that can occur while building, queueing or sending a hit.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// The hit was rejected before it left the process.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The hit could not be delivered.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The job queue is at capacity; the job was dropped.
    #[error("analytics job queue is full")]
    QueueFull,

    /// The job worker has stopped; the job was dropped.
    #[error("analytics job worker is not running")]
    QueueClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_protocol_error() {
        let err: AnalyticsError =
            ProtocolError::InvalidHit("no tid".into()).into();
        assert!(matches!(err, AnalyticsError::Protocol(_)));
        assert!(err.to_string().contains("no tid"));
    }

    #[test]
    fn test_from_transport_error() {
        let err: AnalyticsError =
            TransportError::Rejected { status: 500 }.into();
        assert!(matches!(err, AnalyticsError::Transport(_)));
        assert!(err.to_string().contains("500"));
    }
}
