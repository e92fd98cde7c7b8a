/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request never produced a response (DNS, connect, timeout).
    #[error("send failed: {0}")]
    SendFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The remote service answered with a non-success status.
    #[error("rejected with status {status}")]
    Rejected {
        /// HTTP status code returned by the service.
        status: u16,
    },

    /// The transport could not be constructed.
    #[error("transport setup failed: {0}")]
    Setup(String),
}
