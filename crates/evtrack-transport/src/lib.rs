//! Transport abstraction layer for evtrack.
//!
//! Provides the [`Transport`] trait that abstracts over how an encoded hit
//! reaches the measurement API.
//!
//! # Feature Flags
//!
//! - `http` (default) — real delivery via `reqwest` ([`HttpTransport`])
//!
//! [`RecordingTransport`] is always available: it keeps requests in memory
//! instead of sending them, for tests and dry runs.

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "http")]
mod http;
mod recording;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use recording::RecordingTransport;

use std::future::Future;

/// One outbound hit, already encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitRequest {
    /// Absolute URL the body is POSTed to.
    pub url: String,
    /// Value of the `Content-Type` header.
    pub content_type: &'static str,
    /// Encoded request body.
    pub body: Vec<u8>,
}

/// What the remote service answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body. The collect endpoint returns a GIF; the debug
    /// endpoint returns a JSON validation report.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Delivers encoded hits.
///
/// The returned future is `Send` so a transport can be driven from a
/// spawned Tokio task (the analytics job worker does exactly that).
pub trait Transport: Send + Sync + 'static {
    /// Sends one request and waits for the response.
    ///
    /// # Errors
    /// - [`TransportError::SendFailed`] — no response was received
    /// - [`TransportError::Rejected`] — the service returned a non-2xx status
    fn send(
        &self,
        request: HitRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}
