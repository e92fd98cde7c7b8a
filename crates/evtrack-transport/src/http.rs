//! HTTP transport implementation using `reqwest`.

use std::time::Duration;

use crate::{HitRequest, Transport, TransportError, TransportResponse};

/// Default per-request timeout. Hits are fire-and-forget from the
/// visitor's point of view, so a slow collector must not pin a worker.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A [`Transport`] that POSTs hits over HTTP(S).
///
/// Cheap to clone: `reqwest::Client` is an `Arc` around a connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with the default timeout.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates a transport with a custom per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("evtrack/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn send(
        &self,
        request: HitRequest,
    ) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .post(&request.url)
            .header(reqwest::header::CONTENT_TYPE, request.content_type)
            .body(request.body)
            .send()
            .await
            .map_err(|e| TransportError::SendFailed(Box::new(e)))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::SendFailed(Box::new(e)))?
            .to_vec();

        let response = TransportResponse { status, body };
        if !response.is_success() {
            return Err(TransportError::Rejected { status });
        }
        tracing::debug!(url = %request.url, status, "hit delivered");
        Ok(response)
    }
}
