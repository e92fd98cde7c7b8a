//! In-memory transport that records hits instead of sending them.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{HitRequest, Transport, TransportError, TransportResponse};

/// A [`Transport`] that appends every request to a shared list.
///
/// Clones share the same list, so a test can hand one clone to the
/// analytics client and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    requests: Arc<Mutex<Vec<HitRequest>>>,
    reject_with: Option<u16>,
}

impl RecordingTransport {
    /// Creates a transport that accepts every request with `200`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport that records requests but answers with the
    /// given non-success status.
    pub fn rejecting(status: u16) -> Self {
        Self {
            requests: Arc::default(),
            reject_with: Some(status),
        }
    }

    /// Returns a copy of every request seen so far, oldest first.
    pub fn requests(&self) -> Vec<HitRequest> {
        self.requests.lock().clone()
    }

    /// Number of recorded requests.
    pub fn len(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns `true` if nothing was sent yet.
    pub fn is_empty(&self) -> bool {
        self.requests.lock().is_empty()
    }
}

impl Transport for RecordingTransport {
    async fn send(
        &self,
        request: HitRequest,
    ) -> Result<TransportResponse, TransportError> {
        tracing::trace!(url = %request.url, "recording hit");
        self.requests.lock().push(request);
        match self.reject_with {
            Some(status) => Err(TransportError::Rejected { status }),
            None => Ok(TransportResponse {
                status: 200,
                body: Vec::new(),
            }),
        }
    }
}
