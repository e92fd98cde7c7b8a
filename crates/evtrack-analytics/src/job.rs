//! Background delivery: the job queue, its worker task, and the listener
//! that feeds it.
//!
//! Sending a hit means an outbound HTTP request, which has no business
//! delaying the visitor's response. Dispatch therefore only enqueues a
//! [`SendEventToAnalytics`] job; a single worker task drains the queue and
//! runs the broadcaster.
//!
//! ```text
//! request task ──try_send──→ [mpsc, bounded] ──recv──→ worker task
//!                  (drops when full)                   (one job at a time)
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{
    AnalyticsError, EventBroadcaster, EventContext, Listener,
    ShouldBroadcastToAnalytics,
};

/// One event waiting to be sent, with the visitor context captured at
/// dispatch time.
pub struct SendEventToAnalytics {
    pub event: Arc<dyn ShouldBroadcastToAnalytics>,
    pub context: EventContext,
}

impl std::fmt::Debug for SendEventToAnalytics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendEventToAnalytics")
            .field("action", &self.event.event_action())
            .field("context", &self.context)
            .finish()
    }
}

/// Handle for enqueueing jobs. Cheap to clone (an `mpsc::Sender`).
#[derive(Debug, Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<SendEventToAnalytics>,
}

impl JobQueue {
    /// Enqueues a job without waiting.
    ///
    /// # Errors
    /// - [`AnalyticsError::QueueFull`] — the worker is behind; job dropped
    /// - [`AnalyticsError::QueueClosed`] — the worker is gone; job dropped
    pub fn push(&self, job: SendEventToAnalytics) -> Result<(), AnalyticsError> {
        self.sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => AnalyticsError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => AnalyticsError::QueueClosed,
        })
    }
}

/// Starts the worker task and returns the queue feeding it.
///
/// The worker stops once every [`JobQueue`] clone has been dropped and the
/// remaining jobs are drained; awaiting the returned handle waits for that.
pub fn spawn_worker<B: EventBroadcaster>(
    broadcaster: B,
    capacity: usize,
) -> (JobQueue, JoinHandle<()>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let handle = tokio::spawn(run_worker(broadcaster, receiver));
    (JobQueue { sender }, handle)
}

async fn run_worker<B: EventBroadcaster>(
    broadcaster: B,
    mut receiver: mpsc::Receiver<SendEventToAnalytics>,
) {
    tracing::info!("analytics worker started");

    while let Some(job) = receiver.recv().await {
        let action = job.event.event_action();
        match broadcaster.handle(job.event.as_ref(), &job.context).await {
            Ok(Some(response)) => {
                tracing::debug!(%action, sent = response.sent, "analytics job done");
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(%action, error = %e, "analytics job failed");
            }
        }
    }

    tracing::info!("analytics worker stopped");
}

// ---------------------------------------------------------------------------
// DispatchAnalyticsJob
// ---------------------------------------------------------------------------

/// [`Listener`] that turns each dispatched event into a queued job.
#[derive(Debug, Clone)]
pub struct DispatchAnalyticsJob {
    queue: JobQueue,
}

impl DispatchAnalyticsJob {
    pub fn new(queue: JobQueue) -> Self {
        Self { queue }
    }
}

impl Listener for DispatchAnalyticsJob {
    fn handle(
        &self,
        event: Arc<dyn ShouldBroadcastToAnalytics>,
        context: &EventContext,
    ) {
        let job = SendEventToAnalytics {
            event,
            context: context.clone(),
        };
        if let Err(e) = self.queue.push(job) {
            tracing::warn!(error = %e, "analytics event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use evtrack_protocol::{Codec, FormCodec};
    use evtrack_transport::RecordingTransport;

    use super::*;
    use crate::{AnalyticsSettings, BroadcastEvent, Events};

    struct CartAbandoned;
    impl ShouldBroadcastToAnalytics for CartAbandoned {}

    fn broadcaster(
        transport: &RecordingTransport,
    ) -> BroadcastEvent<RecordingTransport> {
        BroadcastEvent::new(
            AnalyticsSettings {
                tracking_id: "UA-1".into(),
                ..AnalyticsSettings::default()
            },
            transport.clone(),
        )
    }

    fn ctx(client_id: &str) -> EventContext {
        EventContext {
            client_id: Some(client_id.into()),
            ..EventContext::default()
        }
    }

    #[tokio::test]
    async fn test_worker_sends_queued_jobs_then_stops() {
        let transport = RecordingTransport::new();
        let (queue, worker) = spawn_worker(broadcaster(&transport), 8);

        for cid in ["a", "b"] {
            queue
                .push(SendEventToAnalytics {
                    event: Arc::new(CartAbandoned),
                    context: ctx(cid),
                })
                .unwrap();
        }
        drop(queue);
        worker.await.unwrap();

        let cids: Vec<_> = transport
            .requests()
            .iter()
            .map(|r| FormCodec.decode(&r.body).unwrap().client_id.unwrap())
            .collect();
        assert_eq!(cids, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_worker_survives_failed_jobs() {
        let transport = RecordingTransport::rejecting(500);
        let (queue, worker) = spawn_worker(broadcaster(&transport), 8);

        queue
            .push(SendEventToAnalytics {
                event: Arc::new(CartAbandoned),
                context: ctx("a"),
            })
            .unwrap();
        queue
            .push(SendEventToAnalytics {
                event: Arc::new(CartAbandoned),
                context: ctx("b"),
            })
            .unwrap();
        drop(queue);
        worker.await.unwrap();

        assert_eq!(transport.len(), 2);
    }

    #[tokio::test]
    async fn test_push_after_worker_stopped_is_closed() {
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);
        let queue = JobQueue { sender };

        let result = queue.push(SendEventToAnalytics {
            event: Arc::new(CartAbandoned),
            context: ctx("a"),
        });

        assert!(matches!(result, Err(AnalyticsError::QueueClosed)));
    }

    #[tokio::test]
    async fn test_push_when_full_is_dropped() {
        // Nobody drains this channel, so the second push overflows.
        let (sender, _receiver) = mpsc::channel(1);
        let queue = JobQueue { sender };
        let job = || SendEventToAnalytics {
            event: Arc::new(CartAbandoned),
            context: ctx("a"),
        };

        queue.push(job()).unwrap();
        let result = queue.push(job());

        assert!(matches!(result, Err(AnalyticsError::QueueFull)));
    }

    #[tokio::test]
    async fn test_dispatch_listener_feeds_worker() {
        let transport = RecordingTransport::new();
        let (queue, worker) = spawn_worker(broadcaster(&transport), 8);
        let mut events = Events::new();
        events.listen(DispatchAnalyticsJob::new(queue));

        events.dispatch(Arc::new(CartAbandoned), &ctx("visitor-1"));
        drop(events);
        worker.await.unwrap();

        let hit = FormCodec.decode(&transport.requests()[0].body).unwrap();
        assert_eq!(hit.client_id.as_deref(), Some("visitor-1"));
        assert_eq!(hit.event_action.as_deref(), Some("CartAbandoned"));
    }
}
