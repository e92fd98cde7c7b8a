//! The listener table broadcastable events are dispatched through.

use std::fmt;
use std::sync::Arc;

use crate::{EventContext, ShouldBroadcastToAnalytics};

/// Reacts to a dispatched event.
///
/// Listeners run synchronously inside the dispatching request, so they
/// should hand real work off (as [`DispatchAnalyticsJob`](crate::DispatchAnalyticsJob)
/// does) rather than perform I/O.
pub trait Listener: Send + Sync + 'static {
    fn handle(
        &self,
        event: Arc<dyn ShouldBroadcastToAnalytics>,
        context: &EventContext,
    );
}

/// Registered listeners for broadcastable events.
///
/// Built once at startup, then shared read-only (`Arc<Events>`) by every
/// request.
#[derive(Default, Clone)]
pub struct Events {
    listeners: Vec<Arc<dyn Listener>>,
}

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener. Listeners run in registration order.
    pub fn listen(&mut self, listener: impl Listener) {
        self.listeners.push(Arc::new(listener));
    }

    /// Hands `event` to every listener. Returns how many ran.
    pub fn dispatch(
        &self,
        event: Arc<dyn ShouldBroadcastToAnalytics>,
        context: &EventContext,
    ) -> usize {
        for listener in &self.listeners {
            listener.handle(Arc::clone(&event), context);
        }
        self.listeners.len()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for Events {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Events")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
