//! Wiring: configuration in, routes + listener + worker out.
//!
//! [`EventTrackingBuilder::start`] does at startup what the rest of the crate
//! needs at request time:
//!   1. Validates the [`TrackingConfig`]
//!   2. Spawns the analytics worker and registers [`DispatchAnalyticsJob`]
//!      in the listener table
//!   3. On [`register`](EventTracking::register), mounts the identifier
//!      routes whose path is configured and wraps the app in the session
//!      middleware

use std::sync::Arc;

use axum::Extension;
use axum::Router;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::middleware::from_fn_with_state;
use axum::routing::post;
use evtrack_analytics::{
    Analytics, BroadcastEvent, DispatchAnalyticsJob, EventContext, Events,
    Listener, ShouldBroadcastToAnalytics, spawn_worker,
};
use evtrack_session::{
    ClientIdRepository, ClientIdSession, Session, SessionIdRepository,
    SessionIdSession, SessionStore,
};
use evtrack_transport::Transport;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::session_layer::{SessionLayerState, session_middleware};
use crate::{EvtrackError, TrackingConfig, routes, snippet};

/// Shared, read-only state every request sees.
#[derive(Debug)]
pub struct TrackingContext {
    config: TrackingConfig,
    events: Events,
}

impl TrackingContext {
    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// The listener table broadcastable events go through.
    pub fn events(&self) -> &Events {
        &self.events
    }
}

// ---------------------------------------------------------------------------
// EventTracking
// ---------------------------------------------------------------------------

/// The running integration: configuration, listener table and worker.
///
/// # Example
///
/// ```rust,ignore
/// use evtrack::prelude::*;
///
/// let tracking = EventTrackingBuilder::new(config).start(HttpTransport::new()?)?;
/// let app = tracking.register(shop_routes(), MemoryStore::default());
/// axum::serve(listener, app).await?;
/// ```
pub struct EventTracking<T: Transport + Clone> {
    context: Arc<TrackingContext>,
    transport: T,
    worker: JoinHandle<()>,
}

impl<T: Transport + Clone> EventTracking<T> {
    pub fn config(&self) -> &TrackingConfig {
        &self.context.config
    }

    /// A fresh analytics client with tracking id, protocol version, SSL,
    /// enabled and anonymize-IP settings applied.
    pub fn analytics(&self) -> Analytics<T> {
        Analytics::new(self.context.config.analytics_settings(), self.transport.clone())
    }

    /// Dispatches an event outside of a request, with an explicit visitor
    /// context. Returns how many listeners ran.
    pub fn dispatch(
        &self,
        event: impl ShouldBroadcastToAnalytics,
        context: &EventContext,
    ) -> usize {
        self.context.events.dispatch(Arc::new(event), context)
    }

    /// Mounts the identifier routes on `app` and wraps everything in the
    /// session middleware.
    ///
    /// Call this after the app's own routes are added: the session
    /// middleware (and with it [`Tracker`]) only covers routes that exist
    /// at this point. A route whose configured path is empty is not
    /// mounted.
    ///
    /// # Panics
    /// Panics if `app` already has a route at one of the configured paths.
    pub fn register<S: SessionStore>(&self, app: Router, store: S) -> Router {
        let config = &self.context.config;
        let mut router = app;

        if !config.http_uri_cid.is_empty() {
            router = router.route(&config.http_uri_cid, post(routes::store_client_id));
            tracing::info!(path = %config.http_uri_cid, "client id route registered");
        }
        if !config.http_uri_sid.is_empty() {
            router = router.route(&config.http_uri_sid, post(routes::store_session_id));
            tracing::info!(path = %config.http_uri_sid, "session id route registered");
        }

        let session_state = SessionLayerState {
            store: Arc::new(store),
            config: Arc::new(config.session.clone()),
        };

        router
            .layer(from_fn_with_state(session_state, session_middleware::<S>))
            .layer(Extension(Arc::clone(&self.context)))
            .layer(TraceLayer::new_for_http())
    }

    /// The `<script>` that reports the browser's analytics identifiers to
    /// the configured routes.
    pub fn client_id_script(&self) -> String {
        snippet::client_id_script(&self.context.config)
    }

    /// Waits for the worker to send everything still queued.
    ///
    /// The worker only stops once every router returned by
    /// [`register`](Self::register) has been dropped as well.
    pub async fn shutdown(self) {
        let Self { context, worker, .. } = self;
        drop(context);
        if let Err(e) = worker.await {
            tracing::error!(error = %e, "analytics worker panicked");
        }
        tracing::info!("event tracking shut down");
    }
}

// ---------------------------------------------------------------------------
// EventTrackingBuilder
// ---------------------------------------------------------------------------

/// Builder for [`EventTracking`].
pub struct EventTrackingBuilder {
    config: TrackingConfig,
    events: Events,
}

impl EventTrackingBuilder {
    /// Starts configuring the integration.
    pub fn new(config: TrackingConfig) -> Self {
        Self {
            config,
            events: Events::new(),
        }
    }

    /// Registers an extra listener. It runs before the analytics one.
    pub fn listen(mut self, listener: impl Listener) -> Self {
        self.events.listen(listener);
        self
    }

    /// Validates the config, spawns the analytics worker and registers the
    /// listener that feeds it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<T: Transport + Clone>(
        self,
        transport: T,
    ) -> Result<EventTracking<T>, EvtrackError> {
        let Self { config, mut events } = self;
        config.validate()?;

        let broadcaster =
            BroadcastEvent::new(config.analytics_settings(), transport.clone())
                .default_category(config.default_event_category.as_str())
                .session_id_dimension(config.session_id_dimension);
        let (queue, worker) = spawn_worker(broadcaster, config.queue_capacity);
        events.listen(DispatchAnalyticsJob::new(queue));

        tracing::info!(
            tracking_id = %config.tracking_id,
            enabled = config.is_enabled,
            listeners = events.len(),
            "event tracking started"
        );

        Ok(EventTracking {
            context: Arc::new(TrackingContext { config, events }),
            transport,
            worker,
        })
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// The authenticated user's id, for apps that report `uid`.
///
/// Insert it into the request extensions from your auth middleware; it is
/// only used when `send_user_id` is on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

/// Request-scoped handle for broadcasting events.
///
/// Extract it in any handler covered by [`EventTracking::register`]:
///
/// ```rust,ignore
/// async fn checkout(tracker: Tracker) -> &'static str {
///     tracker.broadcast(OrderWasPaid { total_cents: 1999 });
///     "thanks"
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Tracker {
    context: Arc<TrackingContext>,
    session: Session,
    user_id: Option<String>,
}

impl Tracker {
    /// The visitor's stored client identifier.
    pub fn client_id(&self) -> Option<String> {
        ClientIdSession::new(
            self.session.clone(),
            self.context.config.client_id_session_key.as_str(),
        )
        .get()
    }

    /// The visitor's stored session identifier.
    pub fn session_id(&self) -> Option<String> {
        SessionIdSession::new(
            self.session.clone(),
            self.context.config.session_id_session_key.as_str(),
        )
        .get()
    }

    /// The visitor context an event broadcast now would carry.
    pub fn event_context(&self) -> EventContext {
        EventContext {
            client_id: self.client_id(),
            session_id: self.session_id(),
            user_id: self
                .user_id
                .clone()
                .filter(|_| self.context.config.send_user_id),
        }
    }

    /// Dispatches `event` with the current visitor's identifiers. Returns
    /// how many listeners ran.
    pub fn broadcast(&self, event: impl ShouldBroadcastToAnalytics) -> usize {
        let context = self.event_context();
        tracing::debug!(
            action = %event.event_action(),
            has_client_id = context.client_id.is_some(),
            "broadcasting event"
        );
        self.context.events.dispatch(Arc::new(event), &context)
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Tracker {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let context = parts
            .extensions
            .get::<Arc<TrackingContext>>()
            .cloned()
            .ok_or((
                StatusCode::INTERNAL_SERVER_ERROR,
                "event tracking is not registered on this route",
            ))?;
        let session = parts.extensions.get::<Session>().cloned().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "no session on this route",
        ))?;
        let user_id = parts.extensions.get::<UserId>().map(|user| user.0.clone());

        Ok(Self {
            context,
            session,
            user_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use evtrack_protocol::{Codec, FormCodec};
    use evtrack_transport::RecordingTransport;

    use super::*;

    struct NewsletterSignup;
    impl ShouldBroadcastToAnalytics for NewsletterSignup {}

    fn config() -> TrackingConfig {
        TrackingConfig {
            tracking_id: "UA-1".into(),
            ..TrackingConfig::default()
        }
    }

    fn tracker(tracking: &EventTracking<RecordingTransport>, session: Session) -> Tracker {
        Tracker {
            context: Arc::clone(&tracking.context),
            session,
            user_id: Some("user-7".into()),
        }
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let result = EventTrackingBuilder::new(TrackingConfig::default())
            .start(RecordingTransport::new());
        assert!(matches!(result, Err(EvtrackError::Config(_))));
    }

    #[tokio::test]
    async fn test_analytics_factory_applies_settings() {
        let tracking = EventTrackingBuilder::new(TrackingConfig {
            anonymize_ip: false,
            ..config()
        })
        .start(RecordingTransport::new())
        .unwrap();

        let analytics = tracking.analytics();

        assert_eq!(analytics.hit().tracking_id, "UA-1");
        assert_eq!(analytics.hit().protocol_version, "1");
        assert!(!analytics.hit().anonymize_ip);
        assert!(analytics.is_enabled());
    }

    #[tokio::test]
    async fn test_tracker_context_reads_session_identifiers() {
        let tracking = EventTrackingBuilder::new(config())
            .start(RecordingTransport::new())
            .unwrap();
        let session = Session::start();
        session.put("evtrack.client-id", "cid-1");
        session.put("evtrack.session-id", "sid-1");

        let context = tracker(&tracking, session).event_context();

        assert_eq!(context.client_id.as_deref(), Some("cid-1"));
        assert_eq!(context.session_id.as_deref(), Some("sid-1"));
        assert_eq!(context.user_id, None, "send_user_id is off by default");
    }

    #[tokio::test]
    async fn test_tracker_sends_user_id_when_enabled() {
        let tracking = EventTrackingBuilder::new(TrackingConfig {
            send_user_id: true,
            ..config()
        })
        .start(RecordingTransport::new())
        .unwrap();

        let context = tracker(&tracking, Session::start()).event_context();

        assert_eq!(context.user_id.as_deref(), Some("user-7"));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_transport_after_shutdown() {
        let transport = RecordingTransport::new();
        let tracking = EventTrackingBuilder::new(config())
            .start(transport.clone())
            .unwrap();
        let session = Session::start();
        session.put("evtrack.client-id", "cid-9");

        let ran = tracker(&tracking, session).broadcast(NewsletterSignup);
        tracking.shutdown().await;

        assert_eq!(ran, 1);
        let hit = FormCodec.decode(&transport.requests()[0].body).unwrap();
        assert_eq!(hit.client_id.as_deref(), Some("cid-9"));
        assert_eq!(hit.event_category.as_deref(), Some("Events"));
        assert_eq!(hit.event_action.as_deref(), Some("NewsletterSignup"));
    }

    #[tokio::test]
    async fn test_builder_listeners_run_before_analytics() {
        struct Count(Arc<std::sync::atomic::AtomicUsize>);
        impl Listener for Count {
            fn handle(&self, _: Arc<dyn ShouldBroadcastToAnalytics>, _: &EventContext) {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        }

        let seen = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let tracking = EventTrackingBuilder::new(config())
            .listen(Count(Arc::clone(&seen)))
            .start(RecordingTransport::new())
            .unwrap();

        let ran = tracking.dispatch(NewsletterSignup, &EventContext::default());

        assert_eq!(ran, 2);
        assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
