//! Turns a broadcast event plus the visitor's identifiers into a sent hit.

use std::future::Future;

use evtrack_transport::Transport;

use crate::{
    Analytics, AnalyticsError, AnalyticsResponse, AnalyticsSettings,
    ShouldBroadcastToAnalytics,
};

/// Who an event is about, captured when the event is dispatched.
///
/// Dispatching happens inside a request (where the session is at hand);
/// sending happens later on the job worker (where it isn't). The context
/// is the bridge between the two.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventContext {
    pub client_id: Option<String>,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
}

/// Sends one event to analytics.
pub trait EventBroadcaster: Send + Sync + 'static {
    /// Builds and sends the hit for `event`.
    ///
    /// Returns `Ok(None)` when there is nobody to attribute the event to
    /// (no client id and no user id), which the measurement API would
    /// reject anyway.
    fn handle(
        &self,
        event: &dyn ShouldBroadcastToAnalytics,
        context: &EventContext,
    ) -> impl Future<Output = Result<Option<AnalyticsResponse>, AnalyticsError>> + Send;
}

/// The default [`EventBroadcaster`]: a fresh [`Analytics`] per event.
#[derive(Debug, Clone)]
pub struct BroadcastEvent<T: Transport + Clone> {
    settings: AnalyticsSettings,
    transport: T,
    default_category: String,
    session_id_dimension: Option<u8>,
}

impl<T: Transport + Clone> BroadcastEvent<T> {
    /// Category used when an event doesn't name one.
    pub const DEFAULT_CATEGORY: &'static str = "Events";

    pub fn new(settings: AnalyticsSettings, transport: T) -> Self {
        Self {
            settings,
            transport,
            default_category: Self::DEFAULT_CATEGORY.to_string(),
            session_id_dimension: None,
        }
    }

    /// Overrides the fallback event category.
    pub fn default_category(mut self, category: impl Into<String>) -> Self {
        self.default_category = category.into();
        self
    }

    /// Reports the session identifier in custom dimension `index`.
    /// Without this the session identifier is not sent.
    pub fn session_id_dimension(mut self, index: Option<u8>) -> Self {
        self.session_id_dimension = index;
        self
    }
}

impl<T: Transport + Clone> EventBroadcaster for BroadcastEvent<T> {
    async fn handle(
        &self,
        event: &dyn ShouldBroadcastToAnalytics,
        context: &EventContext,
    ) -> Result<Option<AnalyticsResponse>, AnalyticsError> {
        let action = event.event_action();

        if context.client_id.is_none() && context.user_id.is_none() {
            tracing::debug!(%action, "no client or user id, event skipped");
            return Ok(None);
        }

        let mut analytics =
            Analytics::new(self.settings.clone(), self.transport.clone());

        if let Some(client_id) = &context.client_id {
            analytics.set_client_id(client_id.as_str());
        }
        if let Some(user_id) = &context.user_id {
            analytics.set_user_id(user_id.as_str());
        }
        if let (Some(index), Some(session_id)) =
            (self.session_id_dimension, &context.session_id)
        {
            analytics.set_custom_dimension(index, session_id.as_str());
        }

        let category = event
            .event_category()
            .unwrap_or_else(|| self.default_category.clone());
        analytics
            .set_event_category(category)
            .set_event_action(action);

        event.with_analytics(analytics.hit_mut());

        analytics.send_event().await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use evtrack_protocol::{Codec, FormCodec, Hit};
    use evtrack_transport::RecordingTransport;

    use super::*;

    struct OrderWasPaid;
    impl ShouldBroadcastToAnalytics for OrderWasPaid {}

    struct Signup;
    impl ShouldBroadcastToAnalytics for Signup {
        fn event_category(&self) -> Option<String> {
            Some("accounts".into())
        }

        fn with_analytics(&self, hit: &mut Hit) {
            hit.event_label = Some("newsletter".into());
        }
    }

    fn broadcaster(transport: &RecordingTransport) -> BroadcastEvent<RecordingTransport> {
        BroadcastEvent::new(
            AnalyticsSettings {
                tracking_id: "UA-1".into(),
                ..AnalyticsSettings::default()
            },
            transport.clone(),
        )
    }

    fn sent_hits(transport: &RecordingTransport) -> Vec<Hit> {
        transport
            .requests()
            .iter()
            .map(|r| FormCodec.decode(&r.body).unwrap())
            .collect()
    }

    fn context(client_id: &str) -> EventContext {
        EventContext {
            client_id: Some(client_id.into()),
            ..EventContext::default()
        }
    }

    #[tokio::test]
    async fn test_handle_sends_with_client_id_and_defaults() {
        let transport = RecordingTransport::new();

        let response = broadcaster(&transport)
            .handle(&OrderWasPaid, &context("cid-1"))
            .await
            .unwrap();

        assert!(response.is_some_and(|r| r.sent));
        let hits = sent_hits(&transport);
        assert_eq!(hits[0].client_id.as_deref(), Some("cid-1"));
        assert_eq!(hits[0].event_action.as_deref(), Some("OrderWasPaid"));
        assert_eq!(hits[0].event_category.as_deref(), Some("Events"));
        assert_eq!(hits[0].user_id, None);
    }

    #[tokio::test]
    async fn test_handle_applies_event_overrides() {
        let transport = RecordingTransport::new();

        broadcaster(&transport)
            .default_category("ignored")
            .handle(&Signup, &context("cid-1"))
            .await
            .unwrap();

        let hit = &sent_hits(&transport)[0];
        assert_eq!(hit.event_category.as_deref(), Some("accounts"));
        assert_eq!(hit.event_label.as_deref(), Some("newsletter"));
    }

    #[tokio::test]
    async fn test_handle_without_visitor_skips() {
        let transport = RecordingTransport::new();

        let response = broadcaster(&transport)
            .handle(&OrderWasPaid, &EventContext::default())
            .await
            .unwrap();

        assert!(response.is_none());
        assert!(transport.is_empty());
    }

    #[tokio::test]
    async fn test_handle_user_id_only_is_enough() {
        let transport = RecordingTransport::new();
        let ctx = EventContext {
            user_id: Some("42".into()),
            ..EventContext::default()
        };

        broadcaster(&transport).handle(&OrderWasPaid, &ctx).await.unwrap();

        assert_eq!(sent_hits(&transport)[0].user_id.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_handle_session_id_only_with_dimension() {
        let transport = RecordingTransport::new();
        let ctx = EventContext {
            session_id: Some("sess-9".into()),
            ..context("cid-1")
        };

        broadcaster(&transport).handle(&OrderWasPaid, &ctx).await.unwrap();
        broadcaster(&transport)
            .session_id_dimension(Some(2))
            .handle(&OrderWasPaid, &ctx)
            .await
            .unwrap();

        let hits = sent_hits(&transport);
        assert!(hits[0].custom_dimensions.is_empty());
        assert_eq!(
            hits[1].custom_dimensions.get(&2).map(String::as_str),
            Some("sess-9")
        );
    }
}
