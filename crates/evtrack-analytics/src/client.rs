//! The measurement-protocol client.

use evtrack_protocol::{Codec, FormCodec, Hit, HitType};
use evtrack_transport::{HitRequest, Transport};

use crate::{AnalyticsError, AnalyticsSettings};

/// What happened to a hit handed to [`Analytics::send_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsResponse {
    /// `false` when the client is disabled and nothing left the process.
    pub sent: bool,
    /// HTTP status returned by the service, when sent.
    pub status: Option<u16>,
    /// Raw response body. The debug endpoint puts its JSON report here.
    pub body: Vec<u8>,
}

impl AnalyticsResponse {
    fn not_sent() -> Self {
        Self {
            sent: false,
            status: None,
            body: Vec::new(),
        }
    }

    /// The response body as text, when it is valid UTF-8.
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// A measurement-protocol client with fluent setters.
///
/// One instance builds one hit at a time. The settings (tracking id,
/// protocol version, anonymize-IP) are applied on construction; the
/// per-hit setters fill in the rest before [`send_event`](Self::send_event).
///
/// ```rust
/// # async fn demo() -> Result<(), evtrack_analytics::AnalyticsError> {
/// use evtrack_analytics::{Analytics, AnalyticsSettings};
/// use evtrack_transport::RecordingTransport;
///
/// let settings = AnalyticsSettings {
///     tracking_id: "UA-1".into(),
///     ..AnalyticsSettings::default()
/// };
/// let mut analytics = Analytics::new(settings, RecordingTransport::new());
/// analytics
///     .set_client_id("35009a79")
///     .set_event_category("orders")
///     .set_event_action("OrderWasPaid");
/// let response = analytics.send_event().await?;
/// assert!(response.sent);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Analytics<T: Transport, C: Codec = FormCodec> {
    settings: AnalyticsSettings,
    hit: Hit,
    transport: T,
    codec: C,
}

impl<T: Transport> Analytics<T, FormCodec> {
    /// Creates a client that form-encodes hits.
    pub fn new(settings: AnalyticsSettings, transport: T) -> Self {
        Self::with_codec(settings, transport, FormCodec)
    }
}

impl<T: Transport, C: Codec> Analytics<T, C> {
    /// Creates a client with a custom codec.
    pub fn with_codec(settings: AnalyticsSettings, transport: T, codec: C) -> Self {
        let hit = Hit {
            protocol_version: settings.protocol_version.clone(),
            tracking_id: settings.tracking_id.clone(),
            anonymize_ip: settings.anonymize_ip,
            ..Hit::default()
        };
        Self {
            settings,
            hit,
            transport,
            codec,
        }
    }

    /// `false` when the client was configured not to send.
    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// The hit being built.
    pub fn hit(&self) -> &Hit {
        &self.hit
    }

    /// Mutable access to the hit being built, for parameters without a
    /// dedicated setter.
    pub fn hit_mut(&mut self) -> &mut Hit {
        &mut self.hit
    }

    pub fn set_client_id(&mut self, client_id: impl Into<String>) -> &mut Self {
        self.hit.client_id = Some(client_id.into());
        self
    }

    pub fn set_user_id(&mut self, user_id: impl Into<String>) -> &mut Self {
        self.hit.user_id = Some(user_id.into());
        self
    }

    pub fn set_data_source(&mut self, source: impl Into<String>) -> &mut Self {
        self.hit.data_source = Some(source.into());
        self
    }

    pub fn set_event_category(&mut self, category: impl Into<String>) -> &mut Self {
        self.hit.event_category = Some(category.into());
        self
    }

    pub fn set_event_action(&mut self, action: impl Into<String>) -> &mut Self {
        self.hit.event_action = Some(action.into());
        self
    }

    pub fn set_event_label(&mut self, label: impl Into<String>) -> &mut Self {
        self.hit.event_label = Some(label.into());
        self
    }

    pub fn set_event_value(&mut self, value: u64) -> &mut Self {
        self.hit.event_value = Some(value);
        self
    }

    pub fn set_non_interaction(&mut self, non_interaction: bool) -> &mut Self {
        self.hit.non_interaction = non_interaction;
        self
    }

    /// Sets custom dimension `index` (1..=200). Out-of-range indexes are
    /// reported when the hit is sent.
    pub fn set_custom_dimension(
        &mut self,
        index: u8,
        value: impl Into<String>,
    ) -> &mut Self {
        self.hit.custom_dimensions.insert(index, value.into());
        self
    }

    /// Sends the current hit as an event.
    ///
    /// A disabled client returns immediately with `sent == false` and
    /// never touches the transport.
    ///
    /// # Errors
    /// - [`AnalyticsError::Protocol`] — the hit is incomplete
    /// - [`AnalyticsError::Transport`] — delivery failed
    pub async fn send_event(&mut self) -> Result<AnalyticsResponse, AnalyticsError> {
        self.hit.hit_type = HitType::Event;

        if !self.settings.enabled {
            tracing::debug!(
                action = ?self.hit.event_action,
                "analytics disabled, event not sent"
            );
            return Ok(AnalyticsResponse::not_sent());
        }

        self.hit.bust_cache();
        let body = self.codec.encode(&self.hit)?;
        let request = HitRequest {
            url: self.settings.endpoint().url(),
            content_type: self.codec.content_type(),
            body,
        };

        let response = self.transport.send(request).await?;
        tracing::debug!(
            status = response.status,
            action = ?self.hit.event_action,
            "event sent"
        );

        Ok(AnalyticsResponse {
            sent: true,
            status: Some(response.status),
            body: response.body,
        })
    }
}
