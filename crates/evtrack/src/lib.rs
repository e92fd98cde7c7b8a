//! # evtrack
//!
//! Server-side analytics events for axum apps.
//!
//! The browser's analytics tag knows who the visitor is (a client id and a
//! session id); the server knows what they just did (paid an order, signed
//! up). evtrack joins the two:
//!
//! 1. Two POST routes store the browser's identifiers in the visitor's
//!    session ([`client_id_script`](EventTracking::client_id_script)
//!    renders the `<script>` that calls them)
//! 2. Handlers broadcast events through the [`Tracker`] extractor
//! 3. A background worker sends each event to the measurement protocol,
//!    attributed to the stored identifiers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use evtrack::prelude::*;
//!
//! struct OrderWasPaid;
//! impl ShouldBroadcastToAnalytics for OrderWasPaid {}
//!
//! async fn checkout(tracker: Tracker) -> &'static str {
//!     tracker.broadcast(OrderWasPaid);
//!     "thanks"
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TrackingConfig::from_env()?;
//! let tracking = EventTrackingBuilder::new(config).start(HttpTransport::new()?)?;
//!
//! let app = axum::Router::new().route("/checkout", axum::routing::post(checkout));
//! let app = tracking.register(app, MemoryStore::default());
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod registration;
mod routes;
mod session_layer;
mod snippet;

pub use config::{ConfigError, TrackingConfig};
pub use error::EvtrackError;
pub use registration::{
    EventTracking, EventTrackingBuilder, Tracker, TrackingContext, UserId,
};
pub use routes::{MAX_ID_LENGTH, ValidationError};
pub use snippet::client_id_script;

/// Everything an app needs to wire up tracking and broadcast events.
pub mod prelude {
    pub use crate::{
        EventTracking, EventTrackingBuilder, EvtrackError, Tracker,
        TrackingConfig, UserId,
    };
    pub use evtrack_analytics::{
        Analytics, EventContext, Listener, ShouldBroadcastToAnalytics,
    };
    pub use evtrack_protocol::Hit;
    pub use evtrack_session::{MemoryStore, SessionConfig, SessionStore};
    pub use evtrack_transport::{HttpTransport, RecordingTransport, Transport};
}
