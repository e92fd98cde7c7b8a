//! Analytics client and event relay for evtrack.
//!
//! # Key types
//!
//! - [`Analytics`] — fluent measurement-protocol client
//! - [`ShouldBroadcastToAnalytics`] — the trait application events implement
//! - [`BroadcastEvent`] — turns one event plus a visitor context into a hit
//! - [`Events`] — the listener table events are dispatched through
//! - [`DispatchAnalyticsJob`] — listener that hands events to the job worker
//!
//! # Flow
//!
//! ```text
//! Events::dispatch(event, ctx)
//!   → DispatchAnalyticsJob  (captures ctx, enqueues SendEventToAnalytics)
//!   → worker task           (one job at a time)
//!   → BroadcastEvent::handle → Analytics::send_event → Transport
//! ```

#![allow(async_fn_in_trait)]

mod broadcaster;
mod client;
mod error;
mod events;
mod job;
mod listeners;
mod settings;

pub use broadcaster::{BroadcastEvent, EventBroadcaster, EventContext};
pub use client::{Analytics, AnalyticsResponse};
pub use error::AnalyticsError;
pub use events::ShouldBroadcastToAnalytics;
pub use job::{DispatchAnalyticsJob, JobQueue, SendEventToAnalytics, spawn_worker};
pub use listeners::{Events, Listener};
pub use settings::AnalyticsSettings;
