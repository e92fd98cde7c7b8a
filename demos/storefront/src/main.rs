use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use evtrack::prelude::*;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

struct OrderWasPaid {
    total_cents: u64,
}

impl ShouldBroadcastToAnalytics for OrderWasPaid {
    fn event_category(&self) -> Option<String> {
        Some("orders".into())
    }

    fn with_analytics(&self, hit: &mut Hit) {
        hit.event_value = Some(self.total_cents);
    }
}

struct CartViewed;
impl ShouldBroadcastToAnalytics for CartViewed {}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct Checkout {
    total_cents: u64,
}

async fn index(State(page): State<Arc<str>>) -> Html<String> {
    Html(page.to_string())
}

async fn cart(tracker: Tracker) -> &'static str {
    tracker.broadcast(CartViewed);
    "your cart is empty"
}

async fn checkout(tracker: Tracker, Json(order): Json<Checkout>) -> &'static str {
    if tracker.client_id().is_none() {
        tracing::info!("checkout from a visitor without a client id");
    }
    tracker.broadcast(OrderWasPaid {
        total_cents: order.total_cents,
    });
    "thanks for your order"
}

fn page(tracking_id: &str, script: &str) -> String {
    format!(
        r#"<!doctype html>
<html>
<head>
<script async src="https://www.googletagmanager.com/gtag/js?id={tracking_id}"></script>
<script>
  window.dataLayer = window.dataLayer || [];
  function gtag() {{ dataLayer.push(arguments); }}
  gtag('js', new Date());
  gtag('config', '{tracking_id}');
</script>
{script}</head>
<body><h1>Storefront</h1></body>
</html>
"#
    )
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,evtrack=debug".into()),
        )
        .init();

    let mut config = match std::env::var("EVTRACK_CONFIG") {
        Ok(path) => TrackingConfig::load(path)?.with_env(|key| std::env::var(key).ok())?,
        Err(_) => TrackingConfig::from_env()?,
    };
    if config.http_uri_sid.is_empty() {
        config.http_uri_sid = "/gasid".into();
    }
    if config.tracking_id.is_empty() {
        tracing::warn!("ANALYTICS_TRACKING_ID not set, events will not be sent");
        config.is_enabled = false;
    }

    let tracking = EventTrackingBuilder::new(config).start(HttpTransport::new()?)?;

    let store = MemoryStore::from_config(&tracking.config().session);
    let sweeper = store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = sweeper.expire_stale().await;
            if removed > 0 {
                tracing::debug!(removed, "expired idle sessions");
            }
        }
    });

    let page: Arc<str> =
        page(&tracking.config().tracking_id, &tracking.client_id_script()).into();
    let shop = Router::new()
        .route("/", get(index))
        .route("/cart", get(cart))
        .route("/checkout", post(checkout))
        .with_state(page);
    let app = tracking.register(shop, store);

    let addr = std::env::var("STOREFRONT_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "storefront listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    tracking.shutdown().await;
    Ok(())
}
