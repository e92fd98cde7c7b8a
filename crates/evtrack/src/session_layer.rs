//! Cookie-backed session middleware.
//!
//! For every request:
//!   1. Read the session cookie and load the record from the store
//!   2. Start a fresh session when there is no cookie, the token is
//!      malformed, or the record is gone
//!   3. Put the [`Session`] into the request extensions for handlers
//!   4. After the handler ran, save the record (which also restarts its
//!      idle timer) and reissue the cookie. A fresh session the handler
//!      never wrote to is dropped instead, so cookieless traffic (404s,
//!      bots, health checks) leaves nothing in the store

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use evtrack_session::{Session, SessionConfig, SessionStore, SessionToken};

/// State of the session middleware: the store plus cookie settings.
pub(crate) struct SessionLayerState<S> {
    pub(crate) store: Arc<S>,
    pub(crate) config: Arc<SessionConfig>,
}

// Manual impl: `S` itself doesn't need to be `Clone`.
impl<S> Clone for SessionLayerState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}

pub(crate) async fn session_middleware<S: SessionStore>(
    State(state): State<SessionLayerState<S>>,
    mut req: Request,
    next: Next,
) -> Response {
    let session = match load_session(&state, req.headers()).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "failed to load session");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    req.extensions_mut().insert(session.clone());
    let mut response = next.run(req).await;

    // A session nobody wrote to never reaches the store or the browser.
    if session.is_new() && !session.is_dirty() {
        return response;
    }

    let token = session.token();
    if let Err(e) = state.store.save(&token, session.snapshot()).await {
        tracing::error!(%token, error = %e, "failed to save session");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    tracing::debug!(
        %token,
        new = session.is_new(),
        changed = session.is_dirty(),
        "session saved"
    );

    match HeaderValue::from_str(&session_cookie(&state.config, &token)) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => {
            tracing::warn!(error = %e, "session cookie not representable as a header");
        }
    }

    response
}

async fn load_session<S: SessionStore>(
    state: &SessionLayerState<S>,
    headers: &HeaderMap,
) -> Result<Session, evtrack_session::SessionError> {
    let token = cookie_value(headers, &state.config.cookie_name)
        .and_then(|value| SessionToken::parse(value).ok());

    let Some(token) = token else {
        return Ok(Session::start());
    };

    match state.store.load(&token).await? {
        Some(data) => Ok(Session::resume(token, data)),
        None => {
            tracing::debug!(%token, "session expired or unknown, starting a new one");
            Ok(Session::start())
        }
    }
}

/// Finds cookie `name` in the request's `Cookie` headers.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
}

fn session_cookie(config: &SessionConfig, token: &SessionToken) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        config.cookie_name,
        token.as_str(),
        config.lifetime_secs
    );
    if config.secure {
        cookie.push_str("; Secure");
    }
    cookie
}
