//! The two identifier endpoints.
//!
//! `POST <http_uri_cid>` and `POST <http_uri_sid>` take a single field,
//! `id`, as JSON (`{"id": "…"}`) or as a urlencoded form, validate it as
//! `required|string|max:255`, and store it in the visitor's session. When
//! the body has no `id`, the query string is consulted; a repeated key
//! keeps its last value.
//!
//! | Outcome  | Status | Body                                          |
//! |----------|--------|-----------------------------------------------|
//! | stored   | 200    | `[]`                                          |
//! | rejected | 422    | `{"message": "…", "errors": {"id": ["…"]}}`   |

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::RawQuery;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use evtrack_session::{
    ClientIdRepository, ClientIdSession, Session, SessionIdRepository,
    SessionIdSession,
};
use serde_json::{Value, json};

use crate::registration::TrackingContext;

/// Longest identifier accepted, in characters.
pub const MAX_ID_LENGTH: usize = 255;

const ID_FIELD: &str = "id";

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// Why a posted identifier was refused. Rendered as a `422` response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("The {0} field is required.")]
    Required(&'static str),

    #[error("The {0} must be a string.")]
    NotString(&'static str),

    #[error("The {field} must not be greater than {max} characters.")]
    TooLong { field: &'static str, max: usize },
}

impl ValidationError {
    /// The request field the error is about.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Required(field) | Self::NotString(field) => field,
            Self::TooLong { field, .. } => field,
        }
    }
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let body = json!({
            "message": message,
            "errors": { self.field(): [message] },
        });
        (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `POST <http_uri_cid>`: stores the visitor's client identifier.
pub(crate) async fn store_client_id(
    Extension(context): Extension<Arc<TrackingContext>>,
    Extension(session): Extension<Session>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ValidationError> {
    let id = validated_id(&headers, query.as_deref(), &body)?;
    let key = &context.config().client_id_session_key;
    ClientIdSession::new(session, key.as_str()).update(&id);
    tracing::debug!(chars = id.chars().count(), "client id stored");
    Ok(empty_json())
}

/// `POST <http_uri_sid>`: stores the visitor's session identifier.
pub(crate) async fn store_session_id(
    Extension(context): Extension<Arc<TrackingContext>>,
    Extension(session): Extension<Session>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ValidationError> {
    let id = validated_id(&headers, query.as_deref(), &body)?;
    let key = &context.config().session_id_session_key;
    SessionIdSession::new(session, key.as_str()).update(&id);
    tracing::debug!(chars = id.chars().count(), "session id stored");
    Ok(empty_json())
}

fn empty_json() -> Json<Value> {
    Json(Value::Array(Vec::new()))
}

// ---------------------------------------------------------------------------
// Input parsing & validation
// ---------------------------------------------------------------------------

fn validated_id(
    headers: &HeaderMap,
    query: Option<&str>,
    body: &[u8],
) -> Result<String, ValidationError> {
    let id = id_field(headers, body).or_else(|| query.and_then(query_id));
    validate_id(id.as_ref())
}

/// The last `id` in a urlencoded string.
fn form_id(input: &[u8]) -> Option<Value> {
    url::form_urlencoded::parse(input)
        .filter(|(key, _)| key == ID_FIELD)
        .last()
        .map(|(_, value)| Value::String(value.into_owned()))
}

fn query_id(query: &str) -> Option<Value> {
    form_id(query.as_bytes())
}

/// Pulls `id` out of a form or JSON body. Unparseable bodies yield `None`.
fn id_field(headers: &HeaderMap, body: &[u8]) -> Option<Value> {
    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        return form_id(body);
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(mut fields)) => fields.remove(ID_FIELD),
        Ok(_) => None,
        Err(e) => {
            if !body.is_empty() {
                tracing::debug!(error = %e, "request body is not JSON");
            }
            None
        }
    }
}

/// `required|string|max:255`.
fn validate_id(value: Option<&Value>) -> Result<String, ValidationError> {
    match value {
        None | Some(Value::Null) => Err(ValidationError::Required(ID_FIELD)),
        Some(Value::Array(items)) if items.is_empty() => {
            Err(ValidationError::Required(ID_FIELD))
        }
        Some(Value::String(id)) if id.trim().is_empty() => {
            Err(ValidationError::Required(ID_FIELD))
        }
        Some(Value::String(id)) if id.chars().count() > MAX_ID_LENGTH => {
            Err(ValidationError::TooLong {
                field: ID_FIELD,
                max: MAX_ID_LENGTH,
            })
        }
        Some(Value::String(id)) => Ok(id.clone()),
        Some(_) => Err(ValidationError::NotString(ID_FIELD)),
    }
}
