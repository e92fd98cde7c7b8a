//! Codec trait and implementations for hit request bodies.
//!
//! A "codec" (coder/decoder) converts between a [`Hit`] and the raw bytes
//! of a request body. The analytics client doesn't care HOW the body is
//! laid out — it only needs something that implements [`Codec`]. The
//! measurement API takes `application/x-www-form-urlencoded`, so
//! [`FormCodec`] is the one implementation shipped today.

use crate::{Hit, ProtocolError};

/// Encodes hits into request bodies and decodes them back.
///
/// `Send + Sync + 'static` because a codec is owned by the analytics
/// client, which is moved into the background job worker.
pub trait Codec: Send + Sync + 'static {
    /// The `Content-Type` header value for bodies produced by this codec.
    fn content_type(&self) -> &'static str;

    /// Validates and serializes a hit.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidHit`] if [`Hit::validate`] rejects
    /// the hit. Nothing is encoded in that case.
    fn encode(&self, hit: &Hit) -> Result<Vec<u8>, ProtocolError>;

    /// Parses a body back into a hit.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed.
    fn decode(&self, data: &[u8]) -> Result<Hit, ProtocolError>;
}

// ---------------------------------------------------------------------------
// FormCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that produces URL-encoded form bodies (`v=1&tid=...`).
///
/// ## Example
///
/// ```rust
/// use evtrack_protocol::{Codec, FormCodec, Hit};
///
/// let hit = Hit {
///     tracking_id: "UA-1".into(),
///     client_id: Some("35009a79".into()),
///     event_category: Some("shop".into()),
///     event_action: Some("checkout".into()),
///     ..Hit::default()
/// };
///
/// let body = FormCodec.encode(&hit).unwrap();
/// assert_eq!(body, b"v=1&tid=UA-1&cid=35009a79&t=event&ec=shop&ea=checkout");
///
/// let decoded = FormCodec.decode(&body).unwrap();
/// assert_eq!(decoded, hit);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FormCodec;

impl Codec for FormCodec {
    fn content_type(&self) -> &'static str {
        "application/x-www-form-urlencoded"
    }

    fn encode(&self, hit: &Hit) -> Result<Vec<u8>, ProtocolError> {
        hit.validate()?;
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(hit.parameters())
            .finish();
        Ok(body.into_bytes())
    }

    fn decode(&self, data: &[u8]) -> Result<Hit, ProtocolError> {
        if std::str::from_utf8(data).is_err() {
            return Err(ProtocolError::Decode("body is not valid UTF-8".into()));
        }
        Hit::from_parameters(
            url::form_urlencoded::parse(data)
                .map(|(k, v)| (k.into_owned(), v.into_owned())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit() -> Hit {
        Hit {
            tracking_id: "UA-1".into(),
            client_id: Some("a b&c".into()),
            event_category: Some("Orders".into()),
            event_action: Some("Order Paid".into()),
            ..Hit::default()
        }
    }

    #[test]
    fn test_form_codec_content_type() {
        assert_eq!(
            FormCodec.content_type(),
            "application/x-www-form-urlencoded"
        );
    }

    #[test]
    fn test_encode_escapes_reserved_characters() {
        let body = String::from_utf8(FormCodec.encode(&hit()).unwrap()).unwrap();
        assert!(body.contains("cid=a+b%26c"), "body was {body}");
        assert!(body.contains("ea=Order+Paid"), "body was {body}");
    }

    #[test]
    fn test_encode_rejects_invalid_hit() {
        let invalid = Hit {
            client_id: None,
            ..hit()
        };
        let result = FormCodec.encode(&invalid);
        assert!(matches!(result, Err(ProtocolError::InvalidHit(_))));
    }

    #[test]
    fn test_decode_restores_escaped_values() {
        let body = FormCodec.encode(&hit()).unwrap();
        let decoded = FormCodec.decode(&body).unwrap();
        assert_eq!(decoded.client_id.as_deref(), Some("a b&c"));
    }

    #[test]
    fn test_decode_non_utf8_fails() {
        let result = FormCodec.decode(&[0xff, 0xfe, b'=', b'1']);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
