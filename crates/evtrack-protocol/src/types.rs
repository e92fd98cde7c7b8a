//! Core protocol types for measurement-protocol hits.
//!
//! A "hit" is one request to the measurement API: a flat list of short
//! parameter names (`v`, `tid`, `cid`, ...) and string values. The types
//! here give those parameters names and types on the Rust side, and
//! [`Hit::parameters`] / [`Hit::from_parameters`] convert between the two.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Highest custom dimension index the measurement API accepts (`cd1`..`cd200`).
pub const MAX_CUSTOM_DIMENSION: u8 = 200;

/// Length of the random cache buster appended to each hit.
const CACHE_BUSTER_LEN: usize = 8;

// ---------------------------------------------------------------------------
// HitType
// ---------------------------------------------------------------------------

/// The kind of interaction a hit reports (the `t` parameter).
///
/// evtrack itself only sends [`HitType::Event`], but the other types are
/// accepted so that hits built by applications (or decoded from recorded
/// traffic) round-trip without loss.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum HitType {
    /// A page was viewed.
    Pageview,
    /// An app screen was viewed.
    Screenview,
    /// A user or application event (category/action/label/value).
    #[default]
    Event,
    /// A caught exception.
    Exception,
    /// A user timing measurement.
    Timing,
}

impl HitType {
    /// Returns the wire value of the `t` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pageview => "pageview",
            Self::Screenview => "screenview",
            Self::Event => "event",
            Self::Exception => "exception",
            Self::Timing => "timing",
        }
    }
}

impl fmt::Display for HitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HitType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pageview" => Ok(Self::Pageview),
            "screenview" => Ok(Self::Screenview),
            "event" => Ok(Self::Event),
            "exception" => Ok(Self::Exception),
            "timing" => Ok(Self::Timing),
            other => {
                Err(ProtocolError::Decode(format!("unknown hit type `{other}`")))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// Where hits are sent.
///
/// The measurement API lives on one host; the only choices are the scheme
/// (plain HTTP or HTTPS) and whether to use the validation ("debug")
/// endpoint, which answers with a JSON report instead of recording the hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Use `https://` instead of `http://`.
    pub use_ssl: bool,
    /// Send to `/debug/collect` instead of `/collect`.
    pub debug: bool,
}

impl Endpoint {
    const HOST: &'static str = "www.google-analytics.com";

    /// Returns the full URL hits are POSTed to.
    pub fn url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        let path = if self.debug { "/debug/collect" } else { "/collect" };
        format!("{scheme}://{}{path}", Self::HOST)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            use_ssl: true,
            debug: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Hit
// ---------------------------------------------------------------------------

/// One measurement-protocol request.
///
/// Field → parameter mapping:
///
/// ```text
/// protocol_version  v      tracking_id   tid    client_id   cid
/// user_id           uid    hit_type      t      anonymize_ip aip
/// data_source       ds     non_interaction ni   event_*     ec/ea/el/ev
/// custom_dimensions cd<N>  cache_buster  z
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    pub protocol_version: String,
    pub tracking_id: String,
    pub hit_type: HitType,
    pub client_id: Option<String>,
    pub user_id: Option<String>,
    pub anonymize_ip: bool,
    pub data_source: Option<String>,
    pub non_interaction: bool,
    pub event_category: Option<String>,
    pub event_action: Option<String>,
    pub event_label: Option<String>,
    pub event_value: Option<u64>,
    /// Custom dimensions keyed by index (1..=200). A `BTreeMap` keeps the
    /// encoded parameter order stable.
    pub custom_dimensions: BTreeMap<u8, String>,
    /// Random value that stops intermediaries from caching the request.
    /// The API ignores it; it must be the last parameter.
    pub cache_buster: Option<String>,
}

impl Default for Hit {
    fn default() -> Self {
        Self {
            protocol_version: "1".to_string(),
            tracking_id: String::new(),
            hit_type: HitType::Event,
            client_id: None,
            user_id: None,
            anonymize_ip: false,
            data_source: None,
            non_interaction: false,
            event_category: None,
            event_action: None,
            event_label: None,
            event_value: None,
            custom_dimensions: BTreeMap::new(),
            cache_buster: None,
        }
    }
}

impl Hit {
    /// Checks the hit against the measurement API's required parameters.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidHit`] when:
    /// - the protocol version or tracking id is empty,
    /// - neither a client id nor a user id is set,
    /// - an event hit lacks a category or an action,
    /// - a custom dimension index is outside `1..=200`.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.protocol_version.is_empty() {
            return Err(ProtocolError::InvalidHit(
                "protocol version is required".into(),
            ));
        }
        if self.tracking_id.is_empty() {
            return Err(ProtocolError::InvalidHit(
                "tracking id is required".into(),
            ));
        }
        if is_blank(&self.client_id) && is_blank(&self.user_id) {
            return Err(ProtocolError::InvalidHit(
                "either a client id or a user id is required".into(),
            ));
        }
        if self.hit_type == HitType::Event {
            if is_blank(&self.event_category) {
                return Err(ProtocolError::InvalidHit(
                    "event category is required for event hits".into(),
                ));
            }
            if is_blank(&self.event_action) {
                return Err(ProtocolError::InvalidHit(
                    "event action is required for event hits".into(),
                ));
            }
        }
        if let Some(index) = self
            .custom_dimensions
            .keys()
            .find(|i| **i == 0 || **i > MAX_CUSTOM_DIMENSION)
        {
            return Err(ProtocolError::InvalidHit(format!(
                "custom dimension index {index} out of range 1..={MAX_CUSTOM_DIMENSION}"
            )));
        }
        Ok(())
    }

    /// Sets a fresh random cache buster.
    pub fn bust_cache(&mut self) {
        let mut rng = rand::rng();
        let buster: String = (0..CACHE_BUSTER_LEN)
            .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
            .collect();
        self.cache_buster = Some(buster);
    }

    /// Returns the hit as an ordered list of `(name, value)` parameters.
    ///
    /// Unset optional fields are omitted; boolean flags are only emitted
    /// when true (as `1`). The cache buster always comes last.
    pub fn parameters(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = Vec::with_capacity(16);
        let mut push = |name: &str, value: &str| {
            params.push((name.to_string(), value.to_string()));
        };

        push("v", &self.protocol_version);
        push("tid", &self.tracking_id);
        if self.anonymize_ip {
            push("aip", "1");
        }
        if let Some(ds) = &self.data_source {
            push("ds", ds);
        }
        if let Some(cid) = &self.client_id {
            push("cid", cid);
        }
        if let Some(uid) = &self.user_id {
            push("uid", uid);
        }
        push("t", self.hit_type.as_str());
        if self.non_interaction {
            push("ni", "1");
        }
        if let Some(ec) = &self.event_category {
            push("ec", ec);
        }
        if let Some(ea) = &self.event_action {
            push("ea", ea);
        }
        if let Some(el) = &self.event_label {
            push("el", el);
        }
        if let Some(ev) = self.event_value {
            push("ev", &ev.to_string());
        }
        for (index, value) in &self.custom_dimensions {
            push(&format!("cd{index}"), value);
        }
        if let Some(z) = &self.cache_buster {
            push("z", z);
        }

        params
    }

    /// Rebuilds a hit from `(name, value)` parameters.
    ///
    /// Unknown parameters are ignored, so hits recorded from newer clients
    /// still decode.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] for an unknown hit type, a
    /// non-numeric event value, or a malformed custom dimension name.
    pub fn from_parameters<I, K, V>(params: I) -> Result<Self, ProtocolError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut hit = Hit {
            protocol_version: String::new(),
            ..Hit::default()
        };

        for (name, value) in params {
            let value: String = value.into();
            match name.as_ref() {
                "v" => hit.protocol_version = value,
                "tid" => hit.tracking_id = value,
                "aip" => hit.anonymize_ip = value == "1",
                "ds" => hit.data_source = Some(value),
                "cid" => hit.client_id = Some(value),
                "uid" => hit.user_id = Some(value),
                "t" => hit.hit_type = value.parse()?,
                "ni" => hit.non_interaction = value == "1",
                "ec" => hit.event_category = Some(value),
                "ea" => hit.event_action = Some(value),
                "el" => hit.event_label = Some(value),
                "ev" => {
                    let parsed = value.parse::<u64>().map_err(|_| {
                        ProtocolError::Decode(format!(
                            "event value `{value}` is not a non-negative integer"
                        ))
                    })?;
                    hit.event_value = Some(parsed);
                }
                "z" => hit.cache_buster = Some(value),
                other => {
                    if let Some(index) = other.strip_prefix("cd") {
                        let index = index.parse::<u8>().map_err(|_| {
                            ProtocolError::Decode(format!(
                                "malformed custom dimension `{other}`"
                            ))
                        })?;
                        hit.custom_dimensions.insert(index, value);
                    }
                }
            }
        }

        Ok(hit)
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

// =========================================================================
// Tests
// =========================================================================
