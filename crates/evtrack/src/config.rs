//! Tracking configuration.
//!
//! Loaded from a TOML file, from `ANALYTICS_*` environment variables, or
//! both (file first, environment on top):
//!
//! ```toml
//! tracking_id = "UA-01234567-89"
//! http_uri_cid = "/gaid"
//! http_uri_sid = "/gasid"
//! session_id_dimension = 1
//!
//! [session]
//! cookie_name = "shop_session"
//! secure = true
//! ```

use std::path::Path;

use evtrack_analytics::AnalyticsSettings;
use evtrack_protocol::MAX_CUSTOM_DIMENSION;
use evtrack_session::SessionConfig;
use serde::{Deserialize, Serialize};

/// Errors raised while loading or checking a [`TrackingConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file couldn't be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The config file isn't valid TOML for this schema.
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment variable holds a value of the wrong shape.
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },

    /// The values parse but don't make sense together.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// TrackingConfig
// ---------------------------------------------------------------------------

/// Everything the tracking integration needs to know.
///
/// Every field has a default, so an empty TOML document is a valid (if
/// not very useful) configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Analytics property, e.g. `UA-01234567-89`.
    pub tracking_id: String,

    /// Measurement protocol version. Default `"1"`.
    pub protocol_version: String,

    /// Send hits over HTTPS. Default `true`.
    pub use_ssl: bool,

    /// When `false`, events are still dispatched but nothing is sent.
    pub is_enabled: bool,

    /// Ask the service to anonymize the visitor IP. Default `true`.
    pub anonymize_ip: bool,

    /// Attach the authenticated user's id (`uid`) to hits. Default `false`.
    pub send_user_id: bool,

    /// Session key the client identifier is stored under.
    pub client_id_session_key: String,

    /// Session key the session identifier is stored under.
    pub session_id_session_key: String,

    /// Path of the client-id endpoint. Empty disables the route.
    pub http_uri_cid: String,

    /// Path of the session-id endpoint. Empty (the default) disables the
    /// route.
    pub http_uri_sid: String,

    /// Custom dimension (1..=200) the session identifier is reported in.
    /// Unset means the session identifier is never sent.
    pub session_id_dimension: Option<u8>,

    /// Category for events that don't name one.
    pub default_event_category: String,

    /// Jobs the analytics worker may have queued before new ones are
    /// dropped.
    pub queue_capacity: usize,

    /// Send to the validation endpoint instead of the collector.
    pub debug: bool,

    /// Session cookie settings.
    pub session: SessionConfig,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            tracking_id: String::new(),
            protocol_version: "1".to_string(),
            use_ssl: true,
            is_enabled: true,
            anonymize_ip: true,
            send_user_id: false,
            client_id_session_key: "evtrack.client-id".to_string(),
            session_id_session_key: "evtrack.session-id".to_string(),
            http_uri_cid: "/gaid".to_string(),
            http_uri_sid: String::new(),
            session_id_dimension: None,
            default_event_category: "Events".to_string(),
            queue_capacity: 256,
            debug: false,
            session: SessionConfig::default(),
        }
    }
}

impl TrackingConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source =
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_toml_str(&source)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    /// Applies `ANALYTICS_*` overrides looked up through `lookup`.
    ///
    /// | Variable                     | Field           |
    /// |------------------------------|-----------------|
    /// | `ANALYTICS_TRACKING_ID`      | `tracking_id`   |
    /// | `ANALYTICS_PROTOCOL_VERSION` | `protocol_version` |
    /// | `ANALYTICS_USE_SSL`          | `use_ssl`       |
    /// | `ANALYTICS_ENABLED`          | `is_enabled`    |
    /// | `ANALYTICS_ANONYMIZE_IP`     | `anonymize_ip`  |
    /// | `ANALYTICS_SEND_USER_ID`     | `send_user_id`  |
    /// | `ANALYTICS_HTTP_URI_CID`     | `http_uri_cid`  |
    /// | `ANALYTICS_HTTP_URI_SID`     | `http_uri_sid`  |
    ///
    /// Booleans accept `true/false`, `1/0`, `yes/no` and `on/off`.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("ANALYTICS_TRACKING_ID") {
            self.tracking_id = value;
        }
        if let Some(value) = lookup("ANALYTICS_PROTOCOL_VERSION") {
            self.protocol_version = value;
        }
        if let Some(value) = lookup("ANALYTICS_HTTP_URI_CID") {
            self.http_uri_cid = value;
        }
        if let Some(value) = lookup("ANALYTICS_HTTP_URI_SID") {
            self.http_uri_sid = value;
        }

        let flags: [(&'static str, &mut bool); 4] = [
            ("ANALYTICS_USE_SSL", &mut self.use_ssl),
            ("ANALYTICS_ENABLED", &mut self.is_enabled),
            ("ANALYTICS_ANONYMIZE_IP", &mut self.anonymize_ip),
            ("ANALYTICS_SEND_USER_ID", &mut self.send_user_id),
        ];
        for (key, field) in flags {
            if let Some(value) = lookup(key) {
                *field = parse_flag(key, value)?;
            }
        }

        Ok(self)
    }

    /// Checks the values that can't be checked by parsing alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.is_enabled && self.tracking_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "tracking_id is required while tracking is enabled".into(),
            ));
        }
        for (name, path) in [
            ("http_uri_cid", &self.http_uri_cid),
            ("http_uri_sid", &self.http_uri_sid),
        ] {
            if !path.is_empty() && !path.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "{name} must start with '/', got {path:?}"
                )));
            }
        }
        if !self.http_uri_cid.is_empty() && self.http_uri_cid == self.http_uri_sid {
            return Err(ConfigError::Invalid(
                "http_uri_cid and http_uri_sid must differ".into(),
            ));
        }
        if let Some(index) = self.session_id_dimension {
            if index == 0 || index > MAX_CUSTOM_DIMENSION {
                return Err(ConfigError::Invalid(format!(
                    "session_id_dimension must be in 1..={MAX_CUSTOM_DIMENSION}, got {index}"
                )));
            }
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be > 0".into()));
        }
        Ok(())
    }

    /// The settings every analytics client is created with.
    pub fn analytics_settings(&self) -> AnalyticsSettings {
        AnalyticsSettings {
            tracking_id: self.tracking_id.clone(),
            protocol_version: self.protocol_version.clone(),
            use_ssl: self.use_ssl,
            enabled: self.is_enabled,
            anonymize_ip: self.anonymize_ip,
            debug: self.debug,
        }
    }
}

fn parse_flag(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn enabled() -> TrackingConfig {
        TrackingConfig {
            tracking_id: "UA-1".into(),
            ..TrackingConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = TrackingConfig::default();
        assert_eq!(config.protocol_version, "1");
        assert!(config.use_ssl && config.is_enabled && config.anonymize_ip);
        assert!(!config.send_user_id);
        assert_eq!(config.http_uri_cid, "/gaid");
        assert_eq!(config.http_uri_sid, "");
        assert_eq!(config.session_id_dimension, None);
    }

    #[test]
    fn test_from_toml_str_partial_keeps_defaults() {
        let config = TrackingConfig::from_toml_str(
            r#"
            tracking_id = "UA-9"
            http_uri_sid = "/gasid"
            session_id_dimension = 3

            [session]
            secure = true
            "#,
        )
        .unwrap();

        assert_eq!(config.tracking_id, "UA-9");
        assert_eq!(config.http_uri_sid, "/gasid");
        assert_eq!(config.http_uri_cid, "/gaid");
        assert_eq!(config.session_id_dimension, Some(3));
        assert!(config.session.secure);
        assert_eq!(config.session.cookie_name, "evtrack_session");
    }

    #[test]
    fn test_from_toml_str_wrong_type_is_parse_error() {
        let result = TrackingConfig::from_toml_str("use_ssl = \"sometimes\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let result = TrackingConfig::load("/definitely/not/here.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_with_env_overrides() {
        let config = TrackingConfig::default()
            .with_env(env(&[
                ("ANALYTICS_TRACKING_ID", "UA-42"),
                ("ANALYTICS_USE_SSL", "false"),
                ("ANALYTICS_ENABLED", "0"),
                ("ANALYTICS_SEND_USER_ID", "Yes"),
                ("ANALYTICS_HTTP_URI_CID", ""),
                ("ANALYTICS_HTTP_URI_SID", "/sid"),
            ]))
            .unwrap();

        assert_eq!(config.tracking_id, "UA-42");
        assert!(!config.use_ssl);
        assert!(!config.is_enabled);
        assert!(config.send_user_id);
        assert!(config.anonymize_ip);
        assert_eq!(config.http_uri_cid, "");
        assert_eq!(config.http_uri_sid, "/sid");
    }

    #[test]
    fn test_with_env_bad_flag_is_rejected() {
        let result =
            TrackingConfig::default().with_env(env(&[("ANALYTICS_USE_SSL", "maybe")]));

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: "ANALYTICS_USE_SSL", .. })
        ));
    }

    #[test]
    fn test_validate_requires_tracking_id_only_when_enabled() {
        assert!(TrackingConfig::default().validate().is_err());
        let disabled = TrackingConfig {
            is_enabled: false,
            ..TrackingConfig::default()
        };
        assert!(disabled.validate().is_ok());
        assert!(enabled().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases = [
            TrackingConfig {
                http_uri_cid: "gaid".into(),
                ..enabled()
            },
            TrackingConfig {
                http_uri_sid: "/gaid".into(),
                ..enabled()
            },
            TrackingConfig {
                session_id_dimension: Some(0),
                ..enabled()
            },
            TrackingConfig {
                session_id_dimension: Some(201),
                ..enabled()
            },
            TrackingConfig {
                queue_capacity: 0,
                ..enabled()
            },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "{config:?} should be invalid"
            );
        }
    }

    #[test]
    fn test_analytics_settings_maps_fields() {
        let config = TrackingConfig {
            use_ssl: false,
            is_enabled: false,
            debug: true,
            ..enabled()
        };
        let settings = config.analytics_settings();

        assert_eq!(settings.tracking_id, "UA-1");
        assert!(!settings.use_ssl);
        assert!(!settings.enabled);
        assert!(settings.debug);
        assert!(settings.anonymize_ip);
    }
}
