//! Settings applied to every analytics client.

use evtrack_protocol::Endpoint;
use serde::{Deserialize, Serialize};

/// Settings shared by every [`Analytics`](crate::Analytics) instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsSettings {
    /// Property to report to, e.g. `UA-01234567-89`.
    pub tracking_id: String,

    /// Measurement protocol version (`v`). Default `"1"`.
    pub protocol_version: String,

    /// Send over HTTPS. Default `true`.
    pub use_ssl: bool,

    /// When `false`, hits are built but never sent. Default `true`.
    pub enabled: bool,

    /// Ask the service to drop the last octet of the visitor IP (`aip=1`).
    pub anonymize_ip: bool,

    /// Send to the validation endpoint instead of the real one.
    pub debug: bool,
}

impl AnalyticsSettings {
    /// Returns the endpoint hits are sent to.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            use_ssl: self.use_ssl,
            debug: self.debug,
        }
    }
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            tracking_id: String::new(),
            protocol_version: "1".to_string(),
            use_ssl: true,
            enabled: true,
            anonymize_ip: true,
            debug: false,
        }
    }
}
