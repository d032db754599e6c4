//! Device configuration.
//!
//! Per-deployment values (ports, capacities, credentials, timeouts) are
//! external configuration, not core behavior. Defaults match the reference
//! hardware deployment.

use serde::{Deserialize, Serialize};

/// WiFi credentials: an SSID/passphrase pair.
///
/// Either compiled-in defaults or a pair persisted by the provisioning
/// portal. Mutated only by the portal's save action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiCredentials {
    /// Network name. An empty SSID means "not configured".
    pub ssid: String,
    /// Network passphrase (empty for open networks).
    pub password: String,
}

impl WifiCredentials {
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
        }
    }
}

/// Device configuration for one deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    /// Device name shown on the display and used for the setup AP.
    pub name: String,

    /// TCP port streaming (camera) clients connect to.
    pub stream_port: u16,

    /// TCP port control clients connect to.
    pub control_port: u16,

    /// Maximum simultaneous clients per port.
    pub max_clients: usize,

    /// Compiled-in station credentials, used when nothing is persisted.
    pub sta_credentials: WifiCredentials,

    /// SSID of the provisioning access point.
    pub ap_ssid: String,

    /// Wall-clock budget for one station connection attempt, in milliseconds.
    pub connect_timeout_ms: u64,

    /// Station attempts before falling back to the provisioning portal.
    pub max_connection_attempts: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "Rover32".to_string(),
            stream_port: 8000,
            control_port: 8001,
            max_clients: 5,
            sta_credentials: WifiCredentials::default(),
            ap_ssid: "Rover32_Setup".to_string(),
            connect_timeout_ms: 10_000,
            max_connection_attempts: 5,
        }
    }
}
