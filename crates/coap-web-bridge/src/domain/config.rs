//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It is built once at startup (from CLI arguments, environment variables and
//! an optional TOML file, see `main.rs`) and never mutated afterwards.
//!
//! Keeping configuration as a plain struct, with no global constants and no
//! environment reads inside the domain, lets tests point the bridge at a mock
//! device on an ephemeral port.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Default device address (the ESP32 on the lab network).
pub const DEFAULT_DEVICE_HOST: &str = "10.182.252.187";

/// Default CoAP resource controlling the LED.
pub const DEFAULT_DEVICE_PATH: &str = "/led";

/// Default HTTP listener port.
pub const DEFAULT_HTTP_PORT: u16 = 3000;

/// How long a bridged request waits for the device before answering 504.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

/// Where the single controlled device lives.
///
/// # Example
///
/// ```rust
/// use coap_web_bridge::domain::DeviceEndpoint;
///
/// let device = DeviceEndpoint::new("192.168.1.40", 5683, "/led");
/// assert_eq!(device.uri(), "coap://192.168.1.40:5683/led");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEndpoint {
    /// IP address or hostname of the device.
    pub host: String,
    /// UDP port of the device's CoAP server.
    pub port: u16,
    /// Resource path of the LED, e.g. `/led`.
    pub path: String,
}

impl DeviceEndpoint {
    pub fn new(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            path: path.into(),
        }
    }

    /// The endpoint as a `coap://` URI, for log messages.
    pub fn uri(&self) -> String {
        format!("coap://{}:{}{}", self.host, self.port, self.path)
    }
}

impl Default for DeviceEndpoint {
    fn default() -> Self {
        Self::new(
            DEFAULT_DEVICE_HOST,
            coap_core::protocol::messages::DEFAULT_PORT,
            DEFAULT_DEVICE_PATH,
        )
    }
}

impl fmt::Display for DeviceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// All runtime configuration for the HTTP bridge.
///
/// Build this struct once at startup and wrap it in an `Arc` so every
/// request handler can read it without copying.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address the HTTP server binds to.
    pub http_bind_addr: SocketAddr,

    /// The device every request is forwarded to.
    pub device: DeviceEndpoint,

    /// Maximum time to wait for the device's reply to one request.
    pub timeout: Duration,

    /// Directory of static browser assets served for unmatched GET paths.
    /// `None` runs the bridge as a pure API.
    pub public_dir: Option<PathBuf>,
}

impl Default for BridgeConfig {
    /// | Field          | Default                          |
    /// |----------------|----------------------------------|
    /// | http_bind_addr | `0.0.0.0:3000`                   |
    /// | device         | `coap://10.182.252.187:5683/led` |
    /// | timeout        | 3000 ms                          |
    /// | public_dir     | none                             |
    fn default() -> Self {
        Self {
            http_bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_HTTP_PORT)),
            device: DeviceEndpoint::default(),
            timeout: DEFAULT_TIMEOUT,
            public_dir: None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_http_port_is_3000() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.http_bind_addr.port(), 3000);
    }

    #[test]
    fn test_default_device_uses_standard_coap_port() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.device.port, 5683);
        assert_eq!(cfg.device.path, "/led");
    }

    #[test]
    fn test_default_timeout_is_3s() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.timeout, Duration::from_millis(3000));
    }

    #[test]
    fn test_default_serves_no_static_assets() {
        assert!(BridgeConfig::default().public_dir.is_none());
    }

    #[test]
    fn test_device_endpoint_display_is_coap_uri() {
        let device = DeviceEndpoint::new("esp32.local", 5684, "/led");
        assert_eq!(device.to_string(), "coap://esp32.local:5684/led");
    }
}
