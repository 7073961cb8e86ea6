//! Types that flow through one bridged exchange.
//!
//! ```text
//! HTTP request ──► BridgeRequest ──► DeviceRequest ──► (CoAP)
//!                                                         │
//! HTTP response ◄── BridgeError / text ◄── BridgeOutcome ◄┘
//! ```
//!
//! Every type here lives for exactly one request.  The bridge keeps no
//! LED state between requests: the device is the only source of truth.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── LED state ─────────────────────────────────────────────────────────────────

/// The state of the device's LED.
///
/// The textual forms are exactly `"on"` and `"off"`: that is what browsers
/// send in `POST /led` and what the device expects as a PUT payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedState {
    On,
    Off,
}

impl LedState {
    pub fn as_str(self) -> &'static str {
        match self {
            LedState::On => "on",
            LedState::Off => "off",
        }
    }

    /// Lenient parse for text the *device* sent.
    ///
    /// Surrounding whitespace and quote characters are stripped and case is
    /// ignored, so `"ON"`, `'on'` and ` on\n` all map to [`LedState::On`].
    /// Input from HTTP clients goes through the strict [`FromStr`] instead.
    ///
    /// ```rust
    /// use coap_web_bridge::domain::LedState;
    ///
    /// assert_eq!(LedState::normalize("\"OFF\"\n"), Some(LedState::Off));
    /// assert_eq!(LedState::normalize("blinking"), None);
    /// ```
    pub fn normalize(raw: &str) -> Option<Self> {
        let cleaned: String = raw
            .trim()
            .chars()
            .filter(|c| *c != '"' && *c != '\'')
            .collect();
        match cleaned.trim().to_ascii_lowercase().as_str() {
            "on" => Some(LedState::On),
            "off" => Some(LedState::Off),
            _ => None,
        }
    }
}

impl fmt::Display for LedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a requested state is not exactly `"on"` or `"off"`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid LED state: {0:?}")]
pub struct InvalidLedState(pub String);

impl FromStr for LedState {
    type Err = InvalidLedState;

    /// Strict, case-sensitive parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(LedState::On),
            "off" => Ok(LedState::Off),
            other => Err(InvalidLedState(other.to_string())),
        }
    }
}

/// Extracts the raw `state` string from a `POST /led` body.
///
/// Returns `None` unless the body is a JSON object whose `state` field is a
/// string.  Whether that string is a *valid* state is decided later by the
/// bridge service.
///
/// ```rust
/// use coap_web_bridge::domain::messages::requested_state_from_body;
///
/// assert_eq!(requested_state_from_body(br#"{"state":"on"}"#), Some("on".to_string()));
/// assert_eq!(requested_state_from_body(br#"{"state":true}"#), None);
/// assert_eq!(requested_state_from_body(b"state=on"), None);
/// ```
pub fn requested_state_from_body(body: &[u8]) -> Option<String> {
    match serde_json::from_slice::<Value>(body).ok()? {
        Value::Object(mut fields) => match fields.remove("state")? {
            Value::String(state) => Some(state),
            _ => None,
        },
        _ => None,
    }
}

// ── Bridge request ────────────────────────────────────────────────────────────

/// The HTTP verb of an inbound LED request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeMethod {
    Get,
    Post,
}

/// One inbound HTTP call, as seen by the bridge service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeRequest {
    pub method: BridgeMethod,
    /// HTTP path the request arrived on, for logging.
    pub path: String,
    /// For `Post`: the state string exactly as the client sent it.
    pub requested_state: Option<String>,
}

impl BridgeRequest {
    /// `GET /led`
    pub fn read_led() -> Self {
        Self {
            method: BridgeMethod::Get,
            path: "/led".to_string(),
            requested_state: None,
        }
    }

    /// `POST /led` with `{"state": <state>}`.
    pub fn set_led(state: impl Into<String>) -> Self {
        Self {
            method: BridgeMethod::Post,
            path: "/led".to_string(),
            requested_state: Some(state.into()),
        }
    }
}

// ── Device request ────────────────────────────────────────────────────────────

/// CoAP method used towards the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMethod {
    Get,
    Put,
}

impl fmt::Display for DeviceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceMethod::Get => f.write_str("GET"),
            DeviceMethod::Put => f.write_str("PUT"),
        }
    }
}

/// One outbound message to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRequest {
    pub method: DeviceMethod,
    pub path: String,
    pub payload: Option<Vec<u8>>,
}

impl DeviceRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: DeviceMethod::Get,
            path: path.into(),
            payload: None,
        }
    }

    pub fn put(path: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            method: DeviceMethod::Put,
            path: path.into(),
            payload: Some(payload.into()),
        }
    }
}

// ── Outcome ───────────────────────────────────────────────────────────────────

/// Whichever of {device reply, device error, timeout} happened first.
///
/// Exactly one outcome is produced per [`BridgeRequest`]; it is the only
/// input to HTTP response mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeOutcome {
    /// Raw payload of the device's response.
    DeviceReply(Vec<u8>),
    /// Transport-level failure text.
    DeviceError(String),
    TimedOut,
}

// ── JSON bodies ───────────────────────────────────────────────────────────────

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub esp32_ip: String,
    pub coap_port: u16,
}

/// Body of `GET /test-esp32`.
///
/// Exactly one of `response` (when connected) and `error` (when not) is
/// present in the serialized JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityReport {
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub esp32_ip: String,
}

impl ConnectivityReport {
    pub fn connected(response: impl Into<String>, esp32_ip: impl Into<String>) -> Self {
        Self {
            connected: true,
            response: Some(response.into()),
            error: None,
            esp32_ip: esp32_ip.into(),
        }
    }

    pub fn disconnected(error: impl Into<String>, esp32_ip: impl Into<String>) -> Self {
        Self {
            connected: false,
            response: None,
            error: Some(error.into()),
            esp32_ip: esp32_ip.into(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_led_state_strict_parse_accepts_only_lowercase_literals() {
        assert_eq!("on".parse::<LedState>(), Ok(LedState::On));
        assert_eq!("off".parse::<LedState>(), Ok(LedState::Off));
        assert!("ON".parse::<LedState>().is_err());
        assert!(" on".parse::<LedState>().is_err());
        assert!("".parse::<LedState>().is_err());
    }

    #[test]
    fn test_led_state_normalize_strips_quotes_and_case() {
        assert_eq!(LedState::normalize("'On'"), Some(LedState::On));
        assert_eq!(LedState::normalize("  off \r\n"), Some(LedState::Off));
        assert_eq!(LedState::normalize("\" on \""), Some(LedState::On));
        assert_eq!(LedState::normalize("1"), None);
        assert_eq!(LedState::normalize(""), None);
    }

    #[test]
    fn test_led_state_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&LedState::Off).unwrap(), "\"off\"");
    }

    #[test]
    fn test_requested_state_rejects_non_string_and_missing_fields() {
        // Arrange
        let bodies: [&[u8]; 7] = [
            br#"{}"#,
            br#"{"state":1}"#,
            br#"{"state":null}"#,
            br#"{"state":["on"]}"#,
            br#"["on"]"#,
            br#""on""#,
            b"",
        ];

        // Act / Assert
        for body in bodies {
            assert_eq!(
                requested_state_from_body(body),
                None,
                "body {:?} must not yield a state",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn test_requested_state_passes_unknown_strings_through() {
        // Value validation is the service's job, not the body parser's.
        assert_eq!(
            requested_state_from_body(br#"{"state":"blink","extra":1}"#),
            Some("blink".to_string())
        );
    }

    #[test]
    fn test_connectivity_report_omits_absent_fields() {
        // Arrange
        let ok = ConnectivityReport::connected("on", "10.0.0.7");
        let down = ConnectivityReport::disconnected("Timeout - ESP32 not responding", "10.0.0.7");

        // Act
        let ok_json = serde_json::to_value(&ok).unwrap();
        let down_json = serde_json::to_value(&down).unwrap();

        // Assert
        assert_eq!(
            ok_json,
            serde_json::json!({"connected": true, "response": "on", "esp32_ip": "10.0.0.7"})
        );
        assert_eq!(
            down_json,
            serde_json::json!({
                "connected": false,
                "error": "Timeout - ESP32 not responding",
                "esp32_ip": "10.0.0.7"
            })
        );
    }

    #[test]
    fn test_device_request_constructors() {
        assert_eq!(DeviceRequest::get("/led").payload, None);
        let put = DeviceRequest::put("/led", "off");
        assert_eq!(put.method, DeviceMethod::Put);
        assert_eq!(put.payload, Some(b"off".to_vec()));
    }
}
