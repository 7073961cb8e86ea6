//! The bridge request handler.
//!
//! [`BridgeService`] turns one inbound HTTP call into exactly one device
//! request, races it against the configured timeout, and maps whatever
//! happened first onto a response body or a [`BridgeError`].
//!
//! # Request flow
//!
//! ```text
//! BridgeRequest
//!   │ 1. validate requested state ("on" / "off", case-sensitive)
//!   │ 2. build DeviceRequest  (GET → CoAP GET, POST → CoAP PUT <state>)
//!   │ 3. race the device against the timer         (outcome_race)
//!   │ 4. map BridgeOutcome → Result<String, BridgeError>
//!   ▼
//! "on" | "off" | <raw confirmation> | BridgeError
//! ```
//!
//! The service holds no LED state: every read goes to the device.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::application::outcome_race::race_device_against_timer;
use crate::application::transport::DeviceTransport;
use crate::domain::{
    BridgeConfig, BridgeMethod, BridgeOutcome, BridgeRequest, ConnectivityReport, DeviceRequest,
    HealthReport, LedState,
};

/// Error text reported by `GET /test-esp32` when the device stays silent.
pub const PROBE_TIMEOUT_MESSAGE: &str = "Timeout - ESP32 not responding";

// ── Error type ────────────────────────────────────────────────────────────────

/// Why a bridged request did not succeed.
///
/// The `Display` text of each variant is the exact HTTP response body; the
/// status code comes from [`BridgeError::status_code`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The requested state was not exactly `"on"` or `"off"` (HTTP 400).
    #[error("Invalid state. Use \"on\" or \"off\"")]
    InvalidInput,

    /// The device did not answer within the timeout (HTTP 504).
    #[error("ESP32 timeout")]
    DeviceTimeout,

    /// The device exchange failed before the timeout (HTTP 500).
    #[error("CoAP Error: {0}")]
    DeviceError(String),

    /// The device answered a state read with something other than on/off
    /// (HTTP 502).
    #[error("Malformed ESP32 reply: {0}")]
    MalformedDeviceReply(String),
}

impl BridgeError {
    pub fn status_code(&self) -> u16 {
        match self {
            BridgeError::InvalidInput => 400,
            BridgeError::DeviceError(_) => 500,
            BridgeError::MalformedDeviceReply(_) => 502,
            BridgeError::DeviceTimeout => 504,
        }
    }
}

// ── Service ───────────────────────────────────────────────────────────────────

/// Handles bridged LED requests against one configured device.
///
/// Cheap to share: wrap it in an `Arc` and hand a clone to every HTTP
/// handler.
pub struct BridgeService {
    config: Arc<BridgeConfig>,
    transport: Arc<dyn DeviceTransport>,
}

impl BridgeService {
    pub fn new(config: Arc<BridgeConfig>, transport: Arc<dyn DeviceTransport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Handles one `GET /led` or `POST /led` call.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::InvalidInput`] before any device contact when a POST
    ///   carries anything but `"on"` / `"off"`.
    /// - [`BridgeError::DeviceTimeout`], [`BridgeError::DeviceError`] or
    ///   [`BridgeError::MalformedDeviceReply`] depending on how the device
    ///   exchange ended.
    pub async fn handle(&self, request: BridgeRequest) -> Result<String, BridgeError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("bridge", %request_id, path = %request.path);
        self.handle_inner(request).instrument(span).await
    }

    async fn handle_inner(&self, request: BridgeRequest) -> Result<String, BridgeError> {
        let device_request = self.device_request_for(&request)?;
        match request.method {
            BridgeMethod::Get => info!("read requested; forwarding GET to {}", self.config.device),
            BridgeMethod::Post => info!(
                "state change to {:?} requested; forwarding PUT to {}",
                request.requested_state.as_deref().unwrap_or_default(),
                self.config.device
            ),
        }

        let outcome = self.exchange(device_request).await;
        self.response_text(request.method, outcome)
    }

    /// Probes device reachability for `GET /test-esp32`.
    ///
    /// Never fails: every outcome becomes a [`ConnectivityReport`].
    pub async fn probe(&self) -> ConnectivityReport {
        let request_id = Uuid::new_v4();
        let span = info_span!("probe", %request_id);
        async {
            info!("testing connectivity to {}", self.config.device);
            let esp32_ip = self.config.device.host.clone();
            match self
                .exchange(DeviceRequest::get(self.config.device.path.clone()))
                .await
            {
                BridgeOutcome::DeviceReply(payload) => {
                    let response = String::from_utf8_lossy(&payload).into_owned();
                    info!("device reachable; replied {response:?}");
                    ConnectivityReport::connected(response, esp32_ip)
                }
                BridgeOutcome::DeviceError(message) => {
                    warn!("device unreachable: {message}");
                    ConnectivityReport::disconnected(message, esp32_ip)
                }
                BridgeOutcome::TimedOut => {
                    warn!("device did not answer the probe within {:?}", self.config.timeout);
                    ConnectivityReport::disconnected(PROBE_TIMEOUT_MESSAGE, esp32_ip)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Static configuration summary for `GET /health`.
    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "ok".to_string(),
            esp32_ip: self.config.device.host.clone(),
            coap_port: self.config.device.port,
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn device_request_for(&self, request: &BridgeRequest) -> Result<DeviceRequest, BridgeError> {
        let path = self.config.device.path.clone();
        match request.method {
            BridgeMethod::Get => Ok(DeviceRequest::get(path)),
            BridgeMethod::Post => {
                let raw = request.requested_state.as_deref().unwrap_or_default();
                let state: LedState = raw.parse().map_err(|_| {
                    warn!("rejected state {raw:?}");
                    BridgeError::InvalidInput
                })?;
                Ok(DeviceRequest::put(path, state.as_str()))
            }
        }
    }

    async fn exchange(&self, request: DeviceRequest) -> BridgeOutcome {
        race_device_against_timer(
            Arc::clone(&self.transport),
            self.config.device.clone(),
            request,
            self.config.timeout,
        )
        .await
    }

    fn response_text(
        &self,
        method: BridgeMethod,
        outcome: BridgeOutcome,
    ) -> Result<String, BridgeError> {
        match outcome {
            BridgeOutcome::DeviceReply(payload) => match method {
                BridgeMethod::Get => {
                    let state = interpret_state_reply(&payload)?;
                    info!("device reports LED {state}");
                    Ok(state.as_str().to_string())
                }
                BridgeMethod::Post => {
                    let confirmation = String::from_utf8_lossy(&payload).into_owned();
                    info!("device confirmed: {confirmation:?}");
                    Ok(confirmation)
                }
            },
            BridgeOutcome::DeviceError(message) => {
                error!("device exchange failed: {message}");
                Err(BridgeError::DeviceError(message))
            }
            BridgeOutcome::TimedOut => {
                error!(
                    "no reply from {} within {:?}; check that the ESP32 is powered, \
                     the IP address is correct and both hosts share a network",
                    self.config.device, self.config.timeout
                );
                Err(BridgeError::DeviceTimeout)
            }
        }
    }
}

/// Extracts the LED state from the device's answer to a GET.
///
/// A JSON object contributes its `state` field; a JSON string or any
/// non-JSON body is used as-is.  The candidate is then normalized with
/// [`LedState::normalize`].
pub fn interpret_state_reply(payload: &[u8]) -> Result<LedState, BridgeError> {
    let text = String::from_utf8_lossy(payload);
    let candidate = match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(fields)) => match fields.get("state") {
            Some(Value::String(state)) => state.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        },
        Ok(Value::String(state)) => state,
        _ => text.to_string(),
    };

    LedState::normalize(&candidate).ok_or_else(|| {
        warn!("device replied {text:?}, which is neither on nor off");
        BridgeError::MalformedDeviceReply(text.trim().to_string())
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
