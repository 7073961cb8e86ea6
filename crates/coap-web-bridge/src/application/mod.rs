//! Application layer for coap-web-bridge.
//!
//! - [`transport`]: the [`DeviceTransport`] seam and its error type.
//! - [`outcome_race`]: the device-vs-timer race with single resolution.
//! - [`bridge_service`]: request validation, outcome mapping, the error
//!   taxonomy shown to HTTP clients.
//!
//! Nothing here opens a socket; the production transport lives in
//! `infrastructure`.

pub mod bridge_service;
pub mod outcome_race;
pub mod transport;

pub use bridge_service::{interpret_state_reply, BridgeError, BridgeService, PROBE_TIMEOUT_MESSAGE};
pub use outcome_race::{race_device_against_timer, ResolutionGuard};
pub use transport::{DeviceTransport, TransportError};
