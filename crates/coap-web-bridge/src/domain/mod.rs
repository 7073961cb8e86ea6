//! Domain layer for coap-web-bridge.
//!
//! Pure types with no I/O: configuration, the LED state, and the request /
//! outcome values that flow through one bridged exchange.
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, `UdpSocket` or `axum` types
//! - Environment variable or file reads
//! - Anything that could block or fail due to external state

pub mod config;
pub mod messages;

pub use config::{BridgeConfig, DeviceEndpoint};
pub use messages::{
    BridgeMethod, BridgeOutcome, BridgeRequest, ConnectivityReport, DeviceMethod, DeviceRequest,
    HealthReport, LedState,
};
