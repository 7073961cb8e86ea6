//! coap-web-bridge library crate.
//!
//! Lets a web browser control an LED on a CoAP device (an ESP32) by turning
//! plain HTTP requests into confirmable CoAP requests and relaying the
//! device's reply.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Browser (HTTP + JSON)
//!         ↕
//! [coap-web-bridge]
//!   ├── domain/            Pure types: BridgeConfig, LedState, request/outcome values
//!   ├── application/       Bridge service, device-vs-timer race, error taxonomy
//!   └── infrastructure/
//!         ├── http_server/   axum routes, CORS, graceful shutdown
//!         ├── coap_transport/ CoAP over UDP (coap-core codec)
//!         └── config_file/   optional TOML settings
//!         ↕
//! ESP32 (CoAP over UDP, port 5683, resource /led)
//! ```
//!
//! # Layer rules
//!
//! - `domain` performs no I/O and knows nothing about async runtimes.
//! - `application` depends on `domain` and reaches the device only through
//!   the [`DeviceTransport`](application::DeviceTransport) trait.
//! - `infrastructure` depends on all other layers plus `tokio`, `axum` and
//!   `coap-core`.
//!
//! # For beginners: why a trait for the device?
//!
//! The bridge's interesting rules (validate, race against a timeout, map the
//! first event to a status code) do not care whether the device is a real
//! ESP32 or a test double.  Putting the device behind a trait lets the tests
//! exercise those rules with mocks and a paused clock, with no network.

/// Domain layer: pure types (no I/O).
pub mod domain;

/// Application layer: request handling and the timeout race.
pub mod application;

/// Infrastructure layer: HTTP server, CoAP transport, config file.
pub mod infrastructure;
