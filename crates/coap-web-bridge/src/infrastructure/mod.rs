//! Infrastructure layer for coap-web-bridge.
//!
//! All I/O lives here: the HTTP listener that browsers talk to, the UDP
//! sockets used to reach the device, and reading the optional config file.
//!
//! # What does NOT belong here?
//!
//! - Timeout and response-mapping rules (application layer)
//! - Message type definitions (domain layer)
//! - Command-line parsing (done in the binaries)

pub mod coap_transport;
pub mod config_file;
pub mod http_server;

pub use coap_transport::CoapTransport;
pub use http_server::{build_router, run_server};
