//! The device transport seam.
//!
//! [`DeviceTransport`] is the only way the application layer talks to the
//! device.  Production code plugs in
//! [`CoapTransport`](crate::infrastructure::coap_transport::CoapTransport);
//! tests plug in mocks or small hand-written fakes.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{DeviceEndpoint, DeviceRequest};

/// Why a device exchange produced no response.
///
/// The `Display` text of each variant ends up verbatim in the HTTP body of a
/// `500 CoAP Error: <msg>` response, so keep it human-readable.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The device address could not be resolved, or the host answered with
    /// an ICMP "port unreachable".
    #[error("cannot reach {endpoint}: {reason}")]
    Unreachable { endpoint: String, reason: String },

    /// The device rejected the message with a CoAP Reset.
    #[error("device reset the exchange (message ID {message_id})")]
    Reset { message_id: u16 },

    /// The device sent a datagram that is not a valid CoAP message.
    #[error("malformed CoAP message from device: {0}")]
    Malformed(String),

    /// The outbound request could not be encoded.
    #[error("cannot encode CoAP request: {0}")]
    Encode(String),

    /// Any other socket failure.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}

/// Sends one request to the device and yields its raw response payload.
///
/// # Contract
///
/// - Resolves exactly once per call.
/// - Performs no retries and applies no timeout; the caller races the
///   returned future against its own timer and may drop it at any point.
/// - Any CoAP response code (2.xx, 4.xx, 5.xx) counts as a response.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    async fn send(
        &self,
        endpoint: DeviceEndpoint,
        request: DeviceRequest,
    ) -> Result<Vec<u8>, TransportError>;
}
