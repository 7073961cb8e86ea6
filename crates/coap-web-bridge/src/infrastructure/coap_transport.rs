//! CoAP-over-UDP connection to the device.
//!
//! Each exchange opens its own UDP socket, connects it to the device, sends
//! one confirmable request and waits for the matching response.  The socket
//! is closed when the exchange future completes or is dropped.
//!
//! # Matching replies
//!
//! UDP gives no ordering or delivery guarantees, and the device may answer
//! in one of two ways (RFC 7252 §5.2):
//!
//! ```text
//! piggybacked:   CON GET [mid=7, tok=T] ──►
//!                                       ◄── ACK 2.05 [mid=7, tok=T] "on"
//!
//! separate:      CON GET [mid=7, tok=T] ──►
//!                                       ◄── ACK 0.00 [mid=7]
//!                                       ◄── CON 2.05 [mid=90, tok=T] "on"
//!                ACK 0.00 [mid=90]      ──►
//! ```
//!
//! Acknowledgements and resets are matched by message ID, and a piggybacked
//! response must also echo our token; separate responses are matched by
//! token.  Datagrams that match neither are logged and
//! skipped.
//!
//! # Not done here
//!
//! No retransmission and no timeout.  The caller races this exchange against
//! its own timer and drops it when the timer wins.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use async_trait::async_trait;
use tokio::net::{lookup_host, UdpSocket};
use tracing::{debug, warn};
use uuid::Uuid;

use coap_core::protocol::messages::content_format;
use coap_core::{decode_message, encode_message, Code, CoapMessage, MessageIdCounter, MessageType};

use crate::application::transport::{DeviceTransport, TransportError};
use crate::domain::{DeviceEndpoint, DeviceMethod, DeviceRequest};

/// Receive buffer size: the largest possible UDP payload, so a reply is
/// never truncated.
const RECV_BUFFER: usize = 64 * 1024;

/// Length of the random token attached to every request.
const TOKEN_LEN: usize = 4;

/// Production [`DeviceTransport`] speaking CoAP over UDP.
///
/// The message-ID counter is shared by all exchanges and starts at a random
/// value so that a restarted bridge does not reuse recent IDs.
#[derive(Debug)]
pub struct CoapTransport {
    message_ids: MessageIdCounter,
}

impl CoapTransport {
    pub fn new() -> Self {
        let seed = Uuid::new_v4();
        let bytes = seed.as_bytes();
        let message_ids = MessageIdCounter::starting_at(u16::from_be_bytes([bytes[0], bytes[1]]));
        debug!("CoAP message IDs start at {}", message_ids.current());
        Self::with_message_ids(message_ids)
    }

    /// Uses `message_ids` instead of a randomly seeded counter.
    pub fn with_message_ids(message_ids: MessageIdCounter) -> Self {
        Self { message_ids }
    }

    /// Runs one request/response exchange with `endpoint`.
    ///
    /// # Errors
    ///
    /// See [`TransportError`] for the failure modes.
    pub async fn exchange(
        &self,
        endpoint: &DeviceEndpoint,
        request: DeviceRequest,
    ) -> Result<Vec<u8>, TransportError> {
        let socket = connect(endpoint).await?;

        let message_id = self.message_ids.next();
        let token = fresh_token();
        let outbound = build_request(&request, message_id, &token);
        let bytes =
            encode_message(&outbound).map_err(|e| TransportError::Encode(e.to_string()))?;

        debug!(
            "sending CON {} {} (mid={message_id}, {} bytes)",
            request.method,
            endpoint.uri(),
            bytes.len()
        );
        socket
            .send(&bytes)
            .await
            .map_err(|e| socket_error(endpoint, e))?;

        let mut buf = vec![0u8; RECV_BUFFER];
        loop {
            let n = socket
                .recv(&mut buf)
                .await
                .map_err(|e| socket_error(endpoint, e))?;
            let reply =
                decode_message(&buf[..n]).map_err(|e| TransportError::Malformed(e.to_string()))?;

            match reply.message_type {
                MessageType::Reset if reply.message_id == message_id => {
                    return Err(TransportError::Reset { message_id });
                }
                MessageType::Acknowledgement if reply.message_id == message_id => {
                    if reply.is_empty() {
                        debug!("empty ACK for mid={message_id}; awaiting separate response");
                        continue;
                    }
                    if reply.token != token {
                        warn!("ACK for mid={message_id} carries a foreign token; skipped");
                        continue;
                    }
                    return Ok(accept_response(reply));
                }
                MessageType::Confirmable | MessageType::NonConfirmable
                    if reply.token == token && reply.code.is_response() =>
                {
                    if reply.message_type == MessageType::Confirmable {
                        acknowledge(&socket, reply.message_id).await;
                    }
                    return Ok(accept_response(reply));
                }
                _ => {
                    debug!(
                        "ignoring unrelated {:?} {} (mid={})",
                        reply.message_type, reply.code, reply.message_id
                    );
                }
            }
        }
    }
}

impl Default for CoapTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceTransport for CoapTransport {
    async fn send(
        &self,
        endpoint: DeviceEndpoint,
        request: DeviceRequest,
    ) -> Result<Vec<u8>, TransportError> {
        self.exchange(&endpoint, request).await
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Resolves the endpoint and returns a UDP socket connected to it.
///
/// Connecting lets the kernel report ICMP "port unreachable" back to us as
/// `ConnectionRefused` on the next send or receive.
async fn connect(endpoint: &DeviceEndpoint) -> Result<UdpSocket, TransportError> {
    let unreachable = |reason: String| TransportError::Unreachable {
        endpoint: endpoint.uri(),
        reason,
    };

    let addr = lookup_host((endpoint.host.as_str(), endpoint.port))
        .await
        .map_err(|e| unreachable(e.to_string()))?
        .next()
        .ok_or_else(|| unreachable("host resolved to no addresses".to_string()))?;

    let local: SocketAddr = if addr.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(local).await?;
    socket
        .connect(addr)
        .await
        .map_err(|e| socket_error(endpoint, e))?;
    Ok(socket)
}

fn build_request(request: &DeviceRequest, message_id: u16, token: &[u8]) -> CoapMessage {
    let code = match request.method {
        DeviceMethod::Get => Code::GET,
        DeviceMethod::Put => Code::PUT,
    };
    let mut msg = CoapMessage::confirmable_request(code, message_id, token);
    msg.set_uri_path(&request.path);
    if let Some(payload) = &request.payload {
        msg.set_content_format(content_format::TEXT_PLAIN);
        msg = msg.with_payload(payload.clone());
    }
    msg
}

fn accept_response(reply: CoapMessage) -> Vec<u8> {
    if reply.code.is_success() {
        debug!("device answered {} ({} bytes)", reply.code, reply.payload.len());
    } else {
        warn!("device answered {}", reply.code);
    }
    reply.payload
}

/// Confirms a separate response.  A lost ACK only makes the device
/// retransmit, so failures are logged and otherwise ignored.
async fn acknowledge(socket: &UdpSocket, message_id: u16) {
    match encode_message(&CoapMessage::empty_ack(message_id)) {
        Ok(ack) => {
            if let Err(e) = socket.send(&ack).await {
                warn!("failed to acknowledge separate response mid={message_id}: {e}");
            }
        }
        Err(e) => warn!("failed to encode ACK for mid={message_id}: {e}"),
    }
}

fn fresh_token() -> Vec<u8> {
    Uuid::new_v4().as_bytes()[..TOKEN_LEN].to_vec()
}

fn socket_error(endpoint: &DeviceEndpoint, e: io::Error) -> TransportError {
    match e.kind() {
        io::ErrorKind::ConnectionRefused => TransportError::Unreachable {
            endpoint: endpoint.uri(),
            reason: "port unreachable (no CoAP server listening)".to_string(),
        },
        _ => TransportError::Io(e),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
