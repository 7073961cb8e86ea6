//! # coap-core
//!
//! Shared library for the CoAP LED bridge containing the Constrained
//! Application Protocol (CoAP, RFC 7252) message model and binary codec.
//!
//! This crate is used by the HTTP bridge and by the `led-ctl` command-line
//! tool.  It has zero dependencies on sockets, async runtimes, or HTTP
//! frameworks: it only turns bytes into typed messages and back.
//!
//! # Architecture overview (for beginners)
//!
//! CoAP is "HTTP for tiny devices".  It keeps the familiar request/response
//! model (GET, PUT, response codes such as 2.05 Content) but runs over UDP
//! with a compact 4-byte header instead of text headers over TCP.  Because
//! UDP does not guarantee delivery, CoAP adds its own message layer:
//!
//! - **Confirmable** messages must be acknowledged by the receiver.
//! - **Acknowledgement** messages answer a confirmable message, and may carry
//!   the response itself ("piggybacked" response).
//! - **Reset** messages say "I received this, but cannot process it".
//!
//! This crate defines:
//!
//! - **`protocol::messages`** – the typed message model ([`CoapMessage`],
//!   [`MessageType`], [`Code`], options).
//! - **`protocol::codec`** – binary encoding and decoding.
//! - **`protocol::message_id`** – the atomic counter that hands out
//!   message IDs for outgoing confirmable requests.

pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `coap_core::CoapMessage` instead of `coap_core::protocol::messages::CoapMessage`.
pub use protocol::codec::{decode_message, encode_message, ProtocolError};
pub use protocol::message_id::MessageIdCounter;
pub use protocol::messages::{Code, CoapMessage, CoapOption, MessageType};
