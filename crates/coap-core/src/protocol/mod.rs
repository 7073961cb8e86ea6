//! Protocol module containing CoAP message types and the binary codec.

pub mod codec;
pub mod message_id;
pub mod messages;

pub use codec::{decode_message, encode_message, ProtocolError};
pub use message_id::MessageIdCounter;
pub use messages::*;
