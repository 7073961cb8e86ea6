//! CoAP message model.
//!
//! Mirrors the structure of a message on the wire (RFC 7252 §3):
//!
//! ```text
//!  0                   1                   2                   3
//! |Ver| T |  TKL  |      Code     |          Message ID           |
//! |   Token (if any, TKL bytes) ...
//! |   Options (if any) ...
//! |1 1 1 1 1 1 1 1|    Payload (if any) ...
//! ```

use std::fmt;

// ── Protocol constants ────────────────────────────────────────────────────────

/// The only CoAP version defined by RFC 7252.
pub const COAP_VERSION: u8 = 1;

/// Size of the fixed CoAP header in bytes.
pub const HEADER_SIZE: usize = 4;

/// Longest token a message may carry.
pub const MAX_TOKEN_LENGTH: usize = 8;

/// Byte separating the options from the payload.
pub const PAYLOAD_MARKER: u8 = 0xFF;

/// Default UDP port for unsecured CoAP.
pub const DEFAULT_PORT: u16 = 5683;

// ── Message type ──────────────────────────────────────────────────────────────

/// The two-bit message type field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Requires an Acknowledgement or Reset from the receiver.
    Confirmable = 0,
    /// Fire-and-forget.
    NonConfirmable = 1,
    /// Acknowledges a confirmable message; may carry a piggybacked response.
    Acknowledgement = 2,
    /// The receiver got the message but could not process it.
    Reset = 3,
}

impl MessageType {
    /// Decodes the two-bit type field.  Every two-bit value is a valid type,
    /// so this conversion is infallible; higher bits are ignored.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => MessageType::Confirmable,
            1 => MessageType::NonConfirmable,
            2 => MessageType::Acknowledgement,
            _ => MessageType::Reset,
        }
    }
}

// ── Code ──────────────────────────────────────────────────────────────────────

/// Request method or response code, encoded as `class.detail`
/// (3 bits of class, 5 bits of detail).
///
/// ```rust
/// use coap_core::Code;
///
/// assert_eq!(Code::CONTENT.to_string(), "2.05");
/// assert!(Code::CONTENT.is_success());
/// assert!(Code::GET.is_request());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(u8);

impl Code {
    pub const EMPTY: Code = Code::new(0, 0);

    pub const GET: Code = Code::new(0, 1);
    pub const POST: Code = Code::new(0, 2);
    pub const PUT: Code = Code::new(0, 3);
    pub const DELETE: Code = Code::new(0, 4);

    pub const CREATED: Code = Code::new(2, 1);
    pub const DELETED: Code = Code::new(2, 2);
    pub const VALID: Code = Code::new(2, 3);
    pub const CHANGED: Code = Code::new(2, 4);
    pub const CONTENT: Code = Code::new(2, 5);

    pub const BAD_REQUEST: Code = Code::new(4, 0);
    pub const NOT_FOUND: Code = Code::new(4, 4);
    pub const METHOD_NOT_ALLOWED: Code = Code::new(4, 5);

    pub const INTERNAL_SERVER_ERROR: Code = Code::new(5, 0);
    pub const SERVICE_UNAVAILABLE: Code = Code::new(5, 3);

    /// Builds a code from its class (0–7) and detail (0–31).
    pub const fn new(class: u8, detail: u8) -> Self {
        Code(((class & 0x07) << 5) | (detail & 0x1F))
    }

    /// Wraps a raw code byte as read from the wire.
    pub const fn from_raw(raw: u8) -> Self {
        Code(raw)
    }

    /// The raw code byte as written to the wire.
    pub const fn as_raw(self) -> u8 {
        self.0
    }

    pub const fn class(self) -> u8 {
        self.0 >> 5
    }

    pub const fn detail(self) -> u8 {
        self.0 & 0x1F
    }

    /// `true` for the 0.00 code used by empty ACK/RST messages.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `true` for request methods (class 0, excluding 0.00).
    pub const fn is_request(self) -> bool {
        self.class() == 0 && !self.is_empty()
    }

    /// `true` for response codes (classes 2, 4 and 5).
    pub const fn is_response(self) -> bool {
        matches!(self.class(), 2 | 4 | 5)
    }

    /// `true` for 2.xx success responses.
    pub const fn is_success(self) -> bool {
        self.class() == 2
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.class(), self.detail())
    }
}

// ── Options ───────────────────────────────────────────────────────────────────

/// Registered option numbers (RFC 7252 §12.2) used by the bridge.
pub mod option_number {
    pub const URI_HOST: u16 = 3;
    pub const ETAG: u16 = 4;
    pub const URI_PORT: u16 = 7;
    pub const LOCATION_PATH: u16 = 8;
    pub const URI_PATH: u16 = 11;
    pub const CONTENT_FORMAT: u16 = 12;
    pub const MAX_AGE: u16 = 14;
    pub const URI_QUERY: u16 = 15;
    pub const ACCEPT: u16 = 17;
}

/// Registered content formats (RFC 7252 §12.3).
pub mod content_format {
    pub const TEXT_PLAIN: u16 = 0;
    pub const LINK_FORMAT: u16 = 40;
    pub const OCTET_STREAM: u16 = 42;
    pub const JSON: u16 = 50;
}

/// A single option instance: its number and raw value bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoapOption {
    pub number: u16,
    pub value: Vec<u8>,
}

// ── Message ───────────────────────────────────────────────────────────────────

/// A complete CoAP message.
///
/// Options are stored in insertion order; the codec sorts them by number on
/// encode (a stable sort, so repeated options such as Uri-Path segments keep
/// their relative order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoapMessage {
    pub message_type: MessageType,
    pub code: Code,
    pub message_id: u16,
    pub token: Vec<u8>,
    pub options: Vec<CoapOption>,
    pub payload: Vec<u8>,
}

impl CoapMessage {
    /// Creates a message with no token, options or payload.
    pub fn new(message_type: MessageType, code: Code, message_id: u16) -> Self {
        Self {
            message_type,
            code,
            message_id,
            token: Vec::new(),
            options: Vec::new(),
            payload: Vec::new(),
        }
    }

    /// Creates a confirmable request carrying `token`.
    ///
    /// ```rust
    /// use coap_core::{CoapMessage, Code, MessageType};
    ///
    /// let mut req = CoapMessage::confirmable_request(Code::GET, 0x7d34, &[0xAB]);
    /// req.set_uri_path("/led");
    /// assert_eq!(req.message_type, MessageType::Confirmable);
    /// assert_eq!(req.uri_path(), "/led");
    /// ```
    pub fn confirmable_request(code: Code, message_id: u16, token: &[u8]) -> Self {
        let mut msg = Self::new(MessageType::Confirmable, code, message_id);
        msg.token = token.to_vec();
        msg
    }

    /// An empty Acknowledgement for `message_id`, used to confirm a separate
    /// (non-piggybacked) response.
    pub fn empty_ack(message_id: u16) -> Self {
        Self::new(MessageType::Acknowledgement, Code::EMPTY, message_id)
    }

    /// An empty Reset for `message_id`.
    pub fn reset(message_id: u16) -> Self {
        Self::new(MessageType::Reset, Code::EMPTY, message_id)
    }

    /// Replaces the payload.
    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// `true` for 0.00 messages (empty ACK, RST, or CoAP ping).
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Appends an option instance.
    pub fn add_option(&mut self, number: u16, value: impl Into<Vec<u8>>) {
        self.options.push(CoapOption {
            number,
            value: value.into(),
        });
    }

    /// Iterates over the values of every instance of option `number`.
    pub fn option_values(&self, number: u16) -> impl Iterator<Item = &[u8]> + '_ {
        self.options
            .iter()
            .filter(move |o| o.number == number)
            .map(|o| o.value.as_slice())
    }

    /// Replaces any Uri-Path options with the segments of `path`.
    ///
    /// Leading, trailing and doubled slashes produce no empty segments, so
    /// `"/led"`, `"led"` and `"/led/"` all yield a single `led` segment.
    pub fn set_uri_path(&mut self, path: &str) {
        self.options.retain(|o| o.number != option_number::URI_PATH);
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            self.add_option(option_number::URI_PATH, segment.as_bytes());
        }
    }

    /// Reassembles the Uri-Path options into an absolute path such as `/led`.
    pub fn uri_path(&self) -> String {
        let mut path = String::new();
        for segment in self.option_values(option_number::URI_PATH) {
            path.push('/');
            path.push_str(&String::from_utf8_lossy(segment));
        }
        if path.is_empty() {
            path.push('/');
        }
        path
    }

    /// Sets the Content-Format option, replacing any previous value.
    pub fn set_content_format(&mut self, format: u16) {
        self.options
            .retain(|o| o.number != option_number::CONTENT_FORMAT);
        self.add_option(option_number::CONTENT_FORMAT, encode_uint(u32::from(format)));
    }

    /// Returns the Content-Format option, if present and well-formed.
    pub fn content_format(&self) -> Option<u16> {
        self.option_values(option_number::CONTENT_FORMAT)
            .next()
            .and_then(decode_uint)
            .and_then(|v| u16::try_from(v).ok())
    }
}

// ── uint option values ────────────────────────────────────────────────────────

/// Encodes an unsigned integer option value in the minimal number of bytes
/// (zero is encoded as an empty value).
pub fn encode_uint(value: u32) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes[first_nonzero..].to_vec()
}

/// Decodes an unsigned integer option value of at most 4 bytes.
pub fn decode_uint(value: &[u8]) -> Option<u32> {
    if value.len() > 4 {
        return None;
    }
    Some(value.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
