//! Binary codec for encoding and decoding CoAP messages (RFC 7252 §3).
//!
//! Wire format:
//! ```text
//! [ver:2|type:2|tkl:4][code:8][message_id:16][token:tkl][options...][0xFF payload]
//! ```
//! All multi-byte integers are big-endian.
//!
//! # Option encoding (for beginners)
//!
//! Options are not written with their full number.  Each option stores the
//! *difference* ("delta") from the previous option's number, plus the length
//! of its value, packed into one byte as two 4-bit nibbles.  Values that do
//! not fit in a nibble use an escape:
//!
//! | nibble | meaning                                   |
//! |--------|-------------------------------------------|
//! | 0–12   | the value itself                          |
//! | 13     | one extra byte follows, value = byte + 13 |
//! | 14     | two extra bytes follow, value = u16 + 269 |
//! | 15     | reserved (only valid as the payload marker `0xFF`) |

use thiserror::Error;

use crate::protocol::messages::{
    Code, CoapMessage, CoapOption, MessageType, COAP_VERSION, HEADER_SIZE, MAX_TOKEN_LENGTH,
    PAYLOAD_MARKER,
};

/// Largest value expressible with the 2-byte nibble extension.
const MAX_EXTENDED_VALUE: usize = 65_535 + 269;

/// Errors that can occur during message encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the structure it claims to contain.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The version bits are not 1.
    #[error("unsupported CoAP version: {0}")]
    UnsupportedVersion(u8),

    /// Token length is outside 0–8.
    #[error("invalid token length: {0}")]
    InvalidTokenLength(usize),

    /// An option header used a reserved nibble or overflowed the number space.
    #[error("malformed option: {0}")]
    MalformedOption(String),

    /// An option value is longer than the format can express.
    #[error("option value too long: {0} bytes")]
    OptionTooLong(usize),

    /// A payload marker was present with nothing after it.
    #[error("payload marker present but payload is empty")]
    EmptyPayload,

    /// A 0.00 message carried a token, options or payload.
    #[error("empty message must not carry a token, options or payload")]
    NonEmptyEmptyMessage,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`CoapMessage`] into its datagram bytes.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidTokenLength`] for tokens longer than 8
/// bytes, [`ProtocolError::OptionTooLong`] for oversized option values, and
/// [`ProtocolError::NonEmptyEmptyMessage`] for a 0.00 message with content.
///
/// # Examples
///
/// ```rust
/// use coap_core::{encode_message, CoapMessage, Code};
///
/// let mut req = CoapMessage::confirmable_request(Code::GET, 0x0001, &[]);
/// req.set_uri_path("/led");
/// let bytes = encode_message(&req).unwrap();
/// // header, then option delta 11 / length 3, then "led"
/// assert_eq!(bytes, vec![0x40, 0x01, 0x00, 0x01, 0xB3, b'l', b'e', b'd']);
/// ```
pub fn encode_message(msg: &CoapMessage) -> Result<Vec<u8>, ProtocolError> {
    let tkl = msg.token.len();
    if tkl > MAX_TOKEN_LENGTH {
        return Err(ProtocolError::InvalidTokenLength(tkl));
    }
    if msg.is_empty() && (tkl != 0 || !msg.options.is_empty() || !msg.payload.is_empty()) {
        return Err(ProtocolError::NonEmptyEmptyMessage);
    }

    let mut buf = Vec::with_capacity(HEADER_SIZE + tkl + msg.payload.len() + 16);

    buf.push((COAP_VERSION << 6) | ((msg.message_type as u8) << 4) | tkl as u8);
    buf.push(msg.code.as_raw());
    buf.extend_from_slice(&msg.message_id.to_be_bytes());
    buf.extend_from_slice(&msg.token);

    encode_options(&mut buf, &msg.options)?;

    if !msg.payload.is_empty() {
        buf.push(PAYLOAD_MARKER);
        buf.extend_from_slice(&msg.payload);
    }
    Ok(buf)
}

/// Decodes one [`CoapMessage`] from a complete datagram.
///
/// Unlike a stream codec, a CoAP datagram is always exactly one message, so
/// all of `bytes` is consumed.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the bytes are malformed.
pub fn decode_message(bytes: &[u8]) -> Result<CoapMessage, ProtocolError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ProtocolError::InsufficientData {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let version = bytes[0] >> 6;
    if version != COAP_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }

    let message_type = MessageType::from_bits(bytes[0] >> 4);
    let tkl = usize::from(bytes[0] & 0x0F);
    if tkl > MAX_TOKEN_LENGTH {
        return Err(ProtocolError::InvalidTokenLength(tkl));
    }

    let code = Code::from_raw(bytes[1]);
    let message_id = u16::from_be_bytes([bytes[2], bytes[3]]);

    if code.is_empty() && (tkl != 0 || bytes.len() > HEADER_SIZE) {
        return Err(ProtocolError::NonEmptyEmptyMessage);
    }

    let token_end = HEADER_SIZE + tkl;
    require_len(bytes, token_end)?;
    let token = bytes[HEADER_SIZE..token_end].to_vec();

    let (options, payload) = decode_options_and_payload(&bytes[token_end..])?;

    Ok(CoapMessage {
        message_type,
        code,
        message_id,
        token,
        options,
        payload,
    })
}

// ── Option encoding ───────────────────────────────────────────────────────────

fn encode_options(buf: &mut Vec<u8>, options: &[CoapOption]) -> Result<(), ProtocolError> {
    // Stable sort: repeated options keep their relative order.
    let mut sorted: Vec<&CoapOption> = options.iter().collect();
    sorted.sort_by_key(|o| o.number);

    let mut previous = 0u16;
    for option in sorted {
        let delta = usize::from(option.number - previous);
        let length = option.value.len();
        if length > MAX_EXTENDED_VALUE {
            return Err(ProtocolError::OptionTooLong(length));
        }

        let (delta_nibble, delta_ext) = split_nibble(delta);
        let (length_nibble, length_ext) = split_nibble(length);

        buf.push((delta_nibble << 4) | length_nibble);
        buf.extend_from_slice(&delta_ext);
        buf.extend_from_slice(&length_ext);
        buf.extend_from_slice(&option.value);

        previous = option.number;
    }
    Ok(())
}

/// Splits a delta or length into its header nibble and extension bytes.
fn split_nibble(value: usize) -> (u8, Vec<u8>) {
    if value < 13 {
        (value as u8, Vec::new())
    } else if value < 269 {
        (13, vec![(value - 13) as u8])
    } else {
        (14, ((value - 269) as u16).to_be_bytes().to_vec())
    }
}

// ── Option decoding ───────────────────────────────────────────────────────────

fn decode_options_and_payload(
    bytes: &[u8],
) -> Result<(Vec<CoapOption>, Vec<u8>), ProtocolError> {
    let mut options = Vec::new();
    let mut pos = 0usize;
    let mut number = 0u32;

    while pos < bytes.len() {
        let header = bytes[pos];
        pos += 1;

        if header == PAYLOAD_MARKER {
            let payload = &bytes[pos..];
            if payload.is_empty() {
                return Err(ProtocolError::EmptyPayload);
            }
            return Ok((options, payload.to_vec()));
        }

        let delta = read_extended(bytes, &mut pos, header >> 4, "delta")?;
        let length = read_extended(bytes, &mut pos, header & 0x0F, "length")?;

        number += delta as u32;
        let option_number = u16::try_from(number).map_err(|_| {
            ProtocolError::MalformedOption(format!("option number {number} exceeds 65535"))
        })?;

        require_len(bytes, pos + length)?;
        options.push(CoapOption {
            number: option_number,
            value: bytes[pos..pos + length].to_vec(),
        });
        pos += length;
    }

    Ok((options, Vec::new()))
}

/// Reads the extension bytes for one nibble, advancing `pos`.
fn read_extended(
    bytes: &[u8],
    pos: &mut usize,
    nibble: u8,
    field: &str,
) -> Result<usize, ProtocolError> {
    match nibble {
        0..=12 => Ok(usize::from(nibble)),
        13 => {
            require_len(bytes, *pos + 1)?;
            let value = usize::from(bytes[*pos]) + 13;
            *pos += 1;
            Ok(value)
        }
        14 => {
            require_len(bytes, *pos + 2)?;
            let value = usize::from(u16::from_be_bytes([bytes[*pos], bytes[*pos + 1]])) + 269;
            *pos += 2;
            Ok(value)
        }
        _ => Err(ProtocolError::MalformedOption(format!(
            "reserved nibble 15 in option {field}"
        ))),
    }
}

fn require_len(bytes: &[u8], needed: usize) -> Result<(), ProtocolError> {
    if bytes.len() < needed {
        Err(ProtocolError::InsufficientData {
            needed,
            available: bytes.len(),
        })
    } else {
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::{content_format, option_number};

    #[test]
    fn test_encode_empty_ack_is_four_bytes() {
        // Arrange
        let ack = CoapMessage::empty_ack(0xBEEF);

        // Act
        let bytes = encode_message(&ack).unwrap();

        // Assert: ver=1, type=ACK(2), tkl=0 → 0x60
        assert_eq!(bytes, vec![0x60, 0x00, 0xBE, 0xEF]);
    }

    #[test]
    fn test_encode_put_with_token_and_payload() {
        // Arrange
        let mut req = CoapMessage::confirmable_request(Code::PUT, 0x0102, &[0xAA, 0xBB])
            .with_payload("on");
        req.set_uri_path("/led");

        // Act
        let bytes = encode_message(&req).unwrap();

        // Assert
        assert_eq!(
            bytes,
            vec![
                0x42, 0x03, 0x01, 0x02, // header: CON, tkl=2, PUT, mid
                0xAA, 0xBB, // token
                0xB3, b'l', b'e', b'd', // Uri-Path "led"
                0xFF, b'o', b'n', // payload
            ]
        );
    }

    #[test]
    fn test_encode_sorts_options_by_number() {
        // Arrange: Content-Format (12) added before Uri-Path (11)
        let mut msg = CoapMessage::confirmable_request(Code::POST, 1, &[]);
        msg.set_content_format(content_format::JSON);
        msg.add_option(option_number::URI_PATH, "led");

        // Act
        let bytes = encode_message(&msg).unwrap();

        // Assert: Uri-Path first (delta 11), then Content-Format (delta 1, len 1)
        assert_eq!(&bytes[4..], &[0xB3, b'l', b'e', b'd', 0x11, 50]);
    }

    #[test]
    fn test_encode_rejects_nine_byte_token() {
        let req = CoapMessage::confirmable_request(Code::GET, 1, &[0u8; 9]);
        assert_eq!(
            encode_message(&req),
            Err(ProtocolError::InvalidTokenLength(9))
        );
    }

    #[test]
    fn test_encode_rejects_empty_message_with_payload() {
        let ack = CoapMessage::empty_ack(1).with_payload("x");
        assert_eq!(
            encode_message(&ack),
            Err(ProtocolError::NonEmptyEmptyMessage)
        );
    }

    #[test]
    fn test_extended_delta_and_length_survive_decode() {
        // Arrange: option 300 (needs a 2-byte delta extension) with a
        // 20-byte value (needs a 1-byte length extension).
        let mut msg = CoapMessage::confirmable_request(Code::GET, 5, &[1]);
        msg.add_option(300, vec![7u8; 20]);

        // Act
        let bytes = encode_message(&msg).unwrap();
        let decoded = decode_message(&bytes).unwrap();

        // Assert
        assert_eq!(bytes[5], 0xED, "delta nibble 14, length nibble 13");
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_decode_piggybacked_content_response() {
        // Arrange: ACK 2.05 mid=0x1234 token=0x01 Content-Format=0 payload "off"
        let bytes = [
            0x61, 0x45, 0x12, 0x34, 0x01, 0xC0, 0xFF, b'o', b'f', b'f',
        ];

        // Act
        let msg = decode_message(&bytes).unwrap();

        // Assert
        assert_eq!(msg.message_type, MessageType::Acknowledgement);
        assert_eq!(msg.code, Code::CONTENT);
        assert_eq!(msg.message_id, 0x1234);
        assert_eq!(msg.token, vec![0x01]);
        assert_eq!(msg.content_format(), Some(content_format::TEXT_PLAIN));
        assert_eq!(msg.payload, b"off".to_vec());
    }

    #[test]
    fn test_decode_short_datagram_returns_insufficient_data() {
        assert_eq!(
            decode_message(&[0x60, 0x00]),
            Err(ProtocolError::InsufficientData {
                needed: 4,
                available: 2
            })
        );
    }

    #[test]
    fn test_decode_rejects_wrong_version() {
        // Version bits 2 (0b10 << 6 = 0x80)
        assert_eq!(
            decode_message(&[0x80, 0x01, 0x00, 0x01]),
            Err(ProtocolError::UnsupportedVersion(2))
        );
    }

    #[test]
    fn test_decode_rejects_reserved_token_length() {
        assert_eq!(
            decode_message(&[0x49, 0x01, 0x00, 0x01]),
            Err(ProtocolError::InvalidTokenLength(9))
        );
    }

    #[test]
    fn test_decode_rejects_truncated_token() {
        let result = decode_message(&[0x44, 0x01, 0x00, 0x01, 0xAA]);
        assert!(matches!(result, Err(ProtocolError::InsufficientData { .. })));
    }

    #[test]
    fn test_decode_rejects_payload_marker_without_payload() {
        assert_eq!(
            decode_message(&[0x40, 0x45, 0x00, 0x01, 0xFF]),
            Err(ProtocolError::EmptyPayload)
        );
    }

    #[test]
    fn test_decode_rejects_reserved_length_nibble() {
        // delta 11, length nibble 15
        let result = decode_message(&[0x40, 0x45, 0x00, 0x01, 0xBF]);
        assert!(matches!(result, Err(ProtocolError::MalformedOption(_))));
    }

    #[test]
    fn test_decode_rejects_truncated_option_value() {
        // Uri-Path claims 3 bytes, only 1 present
        let result = decode_message(&[0x40, 0x01, 0x00, 0x01, 0xB3, b'l']);
        assert!(matches!(result, Err(ProtocolError::InsufficientData { .. })));
    }

    #[test]
    fn test_decode_rejects_empty_message_with_trailing_bytes() {
        assert_eq!(
            decode_message(&[0x60, 0x00, 0x00, 0x01, 0xFF, b'x']),
            Err(ProtocolError::NonEmptyEmptyMessage)
        );
    }

    #[test]
    fn test_decode_reset() {
        let msg = decode_message(&[0x70, 0x00, 0xAB, 0xCD]).unwrap();
        assert_eq!(msg, CoapMessage::reset(0xABCD));
    }
}
