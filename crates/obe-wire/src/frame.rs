//! Frame encoding: a 10 digit zero padded byte length followed by a JSON payload.

use obe_core::errors::{ErrorInfo, ObeError};
use serde_json::Value;

/// Width of the decimal length header.
pub const HEADER_LEN: usize = 10;

/// Largest payload length expressible in the header.
pub const MAX_PAYLOAD_LEN: u64 = 9_999_999_999;

/// Renders the header for a payload of `len` bytes.
pub fn encode_header(len: usize) -> Result<[u8; HEADER_LEN], ObeError> {
    if len as u64 > MAX_PAYLOAD_LEN {
        return Err(ObeError::Transport(
            ErrorInfo::new("wire.payload_too_large", "payload does not fit the length header")
                .with_context("len", len.to_string()),
        ));
    }
    let text = format!("{len:0width$}", width = HEADER_LEN);
    let mut header = [0u8; HEADER_LEN];
    header.copy_from_slice(text.as_bytes());
    Ok(header)
}

/// Parses a header into the payload length.
pub fn decode_header(header: &[u8]) -> Result<usize, ObeError> {
    if header.len() != HEADER_LEN || !header.iter().all(u8::is_ascii_digit) {
        return Err(ObeError::Transport(
            ErrorInfo::new("wire.bad_header", "frame header must be 10 ASCII digits")
                .with_context("header", String::from_utf8_lossy(header).into_owned()),
        ));
    }
    let len = header
        .iter()
        .fold(0u64, |acc, digit| acc * 10 + u64::from(digit - b'0'));
    usize::try_from(len).map_err(|_| {
        ObeError::Transport(
            ErrorInfo::new("wire.payload_too_large", "frame length exceeds addressable memory")
                .with_context("len", len.to_string()),
        )
    })
}

/// Serializes `value` and prefixes it with its length header.
pub fn encode_frame(value: &Value) -> Result<Vec<u8>, ObeError> {
    let payload = serde_json::to_vec(value)
        .map_err(|err| ObeError::Serde(ErrorInfo::new("wire.encode", err.to_string())))?;
    let header = encode_header(payload.len())?;
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&header);
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decodes a JSON payload.
pub fn decode_payload(payload: &[u8]) -> Result<Value, ObeError> {
    serde_json::from_slice(payload).map_err(|err| {
        ObeError::Transport(
            ErrorInfo::new("wire.bad_payload", err.to_string())
                .with_context("len", payload.len().to_string()),
        )
    })
}

/// Decodes the first frame in `bytes`, returning the value and the bytes consumed.
pub fn decode_frame(bytes: &[u8]) -> Result<(Value, usize), ObeError> {
    if bytes.len() < HEADER_LEN {
        return Err(truncated(bytes.len(), HEADER_LEN));
    }
    let len = decode_header(&bytes[..HEADER_LEN])?;
    let end = HEADER_LEN
        .checked_add(len)
        .ok_or_else(|| truncated(bytes.len(), usize::MAX))?;
    if bytes.len() < end {
        return Err(truncated(bytes.len(), end));
    }
    Ok((decode_payload(&bytes[HEADER_LEN..end])?, end))
}

fn truncated(have: usize, need: usize) -> ObeError {
    ObeError::Transport(
        ErrorInfo::new("wire.truncated", "frame ends before its declared length")
            .with_context("have", have.to_string())
            .with_context("need", need.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_reply_is_bit_exact() {
        let frame = encode_frame(&Value::from("OK")).unwrap();
        assert_eq!(frame, b"0000000004\"OK\"");
    }

    #[test]
    fn header_rejects_signs_and_spaces() {
        assert!(decode_header(b"+000000004").is_err());
        assert!(decode_header(b"         4").is_err());
        assert_eq!(decode_header(b"0000000123").unwrap(), 123);
    }
}
