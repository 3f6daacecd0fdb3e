//! Consistent Overhead Byte Stuffing (COBS) frame codec.
//!
//! COBS removes every 0x00 from a payload so that a single 0x00 can terminate
//! a frame on a byte stream. The payload is split into blocks of at most 254
//! non-zero bytes; each block is prefixed with a code byte equal to its length
//! plus one, which also tells the decoder where the next (elided) zero was.
//!
//! ```text
//! payload:  11 22 00 33
//! encoded:  03 11 22 02 33 00
//!           ^code    ^code  ^delimiter
//! ```
//!
//! Code byte 0xFF marks a forced block boundary after 254 non-zero bytes and
//! implies no zero, which keeps the codec compatible with the classic
//! algorithm.

use crate::{HarnessError, Result};

/// Frame delimiter byte.
pub const DELIMITER: u8 = 0x00;

/// Longest run of non-zero bytes a single block can carry.
pub const MAX_BLOCK_LEN: usize = 254;

/// Code byte of a full block (no zero follows it).
const FULL_BLOCK_CODE: u8 = 0xFF;

/// Encode `payload` into a delimited COBS frame.
///
/// An empty payload encodes to `[0x01, 0x00]`.
pub fn encode(payload: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(max_encoded_len(payload.len()));
    let mut code_index = 0;
    let mut code: u8 = 0x01;

    encoded.push(0x00); // placeholder for the first code byte

    for &byte in payload {
        if byte == 0x00 {
            encoded[code_index] = code;
            code_index = encoded.len();
            encoded.push(0x00);
            code = 0x01;
        } else {
            encoded.push(byte);
            code += 1;

            if code == FULL_BLOCK_CODE {
                encoded[code_index] = code;
                code_index = encoded.len();
                encoded.push(0x00);
                code = 0x01;
            }
        }
    }

    encoded[code_index] = code;
    encoded.push(DELIMITER);
    encoded
}

/// Upper bound on the frame length [`encode`] produces for `payload_len` bytes.
///
/// Exact when the payload has no zero bytes: one extra code byte per forced
/// 254-byte block, plus the leading code byte and the delimiter.
pub const fn max_encoded_len(payload_len: usize) -> usize {
    payload_len + payload_len / MAX_BLOCK_LEN + 2
}

/// Decode a delimited COBS frame back into its payload.
///
/// # Errors
///
/// Returns [`HarnessError::Framing`] if the frame is empty, does not end with
/// the 0x00 delimiter, contains a zero code byte before the delimiter, or a
/// block claims more bytes than the frame holds.
pub fn decode(frame: &[u8]) -> Result<Vec<u8>> {
    let Some((&last, body)) = frame.split_last() else {
        return Err(HarnessError::framing("empty frame, missing trailing 0x00 delimiter"));
    };
    if last != DELIMITER {
        return Err(HarnessError::framing(format!(
            "missing trailing 0x00 delimiter (last byte {:#04x})",
            last
        )));
    }

    let mut decoded = Vec::with_capacity(body.len());
    let mut pos = 0;
    let mut previous_code: Option<u8> = None;

    while pos < body.len() {
        let code = body[pos];
        if code == 0x00 {
            return Err(HarnessError::framing(format!("zero code byte at offset {}", pos)));
        }

        let block_end = pos + code as usize;
        if block_end > body.len() {
            return Err(HarnessError::framing(format!(
                "block at offset {} needs {} bytes, only {} remain",
                pos,
                code - 1,
                body.len() - pos - 1
            )));
        }

        if matches!(previous_code, Some(prev) if prev != FULL_BLOCK_CODE) {
            decoded.push(0x00);
        }
        decoded.extend_from_slice(&body[pos + 1..block_end]);

        previous_code = Some(code);
        pos = block_end;
    }

    Ok(decoded)
}

/// Split a concatenated byte stream into delimited frames.
///
/// Each returned frame keeps its terminating 0x00. Bytes after the last
/// delimiter are returned as the incomplete remainder.
pub fn split_frames(stream: &[u8]) -> (Vec<&[u8]>, &[u8]) {
    let mut frames = Vec::new();
    let mut start = 0;

    for (offset, &byte) in stream.iter().enumerate() {
        if byte == DELIMITER {
            frames.push(&stream[start..=offset]);
            start = offset + 1;
        }
    }

    (frames, &stream[start..])
}
