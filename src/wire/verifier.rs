//! Telemetry frame verification

use tracing::{debug, warn};

use super::layout::WireLayout;
use super::message::{CHECKSUM_LEN, HEADER_LEN, MIN_MESSAGE_LEN, TelemetryMessage};
use crate::checksum::{Checksum, Crc32};
use crate::types::{TransmissionRecord, hex_dump};
use crate::{HarnessError, Result, cobs};

/// Checks captured transmissions against a [`WireLayout`] and a checksum.
pub struct WireVerifier {
    layout: WireLayout,
    checksum: Box<dyn Checksum>,
}

impl std::fmt::Debug for WireVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WireVerifier")
            .field("layout", &self.layout)
            .field("checksum", &self.checksum.name())
            .finish()
    }
}

impl Default for WireVerifier {
    fn default() -> Self {
        Self::new(WireLayout::default(), Crc32)
    }
}

impl WireVerifier {
    pub fn new(layout: WireLayout, checksum: impl Checksum + 'static) -> Self {
        Self { layout, checksum: Box::new(checksum) }
    }

    pub fn layout(&self) -> &WireLayout {
        &self.layout
    }

    pub fn checksum(&self) -> &dyn Checksum {
        self.checksum.as_ref()
    }

    /// Parse an unframed message.
    ///
    /// # Errors
    ///
    /// - [`HarnessError::Protocol`] when the message is shorter than the
    ///   fixed fields, its length field disagrees with its size, the source
    ///   is not in the layout, or the value has the wrong width
    /// - [`HarnessError::Checksum`] when the trailing checksum does not match
    pub fn parse(&self, message: &[u8]) -> Result<TelemetryMessage> {
        if message.len() < MIN_MESSAGE_LEN {
            return Err(HarnessError::protocol(format!(
                "message too short: {} bytes, need at least {}",
                message.len(),
                MIN_MESSAGE_LEN
            )));
        }

        let length = u16::from_le_bytes([message[0], message[1]]);
        if usize::from(length) != message.len() {
            return Err(HarnessError::protocol(format!(
                "length field says {} bytes, message has {}",
                length,
                message.len()
            )));
        }

        let source_id = message[2];
        let width = self
            .layout
            .width(source_id)
            .ok_or_else(|| HarnessError::protocol(format!("unknown source id {}", source_id)))?;
        let value_len = message.len() - MIN_MESSAGE_LEN;
        if value_len != width {
            return Err(HarnessError::protocol(format!(
                "source {} carries {}-byte values, message holds {}",
                source_id, width, value_len
            )));
        }

        let (covered, tail) = message.split_at(message.len() - CHECKSUM_LEN);
        let received = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
        let computed = self.checksum.compute(covered);
        if computed != received {
            return Err(HarnessError::Checksum { expected: computed, actual: received });
        }

        Ok(TelemetryMessage {
            length,
            source_id,
            value: covered[HEADER_LEN..].to_vec(),
            checksum: received,
        })
    }

    /// COBS-decode a captured frame and parse the message inside.
    pub fn verify_frame(&self, frame: &[u8]) -> Result<TelemetryMessage> {
        let decoded = cobs::decode(frame)?;
        self.parse(&decoded)
    }

    /// Verify a frame and check it carries `value` from `source_id`.
    ///
    /// # Errors
    ///
    /// Any [`verify_frame`](Self::verify_frame) error, or
    /// [`HarnessError::Assertion`] when the fields differ.
    pub fn expect_value(&self, frame: &[u8], source_id: u8, value: &[u8]) -> Result<TelemetryMessage> {
        let message = self.verify_frame(frame)?;
        if message.source_id != source_id || message.value != value {
            return Err(HarnessError::assertion(format!(
                "expected source {} value [{}], got source {} value [{}]",
                source_id,
                hex_dump(value),
                message.source_id,
                hex_dump(&message.value)
            )));
        }
        Ok(message)
    }

    /// Verify every captured transmission, stopping at the first bad one.
    pub fn verify_all(&self, records: &[TransmissionRecord]) -> Result<Vec<TelemetryMessage>> {
        let mut messages = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            match self.verify_frame(&record.payload) {
                Ok(message) => {
                    debug!("Transmission {} verified: source {}", index, message.source_id);
                    messages.push(message);
                }
                Err(e) => {
                    warn!("Transmission {} failed verification: {}", index, e);
                    return Err(e);
                }
            }
        }
        Ok(messages)
    }
}
