//! Telemetry message encoding

use crate::checksum::Checksum;
use crate::{HarnessError, Result, cobs};

/// Bytes before the value: length (2) and source id (1).
pub const HEADER_LEN: usize = 3;

/// Trailing checksum size.
pub const CHECKSUM_LEN: usize = 4;

/// Smallest possible message: header and checksum around an empty value.
pub const MIN_MESSAGE_LEN: usize = HEADER_LEN + CHECKSUM_LEN;

/// One telemetry reading as it appears on the wire.
///
/// Messages built with [`new`](Self::new) are sealed: `length` and
/// `checksum` are computed from the value. Parsed messages carry the fields
/// as they were received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryMessage {
    pub length: u16,
    pub source_id: u8,
    pub value: Vec<u8>,
    pub checksum: u32,
}

impl TelemetryMessage {
    /// Seal a message around `value`.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Protocol`] if the message would not fit the u16 length field.
    pub fn new(source_id: u8, value: Vec<u8>, checksum: &dyn Checksum) -> Result<Self> {
        let total = MIN_MESSAGE_LEN + value.len();
        let length = u16::try_from(total).map_err(|_| {
            HarnessError::protocol(format!("{}-byte value does not fit a telemetry message", value.len()))
        })?;
        Ok(Self::seal(length, source_id, value, checksum))
    }

    pub fn from_u32(source_id: u8, value: u32, checksum: &dyn Checksum) -> Self {
        Self::seal((MIN_MESSAGE_LEN + 4) as u16, source_id, value.to_le_bytes().to_vec(), checksum)
    }

    pub fn from_u16(source_id: u8, value: u16, checksum: &dyn Checksum) -> Self {
        Self::seal((MIN_MESSAGE_LEN + 2) as u16, source_id, value.to_le_bytes().to_vec(), checksum)
    }

    fn seal(length: u16, source_id: u8, value: Vec<u8>, checksum: &dyn Checksum) -> Self {
        let mut message = Self { length, source_id, value, checksum: 0 };
        message.checksum = checksum.compute(&message.covered_bytes());
        message
    }

    /// Bytes the checksum is computed over.
    pub fn covered_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.value.len());
        bytes.extend_from_slice(&self.length.to_le_bytes());
        bytes.push(self.source_id);
        bytes.extend_from_slice(&self.value);
        bytes
    }

    /// Unframed message bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.covered_bytes();
        bytes.extend_from_slice(&self.checksum.to_le_bytes());
        bytes
    }

    /// COBS-framed message, ready to transmit.
    pub fn to_frame(&self) -> Vec<u8> {
        cobs::encode(&self.to_bytes())
    }

    /// Value as u32, if it is four bytes wide.
    pub fn value_u32(&self) -> Option<u32> {
        let bytes: [u8; 4] = self.value.as_slice().try_into().ok()?;
        Some(u32::from_le_bytes(bytes))
    }

    /// Value as u16, if it is two bytes wide.
    pub fn value_u16(&self) -> Option<u16> {
        let bytes: [u8; 2] = self.value.as_slice().try_into().ok()?;
        Some(u16::from_le_bytes(bytes))
    }
}
