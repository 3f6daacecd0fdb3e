//! Captured peripheral events

use serde::{Deserialize, Serialize};
use std::fmt;

/// One serial transmission captured from the device.
///
/// `declared_size` is the size the firmware reported, which may differ from
/// `payload.len()`. It is kept as reported so tests can catch the mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransmissionRecord {
    pub channel_id: u8,
    pub payload: Vec<u8>,
    pub declared_size: u16,
    pub timeout: u32,
}

impl TransmissionRecord {
    pub fn new(channel_id: u8, payload: Vec<u8>, declared_size: u16, timeout: u32) -> Self {
        Self { channel_id, payload, declared_size, timeout }
    }
}

/// Space separated uppercase hex, the format all capture diagnostics use.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{:02X}", byte));
    }
    out
}

/// File open mode as passed by the firmware's storage driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenMode {
    Write,
    Append,
    Read,
    Other(u8),
}

impl OpenMode {
    /// Raw byte the device passed to `open`.
    pub fn raw(self) -> u8 {
        match self {
            OpenMode::Write => 0,
            OpenMode::Append => 1,
            OpenMode::Read => 2,
            OpenMode::Other(raw) => raw,
        }
    }
}

impl From<u8> for OpenMode {
    fn from(raw: u8) -> Self {
        match raw {
            0 => OpenMode::Write,
            1 => OpenMode::Append,
            2 => OpenMode::Read,
            other => OpenMode::Other(other),
        }
    }
}

/// One storage call captured from the device, in call order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageOperation {
    Initialize,
    Start,
    Stop,
    Reset,
    Open { filename: String, mode: OpenMode },
    Write { payload: Vec<u8>, declared_size: u16 },
    Close,
}

/// Discriminant of a [`StorageOperation`] for kind-only assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageOperationKind {
    Initialize,
    Start,
    Stop,
    Reset,
    Open,
    Write,
    Close,
}

impl StorageOperation {
    pub fn kind(&self) -> StorageOperationKind {
        match self {
            StorageOperation::Initialize => StorageOperationKind::Initialize,
            StorageOperation::Start => StorageOperationKind::Start,
            StorageOperation::Stop => StorageOperationKind::Stop,
            StorageOperation::Reset => StorageOperationKind::Reset,
            StorageOperation::Open { .. } => StorageOperationKind::Open,
            StorageOperation::Write { .. } => StorageOperationKind::Write,
            StorageOperation::Close => StorageOperationKind::Close,
        }
    }

    /// Write payload interpreted as text, one char per byte.
    pub fn write_text(&self) -> Option<String> {
        match self {
            StorageOperation::Write { payload, .. } => Some(bytes_to_text(payload)),
            _ => None,
        }
    }
}

impl fmt::Display for StorageOperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageOperationKind::Initialize => "initialize",
            StorageOperationKind::Start => "start",
            StorageOperationKind::Stop => "stop",
            StorageOperationKind::Reset => "reset",
            StorageOperationKind::Open => "open",
            StorageOperationKind::Write => "write",
            StorageOperationKind::Close => "close",
        };
        f.write_str(name)
    }
}

impl fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageOperation::Open { filename, mode } => {
                write!(f, "open({:?}, mode={})", filename, mode.raw())
            }
            StorageOperation::Write { payload, declared_size } => {
                write!(f, "write({:?}, size={})", bytes_to_text(payload), declared_size)
            }
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// Latin-1 style byte to char mapping so arbitrary bytes never fail to render.
fn bytes_to_text(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_mode_round_trips_raw_bytes() {
        assert_eq!(OpenMode::from(0), OpenMode::Write);
        assert_eq!(OpenMode::from(1), OpenMode::Append);
        assert_eq!(OpenMode::from(2), OpenMode::Read);
        assert_eq!(OpenMode::from(0x7F), OpenMode::Other(0x7F));

        for raw in 0..=u8::MAX {
            assert_eq!(OpenMode::from(raw).raw(), raw);
        }
    }

    #[test]
    fn hex_dump_formatting() {
        assert_eq!(hex_dump(&[]), "");
        assert_eq!(hex_dump(&[0x0B, 0x00, 0xFF]), "0B 00 FF");
    }

    #[test]
    fn write_text_maps_bytes_directly() {
        let op = StorageOperation::Write { payload: b"4,5\n".to_vec(), declared_size: 4 };
        assert_eq!(op.kind(), StorageOperationKind::Write);
        assert_eq!(op.write_text().as_deref(), Some("4,5\n"));
        assert_eq!(StorageOperation::Start.write_text(), None);

        let binary = StorageOperation::Write { payload: vec![0xE9], declared_size: 1 };
        assert_eq!(binary.write_text().as_deref(), Some("\u{e9}"));
    }

    #[test]
    fn display_is_readable() {
        let open = StorageOperation::Open { filename: "measurements.txt".into(), mode: OpenMode::Append };
        assert_eq!(open.to_string(), "open(\"measurements.txt\", mode=1)");
        assert_eq!(StorageOperation::Initialize.to_string(), "initialize");
    }
}
