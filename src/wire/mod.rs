//! Telemetry wire protocol.
//!
//! Every transmission the firmware makes is one COBS frame around one
//! little-endian telemetry message:
//!
//! ```text
//! +-----------+-----------+-----------------+-------------+
//! | length u16| source u8 | value (N bytes) | checksum u32|
//! +-----------+-----------+-----------------+-------------+
//! ```
//!
//! `length` counts the whole message, its own two bytes and the checksum
//! included. The checksum covers every byte before it. The value width `N`
//! is fixed per source by a [`WireLayout`].
//!
//! ```rust
//! use firmware_harness::checksum::Crc32;
//! use firmware_harness::wire::{TelemetryMessage, WireVerifier};
//!
//! let message = TelemetryMessage::from_u16(4, 5, &Crc32);
//! assert_eq!(message.to_bytes(), vec![0x09, 0x00, 0x04, 0x05, 0x00, 0xF5, 0xC9, 0x4C, 0xB1]);
//!
//! let verifier = WireVerifier::default();
//! let parsed = verifier.verify_frame(&message.to_frame()).unwrap();
//! assert_eq!(parsed.value_u16(), Some(5));
//! ```

mod layout;
mod message;
mod verifier;

pub use layout::{UART_SOURCE_ID, WireLayout};
pub use message::{CHECKSUM_LEN, HEADER_LEN, MIN_MESSAGE_LEN, TelemetryMessage};
pub use verifier::WireVerifier;
