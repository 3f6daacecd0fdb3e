//! Core types shared by the capture sinks and the device boundary.
//!
//! - [`TransmissionRecord`] is one serial transmission as the firmware issued it
//! - [`StorageOperation`] is one storage driver call, in call order
//! - [`OpenMode`] maps the raw open mode byte
//! - [`SimulationKey`] is a front panel key
//! - [`rgb565_to_rgb8`] expands display pixels
//!
//! ```rust
//! use firmware_harness::types::{OpenMode, StorageOperation, StorageOperationKind, rgb565_to_rgb8};
//!
//! let op = StorageOperation::Open { filename: "measurements.txt".into(), mode: OpenMode::from(1) };
//! assert_eq!(op.kind(), StorageOperationKind::Open);
//! assert_eq!(rgb565_to_rgb8(0xF800), (255, 0, 0));
//! ```

mod color;
mod key;
mod record;

pub use color::rgb565_to_rgb8;
pub use key::SimulationKey;
pub use record::{
    OpenMode, StorageOperation, StorageOperationKind, TransmissionRecord, hex_dump,
};
