//! Host-side test harness for tick-driven firmware simulations.
//!
//! The harness runs a simulated firmware image (a [`DeviceModel`]) on a
//! periodic tick, captures every byte it sends over serial or writes to its
//! SD card, and checks those bytes against the telemetry wire protocol.
//!
//! # Features
//!
//! - **COBS framing**: lossless, zero-free framing of variable-length messages
//! - **Peripheral capture**: serial and storage sinks with assertion helpers
//! - **Tick scheduling**: background tick loop with clean start/stop/reload
//! - **Wire verification**: length, layout and CRC-32 checks per message
//!
//! # Quick Start
//!
//! ```rust
//! use firmware_harness::{Harness, PulseCounterDevice};
//!
//! let harness = Harness::new(PulseCounterDevice::new());
//! harness.init().unwrap();
//! harness.update_pulse_counters(&[1, 2, 3, 4]).unwrap();
//! harness.tick().unwrap();
//!
//! let messages = harness.verified_messages().unwrap();
//! assert_eq!(messages[2].value_u32(), Some(3));
//! assert_eq!(harness.storage().get_all_writes()[4], "4,5\n");
//! ```
//!
//! ## Scheduled ticks
//!
//! ```rust,no_run
//! use firmware_harness::{Harness, PulseCounterDevice};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> firmware_harness::Result<()> {
//!     let harness = Harness::new(PulseCounterDevice::new());
//!     harness.start().await?;
//!     harness.serial().wait_for_count(25, Duration::from_secs(1)).await?;
//!     harness.stop().await?;
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod checksum;
pub mod cobs;
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Capture and device boundary
pub mod capture;
pub mod device;
pub mod wire;

// Execution and setup
pub mod config;
mod harness;
pub mod logging;
pub mod scheduler;

// Core exports
pub use error::*;
pub use types::*;

pub use capture::{SerialCapture, StorageCapture};
pub use checksum::{Checksum, Crc32};
pub use config::HarnessConfig;
pub use device::{DeviceAdapter, DeviceModel, Peripherals, PulseCounterDevice, SharedDevice};
pub use harness::Harness;
pub use scheduler::{DEFAULT_TICK_INTERVAL, SchedulerState, TickScheduler};
pub use wire::{TelemetryMessage, WireLayout, WireVerifier};
