//! Device model boundary.
//!
//! The firmware under test is reached through two traits. [`DeviceModel`] is
//! what the harness calls into: lifecycle, display readback and input.
//! [`Peripherals`] is what the model calls back out to while it runs, one
//! method per hardware event. The harness' implementation of `Peripherals`
//! is [`PeripheralCallbacks`], a table of replaceable closures that usually
//! forward into the capture sinks.
//!
//! ```rust
//! use firmware_harness::capture::{SerialCapture, StorageCapture};
//! use firmware_harness::device::{DeviceAdapter, PulseCounterDevice};
//!
//! let serial = SerialCapture::new();
//! let storage = StorageCapture::new();
//!
//! let mut adapter = DeviceAdapter::new(PulseCounterDevice::new());
//! adapter.attach_serial(&serial);
//! adapter.attach_storage(&storage);
//!
//! adapter.init().unwrap();
//! adapter.update_pulse_counters(&[10, 20, 30, 40]).unwrap();
//! adapter.tick().unwrap();
//!
//! assert_eq!(serial.count(), 5);
//! assert_eq!(storage.get_all_writes()[0], "0,10\n");
//! ```

mod adapter;
mod callbacks;
pub mod reference;

pub use adapter::{DeviceAdapter, SharedDevice, lock_device};
pub use callbacks::PeripheralCallbacks;
pub use reference::PulseCounterDevice;

use crate::Result;
use crate::types::SimulationKey;

/// Hardware events a device model may raise while it runs.
///
/// Return values are the status codes the firmware sees: `0` for success on
/// serial and file operations, `true` for success on card lifecycle calls.
pub trait Peripherals {
    /// Transmit `data` on UART `channel_id`. `size` is the length the firmware reports.
    fn serial_tx(&mut self, channel_id: u8, data: &[u8], size: u16, timeout: u32) -> i32;

    fn sdcard_initialize(&mut self) -> bool;

    fn sdcard_start(&mut self) -> bool;

    fn sdcard_stop(&mut self) -> bool;

    fn sdcard_reset(&mut self) -> bool;

    fn sdcard_open(&mut self, filename: &str, mode: u8) -> u8;

    fn sdcard_write(&mut self, data: &[u8], size: u16) -> u8;

    fn sdcard_close(&mut self) -> u8;
}

/// A simulated firmware image.
///
/// Calls are synchronous and run to completion; the harness never cancels a
/// call in progress.
pub trait DeviceModel: Send {
    /// Bring the device up. May be called again to re-initialize.
    fn init(&mut self, io: &mut dyn Peripherals) -> Result<()>;

    /// Run one scheduler tick.
    fn tick(&mut self, io: &mut dyn Peripherals) -> Result<()>;

    /// Display `(width, height)` in pixels.
    fn display_dimensions(&self) -> (u8, u8) {
        (0, 0)
    }

    /// RGB565 color at `(x, y)`. Only called with in-bounds coordinates.
    fn pixel(&self, _x: u8, _y: u8) -> u16 {
        0
    }

    fn key_pressed(&mut self, _key: SimulationKey) {}

    fn key_released(&mut self, _key: SimulationKey) {}

    /// Replace the four pulse counters.
    fn update_pulse_counters(&mut self, counters: [u32; 4]);
}
