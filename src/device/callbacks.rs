//! Replaceable peripheral callback table

use std::fmt;

use super::Peripherals;

pub type SerialTxFn = Box<dyn FnMut(u8, &[u8], u16, u32) -> i32 + Send>;
pub type CardLifecycleFn = Box<dyn FnMut() -> bool + Send>;
pub type FileOpenFn = Box<dyn FnMut(&str, u8) -> u8 + Send>;
pub type FileWriteFn = Box<dyn FnMut(&[u8], u16) -> u8 + Send>;
pub type FileCloseFn = Box<dyn FnMut() -> u8 + Send>;

/// One callback per peripheral event.
///
/// Every slot starts as a no-op reporting success, so a device can run with
/// only the callbacks a test cares about registered.
pub struct PeripheralCallbacks {
    pub serial_tx: SerialTxFn,
    pub sdcard_initialize: CardLifecycleFn,
    pub sdcard_start: CardLifecycleFn,
    pub sdcard_stop: CardLifecycleFn,
    pub sdcard_reset: CardLifecycleFn,
    pub sdcard_open: FileOpenFn,
    pub sdcard_write: FileWriteFn,
    pub sdcard_close: FileCloseFn,
}

impl Default for PeripheralCallbacks {
    fn default() -> Self {
        Self {
            serial_tx: Box::new(|_: u8, _: &[u8], _: u16, _: u32| 0),
            sdcard_initialize: Box::new(|| true),
            sdcard_start: Box::new(|| true),
            sdcard_stop: Box::new(|| true),
            sdcard_reset: Box::new(|| true),
            sdcard_open: Box::new(|_: &str, _: u8| 0),
            sdcard_write: Box::new(|_: &[u8], _: u16| 0),
            sdcard_close: Box::new(|| 0),
        }
    }
}

impl fmt::Debug for PeripheralCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeripheralCallbacks").finish_non_exhaustive()
    }
}

impl Peripherals for PeripheralCallbacks {
    fn serial_tx(&mut self, channel_id: u8, data: &[u8], size: u16, timeout: u32) -> i32 {
        (self.serial_tx)(channel_id, data, size, timeout)
    }

    fn sdcard_initialize(&mut self) -> bool {
        (self.sdcard_initialize)()
    }

    fn sdcard_start(&mut self) -> bool {
        (self.sdcard_start)()
    }

    fn sdcard_stop(&mut self) -> bool {
        (self.sdcard_stop)()
    }

    fn sdcard_reset(&mut self) -> bool {
        (self.sdcard_reset)()
    }

    fn sdcard_open(&mut self, filename: &str, mode: u8) -> u8 {
        (self.sdcard_open)(filename, mode)
    }

    fn sdcard_write(&mut self, data: &[u8], size: u16) -> u8 {
        (self.sdcard_write)(data, size)
    }

    fn sdcard_close(&mut self) -> u8 {
        (self.sdcard_close)()
    }
}
