//! Reference pulse counter firmware model.
//!
//! Mirrors the measurement pipeline of the pulse counter firmware so the
//! harness can be exercised without a compiled image. On init the device
//! brings up the SD card and opens the measurement log for appending. Every
//! tick it reports five sources, in order:
//!
//! | source | value                 | width |
//! |--------|-----------------------|-------|
//! | 0..=3  | pulse counter 0..=3   | u32   |
//! | 4      | UART reading (fixed 5)| u16   |
//!
//! Each reading goes out on UART1 as a COBS framed telemetry message and is
//! appended to the log as a `"<source>,<value>\n"` line.

use tracing::debug;

use super::{DeviceModel, Peripherals};
use crate::checksum::Crc32;
use crate::types::SimulationKey;
use crate::wire::{TelemetryMessage, UART_SOURCE_ID};
use crate::{HarnessError, Result};

pub const MEASUREMENTS_FILE: &str = "measurements.txt";

/// Open mode byte for appending.
pub const APPEND_MODE: u8 = 1;

pub const TELEMETRY_CHANNEL: u8 = 1;

pub const TX_TIMEOUT_MS: u32 = 1000;

/// The auxiliary UART reading the firmware reports on source 4.
pub const UART_READING: u16 = 5;

pub const DISPLAY_WIDTH: u8 = 128;
pub const DISPLAY_HEIGHT: u8 = 64;

/// Color of the key indicator strip along the top row.
const INDICATOR_COLOR: u16 = 0xF800;

#[derive(Debug, Default, Clone)]
pub struct PulseCounterDevice {
    counters: [u32; 4],
    pressed: [bool; 4],
}

impl PulseCounterDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> [u32; 4] {
        self.counters
    }

    pub fn is_pressed(&self, key: SimulationKey) -> bool {
        self.pressed[key.code() as usize]
    }

    fn report(&self, io: &mut dyn Peripherals, message: TelemetryMessage, reading: String) -> Result<()> {
        let frame = message.to_frame();
        let size = u16::try_from(frame.len())
            .map_err(|_| HarnessError::device_failed("telemetry frame exceeds u16 length"))?;

        let status = io.serial_tx(TELEMETRY_CHANNEL, &frame, size, TX_TIMEOUT_MS);
        if status != 0 {
            return Err(HarnessError::device_failed(format!(
                "UART{} transmit of source {} failed with status {}",
                TELEMETRY_CHANNEL, message.source_id, status
            )));
        }

        let line = format!("{},{}\n", message.source_id, reading);
        let status = io.sdcard_write(line.as_bytes(), line.len() as u16);
        if status != 0 {
            return Err(HarnessError::device_failed(format!(
                "measurement log write failed with status {}",
                status
            )));
        }
        Ok(())
    }
}

impl DeviceModel for PulseCounterDevice {
    fn init(&mut self, io: &mut dyn Peripherals) -> Result<()> {
        if !io.sdcard_initialize() {
            return Err(HarnessError::device_failed("SD card initialize failed"));
        }
        if !io.sdcard_start() {
            return Err(HarnessError::device_failed("SD card start failed"));
        }
        let status = io.sdcard_open(MEASUREMENTS_FILE, APPEND_MODE);
        if status != 0 {
            return Err(HarnessError::device_failed(format!(
                "opening {} failed with status {}",
                MEASUREMENTS_FILE, status
            )));
        }
        debug!("Pulse counter device up, counters {:?}", self.counters);
        Ok(())
    }

    fn tick(&mut self, io: &mut dyn Peripherals) -> Result<()> {
        for (source_id, &count) in (0u8..).zip(self.counters.iter()) {
            let message = TelemetryMessage::from_u32(source_id, count, &Crc32);
            self.report(io, message, count.to_string())?;
        }
        let message = TelemetryMessage::from_u16(UART_SOURCE_ID, UART_READING, &Crc32);
        self.report(io, message, UART_READING.to_string())
    }

    fn display_dimensions(&self) -> (u8, u8) {
        (DISPLAY_WIDTH, DISPLAY_HEIGHT)
    }

    /// The top row is split into four segments, lit while the matching key is held.
    fn pixel(&self, x: u8, y: u8) -> u16 {
        let segment = (x / (DISPLAY_WIDTH / 4)) as usize;
        if y == 0 && self.pressed[segment] { INDICATOR_COLOR } else { 0x0000 }
    }

    fn key_pressed(&mut self, key: SimulationKey) {
        self.pressed[key.code() as usize] = true;
    }

    fn key_released(&mut self, key: SimulationKey) {
        self.pressed[key.code() as usize] = false;
    }

    fn update_pulse_counters(&mut self, counters: [u32; 4]) {
        self.counters = counters;
    }
}
