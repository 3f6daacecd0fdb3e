//! Harness-side wrapper around a device model

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, trace, warn};

use super::{DeviceModel, PeripheralCallbacks};
use crate::capture::{SerialCapture, StorageCapture};
use crate::types::{SimulationKey, rgb565_to_rgb8};
use crate::{HarnessError, Result};

/// Device adapter shared between the tick task and the foreground.
pub type SharedDevice<M> = Arc<Mutex<DeviceAdapter<M>>>;

/// Lock a shared device.
///
/// # Errors
///
/// [`HarnessError::Poisoned`] if a previous device call panicked while holding the lock.
pub fn lock_device<M>(device: &SharedDevice<M>) -> Result<MutexGuard<'_, DeviceAdapter<M>>> {
    device.lock().map_err(|_| HarnessError::poisoned("device adapter"))
}

/// Owns a [`DeviceModel`] and the callback table it raises events through.
///
/// Callbacks should be registered before [`init`](Self::init); the firmware
/// may cache hardware state during init, so late registration is allowed
/// but logged.
#[derive(Debug)]
pub struct DeviceAdapter<M> {
    model: M,
    callbacks: PeripheralCallbacks,
    init_count: u32,
    tick_count: u64,
}

impl<M: DeviceModel> DeviceAdapter<M> {
    pub fn new(model: M) -> Self {
        Self { model, callbacks: PeripheralCallbacks::default(), init_count: 0, tick_count: 0 }
    }

    /// Move into a [`SharedDevice`] for use with a scheduler.
    pub fn into_shared(self) -> SharedDevice<M> {
        Arc::new(Mutex::new(self))
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    fn note_registration(&self, event: &str) {
        if self.is_initialized() {
            warn!("{} callback registered after init; the device may not pick it up", event);
        } else {
            debug!("{} callback registered", event);
        }
    }

    pub fn register_serial_tx<F>(&mut self, callback: F)
    where
        F: FnMut(u8, &[u8], u16, u32) -> i32 + Send + 'static,
    {
        self.note_registration("serial_tx");
        self.callbacks.serial_tx = Box::new(callback);
    }

    pub fn register_sdcard_initialize<F>(&mut self, callback: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.note_registration("sdcard_initialize");
        self.callbacks.sdcard_initialize = Box::new(callback);
    }

    pub fn register_sdcard_start<F>(&mut self, callback: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.note_registration("sdcard_start");
        self.callbacks.sdcard_start = Box::new(callback);
    }

    pub fn register_sdcard_stop<F>(&mut self, callback: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.note_registration("sdcard_stop");
        self.callbacks.sdcard_stop = Box::new(callback);
    }

    pub fn register_sdcard_reset<F>(&mut self, callback: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.note_registration("sdcard_reset");
        self.callbacks.sdcard_reset = Box::new(callback);
    }

    pub fn register_sdcard_open<F>(&mut self, callback: F)
    where
        F: FnMut(&str, u8) -> u8 + Send + 'static,
    {
        self.note_registration("sdcard_open");
        self.callbacks.sdcard_open = Box::new(callback);
    }

    pub fn register_sdcard_write<F>(&mut self, callback: F)
    where
        F: FnMut(&[u8], u16) -> u8 + Send + 'static,
    {
        self.note_registration("sdcard_write");
        self.callbacks.sdcard_write = Box::new(callback);
    }

    pub fn register_sdcard_close<F>(&mut self, callback: F)
    where
        F: FnMut() -> u8 + Send + 'static,
    {
        self.note_registration("sdcard_close");
        self.callbacks.sdcard_close = Box::new(callback);
    }

    /// Route serial transmissions into `serial`.
    pub fn attach_serial(&mut self, serial: &SerialCapture) {
        let serial = serial.clone();
        self.register_serial_tx(move |channel, data, size, timeout| {
            serial.record(channel, data, size, timeout)
        });
    }

    /// Route every storage event into `storage`.
    pub fn attach_storage(&mut self, storage: &StorageCapture) {
        let sink = storage.clone();
        self.register_sdcard_initialize(move || sink.initialize());
        let sink = storage.clone();
        self.register_sdcard_start(move || sink.start());
        let sink = storage.clone();
        self.register_sdcard_stop(move || sink.stop());
        let sink = storage.clone();
        self.register_sdcard_reset(move || sink.reset_device());
        let sink = storage.clone();
        self.register_sdcard_open(move |filename, mode| sink.open(filename, mode));
        let sink = storage.clone();
        self.register_sdcard_write(move |data, size| sink.write(data, size));
        let sink = storage.clone();
        self.register_sdcard_close(move || sink.close());
    }

    /// Initialize (or re-initialize) the device.
    pub fn init(&mut self) -> Result<()> {
        info!("Initializing device (cycle {})", self.init_count + 1);
        self.model.init(&mut self.callbacks)?;
        self.init_count += 1;
        Ok(())
    }

    /// Run one tick. Ticking before `init` is allowed and forwarded as is.
    pub fn tick(&mut self) -> Result<()> {
        if !self.is_initialized() && self.tick_count == 0 {
            warn!("Ticking a device that was never initialized");
        }
        self.model.tick(&mut self.callbacks)?;
        self.tick_count += 1;
        trace!("Tick {} complete", self.tick_count);
        Ok(())
    }

    pub fn display_dimensions(&self) -> (u8, u8) {
        self.model.display_dimensions()
    }

    /// RGB565 pixel at `(x, y)`.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Value`] if the coordinate is outside the display.
    pub fn pixel(&self, x: u8, y: u8) -> Result<u16> {
        let (width, height) = self.display_dimensions();
        if x >= width || y >= height {
            return Err(HarnessError::invalid_value(format!(
                "pixel ({}, {}) outside {}x{} display",
                x, y, width, height
            )));
        }
        Ok(self.model.pixel(x, y))
    }

    /// Pixel at `(x, y)` expanded to 8-bit channels.
    pub fn pixel_rgb8(&self, x: u8, y: u8) -> Result<(u8, u8, u8)> {
        self.pixel(x, y).map(rgb565_to_rgb8)
    }

    pub fn key_pressed(&mut self, key: SimulationKey) {
        debug!("Key pressed: {:?}", key);
        self.model.key_pressed(key);
    }

    pub fn key_released(&mut self, key: SimulationKey) {
        debug!("Key released: {:?}", key);
        self.model.key_released(key);
    }

    /// Replace the pulse counters.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Value`] unless exactly four values are given.
    pub fn update_pulse_counters(&mut self, counters: &[u32]) -> Result<()> {
        let counters: [u32; 4] = counters.try_into().map_err(|_| {
            HarnessError::invalid_value(format!(
                "expected exactly 4 pulse counters, got {}",
                counters.len()
            ))
        })?;
        debug!("Pulse counters updated: {:?}", counters);
        self.model.update_pulse_counters(counters);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.init_count > 0
    }

    /// Completed init cycles.
    pub fn init_count(&self) -> u32 {
        self.init_count
    }

    /// Completed ticks, across init cycles.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Peripherals;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recorder {
        counters: [u32; 4],
        keys: Vec<(SimulationKey, bool)>,
        fail_tick: bool,
    }

    impl DeviceModel for Recorder {
        fn init(&mut self, io: &mut dyn Peripherals) -> Result<()> {
            io.sdcard_initialize();
            Ok(())
        }

        fn tick(&mut self, io: &mut dyn Peripherals) -> Result<()> {
            if self.fail_tick {
                return Err(HarnessError::device_failed("scripted tick failure"));
            }
            let status = io.serial_tx(2, &self.counters[0].to_le_bytes(), 4, 25);
            assert_eq!(status, 0);
            Ok(())
        }

        fn display_dimensions(&self) -> (u8, u8) {
            (4, 2)
        }

        fn pixel(&self, x: u8, y: u8) -> u16 {
            if (x, y) == (3, 1) { 0xF800 } else { 0x0000 }
        }

        fn key_pressed(&mut self, key: SimulationKey) {
            self.keys.push((key, true));
        }

        fn key_released(&mut self, key: SimulationKey) {
            self.keys.push((key, false));
        }

        fn update_pulse_counters(&mut self, counters: [u32; 4]) {
            self.counters = counters;
        }
    }

    #[test]
    fn init_and_tick_route_through_attached_sinks() {
        let serial = SerialCapture::new();
        let storage = StorageCapture::new();
        let mut adapter = DeviceAdapter::new(Recorder::default());
        adapter.attach_serial(&serial);
        adapter.attach_storage(&storage);

        assert!(!adapter.is_initialized());
        adapter.init().unwrap();
        assert!(adapter.is_initialized());
        assert_eq!(storage.count(), 1);

        adapter.update_pulse_counters(&[7, 0, 0, 0]).unwrap();
        adapter.tick().unwrap();
        assert_eq!(adapter.tick_count(), 1);
        assert_eq!(serial.get(0).unwrap().payload, vec![7, 0, 0, 0]);
        assert_eq!(serial.get(0).unwrap().channel_id, 2);
    }

    #[test]
    fn latest_registration_wins() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut adapter = DeviceAdapter::new(Recorder::default());

        let counter = Arc::clone(&first);
        adapter.register_serial_tx(move |_, _, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            0
        });
        let counter = Arc::clone(&second);
        adapter.register_serial_tx(move |_, _, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            0
        });

        adapter.init().unwrap();
        adapter.tick().unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn registration_after_init_still_applies() {
        let _ = tracing_subscriber::fmt::try_init();
        let serial = SerialCapture::new();
        let mut adapter = DeviceAdapter::new(Recorder::default());
        adapter.init().unwrap();
        adapter.attach_serial(&serial);
        adapter.tick().unwrap();
        assert_eq!(serial.count(), 1);
    }

    #[test]
    fn init_count_tracks_cycles() {
        let mut adapter = DeviceAdapter::new(Recorder::default());
        adapter.init().unwrap();
        adapter.init().unwrap();
        assert_eq!(adapter.init_count(), 2);
    }

    #[test]
    fn counter_updates_require_four_values() {
        let mut adapter = DeviceAdapter::new(Recorder::default());
        for bad in [&[][..], &[1, 2, 3][..], &[1, 2, 3, 4, 5][..]] {
            let err = adapter.update_pulse_counters(bad).unwrap_err();
            assert!(matches!(err, HarnessError::Value { .. }));
        }
        assert_eq!(adapter.model().counters, [0; 4]);

        adapter.update_pulse_counters(&[1, 2, 3, 4]).unwrap();
        assert_eq!(adapter.model().counters, [1, 2, 3, 4]);
    }

    #[test]
    fn keys_are_forwarded_in_order() {
        let mut adapter = DeviceAdapter::new(Recorder::default());
        adapter.key_pressed(SimulationKey::Left);
        adapter.key_released(SimulationKey::Left);
        assert_eq!(
            adapter.model().keys,
            vec![(SimulationKey::Left, true), (SimulationKey::Left, false)]
        );
    }

    #[test]
    fn pixel_readback_is_bounds_checked() {
        let adapter = DeviceAdapter::new(Recorder::default());
        assert_eq!(adapter.display_dimensions(), (4, 2));
        assert_eq!(adapter.pixel(3, 1).unwrap(), 0xF800);
        assert_eq!(adapter.pixel_rgb8(3, 1).unwrap(), (255, 0, 0));
        assert_eq!(adapter.pixel_rgb8(0, 0).unwrap(), (0, 0, 0));
        assert!(adapter.pixel(4, 0).is_err());
        assert!(adapter.pixel(0, 2).is_err());
    }

    #[test]
    fn tick_errors_propagate_without_counting() {
        let mut adapter = DeviceAdapter::new(Recorder { fail_tick: true, ..Default::default() });
        adapter.init().unwrap();
        let err = adapter.tick().unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(adapter.tick_count(), 0);
    }

    #[test]
    fn shared_device_locks() {
        let shared = DeviceAdapter::new(Recorder::default()).into_shared();
        lock_device(&shared).unwrap().init().unwrap();
        assert_eq!(lock_device(&shared).unwrap().init_count(), 1);
    }
}
