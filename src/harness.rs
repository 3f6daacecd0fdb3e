//! One-stop test fixture wiring sinks, device and scheduler together

use std::time::Duration;

use tracing::info;

use crate::capture::{SerialCapture, StorageCapture};
use crate::config::HarnessConfig;
use crate::device::{DeviceAdapter, DeviceModel, SharedDevice, lock_device};
use crate::scheduler::{SchedulerState, TickScheduler};
use crate::wire::{TelemetryMessage, WireVerifier};
use crate::Result;

/// A device under test with capture sinks attached.
///
/// The sinks are registered before anything else touches the device, so
/// every event from the first `init` on is captured. The device can be
/// stepped by hand with [`init`](Self::init) and [`tick`](Self::tick) or
/// driven by the built-in [`TickScheduler`].
pub struct Harness<M: DeviceModel + 'static> {
    serial: SerialCapture,
    storage: StorageCapture,
    scheduler: TickScheduler<M>,
    verifier: WireVerifier,
}

impl<M: DeviceModel + 'static> Harness<M> {
    pub fn new(model: M) -> Self {
        Self::build(model, &HarnessConfig::default())
    }

    /// # Errors
    ///
    /// [`HarnessError::Value`](crate::HarnessError::Value) if `config` does not validate.
    pub fn with_config(model: M, config: &HarnessConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(model, config))
    }

    fn build(model: M, config: &HarnessConfig) -> Self {
        let serial = SerialCapture::new();
        serial.set_verbose(config.serial_verbose);
        let storage = StorageCapture::new();

        let mut adapter = DeviceAdapter::new(model);
        adapter.attach_serial(&serial);
        adapter.attach_storage(&storage);

        let scheduler = TickScheduler::new(adapter.into_shared(), config.tick_interval());
        let verifier = WireVerifier::new(config.wire_layout(), crate::checksum::Crc32);

        Self { serial, storage, scheduler, verifier }
    }

    pub fn serial(&self) -> &SerialCapture {
        &self.serial
    }

    pub fn storage(&self) -> &StorageCapture {
        &self.storage
    }

    pub fn device(&self) -> &SharedDevice<M> {
        self.scheduler.device()
    }

    pub fn scheduler(&self) -> &TickScheduler<M> {
        &self.scheduler
    }

    pub fn verifier(&self) -> &WireVerifier {
        &self.verifier
    }

    /// Run `f` with the device adapter locked.
    pub fn with_device<R>(&self, f: impl FnOnce(&mut DeviceAdapter<M>) -> R) -> Result<R> {
        let mut adapter = lock_device(self.device())?;
        Ok(f(&mut *adapter))
    }

    /// Initialize the device by hand, without starting the scheduler.
    pub fn init(&self) -> Result<()> {
        lock_device(self.device())?.init()
    }

    /// Run a single tick by hand.
    pub fn tick(&self) -> Result<()> {
        lock_device(self.device())?.tick()
    }

    pub fn update_pulse_counters(&self, counters: &[u32]) -> Result<()> {
        lock_device(self.device())?.update_pulse_counters(counters)
    }

    pub async fn start(&self) -> Result<()> {
        self.scheduler.start().await
    }

    pub async fn stop(&self) -> Result<()> {
        self.scheduler.stop().await
    }

    pub async fn reload(&self) -> Result<()> {
        self.scheduler.reload().await
    }

    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Start the scheduler, wait for `transmissions` captures, then stop.
    pub async fn run_until(&self, transmissions: usize, timeout: Duration) -> Result<()> {
        self.start().await?;
        let waited = self.serial.wait_for_count(transmissions, timeout).await;
        let stopped = self.stop().await;
        waited?;
        stopped
    }

    /// Drop everything the sinks have captured so far.
    pub fn reset_captures(&self) {
        self.serial.reset();
        self.storage.reset();
    }

    /// Verify every captured transmission against the configured layout.
    pub fn verified_messages(&self) -> Result<Vec<TelemetryMessage>> {
        self.verifier.verify_all(&self.serial.records())
    }

    /// Log both capture listings.
    pub fn dump(&self) {
        info!("Harness state: {:?}", self.state());
        self.serial.dump();
        self.storage.dump();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HarnessError;
    use crate::device::PulseCounterDevice;
    use crate::test_utils::load_wire_fixture;

    #[test]
    fn manual_stepping_captures_everything() {
        let harness = Harness::new(PulseCounterDevice::new());
        harness.serial().set_verbose(false);
        harness.init().unwrap();
        harness.update_pulse_counters(&[0x1255_2277, 5, 55555, 75]).unwrap();
        harness.tick().unwrap();

        let fixture = load_wire_fixture("pulse_counters.yaml").unwrap();
        harness.serial().assert_sequence(&fixture.frames()).unwrap();
        assert_eq!(harness.storage().get_all_writes(), fixture.storage_writes);

        let values: Vec<Vec<u8>> = harness.verified_messages().unwrap().into_iter().map(|m| m.value).collect();
        let expected: Vec<Vec<u8>> = fixture.messages.iter().map(|m| m.value.clone()).collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = HarnessConfig { tick_interval_ms: 0, ..Default::default() };
        let result = Harness::with_config(PulseCounterDevice::new(), &config);
        assert!(matches!(result, Err(HarnessError::Value { .. })));
    }

    #[test]
    fn config_flows_into_components() {
        let config = HarnessConfig { tick_interval_ms: 3, serial_verbose: false, ..Default::default() };
        let harness = Harness::with_config(PulseCounterDevice::new(), &config).unwrap();
        assert!(!harness.serial().is_verbose());
        assert_eq!(harness.scheduler().interval(), Duration::from_millis(3));
        assert_eq!(harness.verifier().layout(), &config.wire_layout());
    }

    #[test]
    fn reset_captures_clears_both_sinks() {
        let harness = Harness::new(PulseCounterDevice::new());
        harness.init().unwrap();
        harness.tick().unwrap();
        harness.reset_captures();
        assert_eq!(harness.serial().count(), 0);
        assert_eq!(harness.storage().count(), 0);
        assert_eq!(harness.with_device(|d| d.tick_count()).unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_until_collects_scheduled_ticks() {
        let harness = Harness::new(PulseCounterDevice::new());
        harness.serial().set_verbose(false);
        harness.run_until(10, Duration::from_secs(1)).await.unwrap();

        assert_eq!(harness.state(), SchedulerState::Idle);
        assert!(harness.serial().count() >= 10);
        assert_eq!(harness.verified_messages().unwrap().len(), harness.serial().count());
    }
}
