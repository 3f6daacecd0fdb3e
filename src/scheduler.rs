//! Tick scheduler driving a device model on a background task
//!
//! The scheduler owns one tokio task per run. The task ticks the shared
//! device on the blocking pool, then sleeps for the interval while watching a
//! cancellation token, so `stop()` takes effect between ticks and never
//! interrupts one. A tick that never returns keeps `stop()` waiting.
//!
//! ```text
//!            start()              stop()
//!   Idle ──────────────► Running ────────► Stopping ──► Idle
//!                           │
//!                           │ tick error / panic
//!                           ▼
//!                        Faulted  (terminal: build a new scheduler)
//! ```

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::device::{DeviceModel, SharedDevice, lock_device};
use crate::{HarnessError, Result};

/// Tick period used when none is configured.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(20);

/// Lifecycle state of a [`TickScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopping,
    /// A tick failed; the device state is undefined.
    Faulted,
}

/// Handles of an active tick loop
struct TickLoop {
    cancel: CancellationToken,
    handle: JoinHandle<Result<()>>,
}

/// Calls [`DeviceAdapter::tick`](crate::device::DeviceAdapter::tick) at a fixed interval.
///
/// Control calls (`start`, `stop`, `reload`) are serialized; concurrent
/// callers queue behind each other.
pub struct TickScheduler<M: DeviceModel + 'static> {
    device: SharedDevice<M>,
    interval: Duration,
    control: Mutex<Option<TickLoop>>,
    state_tx: Arc<watch::Sender<SchedulerState>>,
    ticks: Arc<AtomicU64>,
}

impl<M: DeviceModel + 'static> TickScheduler<M> {
    pub fn new(device: SharedDevice<M>, interval: Duration) -> Self {
        let (state_tx, _) = watch::channel(SchedulerState::Idle);
        Self {
            device,
            interval,
            control: Mutex::new(None),
            state_tx: Arc::new(state_tx),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_default_interval(device: SharedDevice<M>) -> Self {
        Self::new(device, DEFAULT_TICK_INTERVAL)
    }

    pub fn device(&self) -> &SharedDevice<M> {
        &self.device
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> SchedulerState {
        *self.state_tx.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    /// Ticks performed by the current or most recent run.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Receiver that observes every state transition.
    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.state_tx.subscribe()
    }

    /// Initialize the device once and start ticking.
    ///
    /// Starting a running scheduler does nothing.
    ///
    /// # Errors
    ///
    /// - [`HarnessError::SchedulerFaulted`] if a previous run failed
    /// - the device's init error, which also faults the scheduler
    pub async fn start(&self) -> Result<()> {
        let mut control = self.control.lock().await;
        self.start_locked(&mut control)
    }

    /// Stop ticking and wait for the loop to finish.
    ///
    /// The tick in progress, if any, runs to completion first. Stopping an
    /// idle scheduler does nothing.
    ///
    /// # Errors
    ///
    /// The tick error that ended the loop, or [`HarnessError::TaskPanicked`].
    /// Either leaves the scheduler [`Faulted`](SchedulerState::Faulted).
    pub async fn stop(&self) -> Result<()> {
        let mut control = self.control.lock().await;
        self.stop_locked(&mut control).await
    }

    /// Stop, then start again. The device is re-initialized.
    pub async fn reload(&self) -> Result<()> {
        let mut control = self.control.lock().await;
        info!("Reloading tick scheduler");
        self.stop_locked(&mut control).await?;
        self.start_locked(&mut control)
    }

    fn start_locked(&self, control: &mut Option<TickLoop>) -> Result<()> {
        match self.state() {
            SchedulerState::Running => {
                debug!("Tick scheduler already running");
                return Ok(());
            }
            SchedulerState::Faulted => return Err(HarnessError::SchedulerFaulted),
            SchedulerState::Idle | SchedulerState::Stopping => {}
        }

        let init = lock_device(&self.device).and_then(|mut device| device.init());
        if let Err(e) = init {
            error!("Device init failed, scheduler faulted: {}", e);
            self.state_tx.send_replace(SchedulerState::Faulted);
            return Err(e);
        }

        self.ticks.store(0, Ordering::Release);
        let cancel = CancellationToken::new();

        // Running must be published before the task can report Faulted.
        self.state_tx.send_replace(SchedulerState::Running);
        let handle = tokio::spawn(tick_loop(
            Arc::clone(&self.device),
            self.interval,
            cancel.clone(),
            Arc::clone(&self.state_tx),
            Arc::clone(&self.ticks),
        ));

        *control = Some(TickLoop { cancel, handle });
        info!("Tick scheduler started ({:?} interval)", self.interval);
        Ok(())
    }

    async fn stop_locked(&self, control: &mut Option<TickLoop>) -> Result<()> {
        let Some(tick_loop) = control.take() else {
            debug!("Tick scheduler not running");
            return Ok(());
        };

        if self.state() == SchedulerState::Running {
            self.state_tx.send_replace(SchedulerState::Stopping);
        }
        tick_loop.cancel.cancel();

        match tick_loop.handle.await {
            Ok(Ok(())) => {
                self.state_tx.send_replace(SchedulerState::Idle);
                info!("Tick scheduler stopped after {} ticks", self.ticks());
                Ok(())
            }
            Ok(Err(e)) => {
                self.state_tx.send_replace(SchedulerState::Faulted);
                Err(e)
            }
            Err(join_error) => {
                self.state_tx.send_replace(SchedulerState::Faulted);
                error!("Tick loop task failed: {}", join_error);
                Err(HarnessError::TaskPanicked { reason: join_error.to_string() })
            }
        }
    }
}

impl<M: DeviceModel + 'static> Drop for TickScheduler<M> {
    fn drop(&mut self) {
        if let Some(tick_loop) = self.control.get_mut().take() {
            debug!("Tick scheduler dropped while running, cancelling loop");
            tick_loop.cancel.cancel();
        }
    }
}

async fn tick_loop<M: DeviceModel + 'static>(
    device: SharedDevice<M>,
    interval: Duration,
    cancel: CancellationToken,
    state_tx: Arc<watch::Sender<SchedulerState>>,
    ticks: Arc<AtomicU64>,
) -> Result<()> {
    info!("Tick loop started");

    loop {
        // Check for cancellation between ticks
        if cancel.is_cancelled() {
            info!("Tick loop cancelled");
            break;
        }

        if let Err(e) = run_tick(&device).await {
            error!("Tick {} failed, stopping loop: {}", ticks.load(Ordering::Acquire) + 1, e);
            state_tx.send_replace(SchedulerState::Faulted);
            return Err(e);
        }
        let count = ticks.fetch_add(1, Ordering::AcqRel) + 1;
        trace!("Tick {}", count);

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Tick loop cancelled during sleep");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!("Tick loop ended ({} ticks)", ticks.load(Ordering::Acquire));
    Ok(())
}

/// Run one tick on the blocking pool so a slow device never stalls the runtime.
async fn run_tick<M: DeviceModel + 'static>(device: &SharedDevice<M>) -> Result<()> {
    let device = Arc::clone(device);
    match tokio::task::spawn_blocking(move || tick_once(&device)).await {
        Ok(result) => result,
        Err(join_error) if join_error.is_panic() => {
            Err(HarnessError::TaskPanicked { reason: panic_reason(join_error.into_panic()) })
        }
        Err(join_error) => Err(HarnessError::TaskPanicked { reason: join_error.to_string() }),
    }
}

/// One tick under the device lock, with panics turned into errors.
fn tick_once<M: DeviceModel>(device: &SharedDevice<M>) -> Result<()> {
    let mut adapter = lock_device(device)?;
    match catch_unwind(AssertUnwindSafe(|| adapter.tick())) {
        Ok(result) => result,
        Err(payload) => Err(HarnessError::TaskPanicked { reason: panic_reason(payload) }),
    }
}

fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}
