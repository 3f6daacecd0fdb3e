//! Peripheral capture sinks.
//!
//! The device model talks to its peripherals through callbacks. A capture
//! sink is the host-side end of those callbacks: it records every call in
//! order and offers assertion helpers that fail with a readable
//! [`HarnessError::Assertion`](crate::HarnessError::Assertion).
//!
//! Sinks are cheap cloneable handles over shared state, so the same sink can
//! be registered with the device adapter (written from the tick task) and held
//! by the test (read from the foreground). Each record or read takes the lock
//! once and never across an `.await`.
//!
//! ```rust
//! use firmware_harness::capture::SerialCapture;
//!
//! let serial = SerialCapture::new();
//! serial.set_verbose(false);
//! serial.record(1, &[0x02, 0x11, 0x00], 3, 1000);
//!
//! serial.assert_count(1).unwrap();
//! serial.assert_channel(0, 1).unwrap();
//! assert_eq!(serial.decoded_payloads().unwrap(), vec![vec![0x11]]);
//! ```

mod serial;
mod storage;

pub use serial::{SERIAL_STATUS_OK, SerialCapture};
pub use storage::{STORAGE_STATUS_OK, StorageCapture};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a sink's state.
///
/// Sink state is append-only and no foreign code runs while it is locked, so
/// a poisoned lock still holds consistent records and is recovered.
pub(crate) fn lock_state<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
