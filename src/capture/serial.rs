//! Serial (UART) transmission capture

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info};

use super::lock_state;
use crate::types::{TransmissionRecord, hex_dump};
use crate::{HarnessError, Result, cobs};

/// Status code the serial callback reports back to the firmware.
pub const SERIAL_STATUS_OK: i32 = 0;

#[derive(Debug)]
struct SerialState {
    records: Vec<TransmissionRecord>,
    verbose: bool,
}

/// Records every serial transmission the device makes.
#[derive(Debug, Clone)]
pub struct SerialCapture {
    state: Arc<Mutex<SerialState>>,
    count_tx: Arc<watch::Sender<usize>>,
}

impl Default for SerialCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialCapture {
    /// Empty capture with verbose logging on.
    pub fn new() -> Self {
        let (count_tx, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(SerialState { records: Vec::new(), verbose: true })),
            count_tx: Arc::new(count_tx),
        }
    }

    /// Record one transmission. Always reports [`SERIAL_STATUS_OK`].
    pub fn record(&self, channel_id: u8, payload: &[u8], declared_size: u16, timeout: u32) -> i32 {
        let mut state = lock_state(&self.state);
        if state.verbose {
            info!("UART{} TX [{} bytes]: {}", channel_id, declared_size, hex_dump(payload));
        } else {
            debug!("UART{} TX [{} bytes]", channel_id, declared_size);
        }
        state.records.push(TransmissionRecord::new(
            channel_id,
            payload.to_vec(),
            declared_size,
            timeout,
        ));
        // Published under the lock so counts are never observed out of order.
        self.count_tx.send_replace(state.records.len());
        SERIAL_STATUS_OK
    }

    /// Toggle hex dump logging of each transmission. Recording is unaffected.
    pub fn set_verbose(&self, verbose: bool) {
        lock_state(&self.state).verbose = verbose;
    }

    pub fn is_verbose(&self) -> bool {
        lock_state(&self.state).verbose
    }

    /// Drop every captured record.
    pub fn reset(&self) {
        let mut state = lock_state(&self.state);
        state.records.clear();
        self.count_tx.send_replace(0);
    }

    pub fn count(&self) -> usize {
        lock_state(&self.state).records.len()
    }

    /// Record at `index`.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Index`] if fewer than `index + 1` records were captured.
    pub fn get(&self, index: usize) -> Result<TransmissionRecord> {
        let state = lock_state(&self.state);
        state
            .records
            .get(index)
            .cloned()
            .ok_or_else(|| HarnessError::index_out_of_range(index, state.records.len()))
    }

    /// Snapshot of all records in capture order.
    pub fn records(&self) -> Vec<TransmissionRecord> {
        lock_state(&self.state).records.clone()
    }

    /// Raw (still framed) payloads in capture order.
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        lock_state(&self.state).records.iter().map(|r| r.payload.clone()).collect()
    }

    /// COBS-decode every captured payload.
    pub fn decoded_payloads(&self) -> Result<Vec<Vec<u8>>> {
        self.payloads().iter().map(|frame| cobs::decode(frame)).collect()
    }

    pub fn assert_count(&self, expected: usize) -> Result<()> {
        let actual = self.count();
        if actual != expected {
            return Err(HarnessError::assertion(format!(
                "expected {} transmissions, captured {}",
                expected, actual
            )));
        }
        Ok(())
    }

    pub fn assert_payload(&self, index: usize, expected: &[u8]) -> Result<()> {
        let record = self.get(index)?;
        if record.payload != expected {
            return Err(HarnessError::assertion(format!(
                "transmission {} differs\n  expected: {}\n  actual:   {}",
                index,
                hex_dump(expected),
                hex_dump(&record.payload)
            )));
        }
        Ok(())
    }

    /// Assert the complete capture equals `expected`, entry by entry.
    pub fn assert_sequence<P: AsRef<[u8]>>(&self, expected: &[P]) -> Result<()> {
        compare_sequence("transmission", &self.payloads(), expected)
    }

    /// Assert the captured payloads equal `expected` after COBS decoding.
    pub fn assert_decoded_sequence<P: AsRef<[u8]>>(&self, expected: &[P]) -> Result<()> {
        compare_sequence("decoded transmission", &self.decoded_payloads()?, expected)
    }

    /// Assert the capture holds `payload` at any position.
    pub fn assert_contains(&self, payload: &[u8]) -> Result<()> {
        let payloads = self.payloads();
        if payloads.iter().any(|p| p == payload) {
            return Ok(());
        }
        Err(HarnessError::assertion(format!(
            "no transmission equals {}\ncaptured:\n{}",
            hex_dump(payload),
            numbered(&payloads)
        )))
    }

    /// Assert the transmission at `index` went out on `channel_id`.
    pub fn assert_channel(&self, index: usize, channel_id: u8) -> Result<()> {
        let record = self.get(index)?;
        if record.channel_id != channel_id {
            return Err(HarnessError::assertion(format!(
                "transmission {} went to UART{}, expected UART{}",
                index, record.channel_id, channel_id
            )));
        }
        Ok(())
    }

    /// Wait until at least `count` transmissions have been captured.
    ///
    /// Meant for tests polling a running scheduler. Returns the count seen.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Timeout`] if the count is not reached within `timeout`.
    pub async fn wait_for_count(&self, count: usize, timeout: Duration) -> Result<usize> {
        let mut rx = self.count_tx.subscribe();
        let waited = tokio::time::timeout(timeout, async {
            rx.wait_for(|&seen| seen >= count).await.map(|seen| *seen)
        })
        .await;

        match waited {
            Ok(Ok(seen)) => Ok(seen),
            // The sender lives as long as `self`, so only the timeout can fire.
            Ok(Err(_)) | Err(_) => Err(HarnessError::Timeout { duration: timeout }),
        }
    }

    /// Stream of capture counts, yielding the current count first.
    pub fn count_updates(&self) -> WatchStream<usize> {
        WatchStream::new(self.count_tx.subscribe())
    }

    /// Log every record at `info` and return the same listing.
    pub fn dump(&self) -> String {
        let records = self.records();
        let mut listing = format!("{} serial transmissions", records.len());
        for (index, record) in records.iter().enumerate() {
            listing.push_str(&format!(
                "\n  [{}] UART{} size={} timeout={}: {}",
                index,
                record.channel_id,
                record.declared_size,
                record.timeout,
                hex_dump(&record.payload)
            ));
        }
        info!("{}", listing);
        listing
    }
}

fn numbered(payloads: &[Vec<u8>]) -> String {
    if payloads.is_empty() {
        return "  (none)".to_string();
    }
    payloads
        .iter()
        .enumerate()
        .map(|(i, p)| format!("  [{}] {}", i, hex_dump(p)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn compare_sequence<P: AsRef<[u8]>>(what: &str, actual: &[Vec<u8>], expected: &[P]) -> Result<()> {
    if actual.len() != expected.len() {
        let expected_owned: Vec<Vec<u8>> = expected.iter().map(|p| p.as_ref().to_vec()).collect();
        return Err(HarnessError::assertion(format!(
            "expected {} {}s, captured {}\nexpected:\n{}\ncaptured:\n{}",
            expected.len(),
            what,
            actual.len(),
            numbered(&expected_owned),
            numbered(actual)
        )));
    }

    for (index, (actual, expected)) in actual.iter().zip(expected).enumerate() {
        let expected = expected.as_ref();
        if actual.as_slice() != expected {
            return Err(HarnessError::assertion(format!(
                "{} {} differs\n  expected: {}\n  actual:   {}",
                what,
                index,
                hex_dump(expected),
                hex_dump(actual)
            )));
        }
    }
    Ok(())
}
