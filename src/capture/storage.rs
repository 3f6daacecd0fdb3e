//! SD card storage capture

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use super::lock_state;
use crate::types::{OpenMode, StorageOperation, StorageOperationKind};
use crate::{HarnessError, Result};

/// Status code the storage callbacks report back to the firmware.
pub const STORAGE_STATUS_OK: u8 = 0;

#[derive(Debug, Default)]
struct StorageState {
    operations: Vec<StorageOperation>,
    current_file: Option<String>,
    file_open: bool,
}

/// Records every storage call the device makes, in call order.
///
/// Besides the operation log the capture tracks the most recently opened
/// file and whether it is still open, which is what the firmware would see
/// from a real card.
#[derive(Debug, Clone, Default)]
pub struct StorageCapture {
    state: Arc<Mutex<StorageState>>,
}

impl StorageCapture {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, operation: StorageOperation) {
        debug!("SD {}", operation);
        lock_state(&self.state).operations.push(operation);
    }

    pub fn initialize(&self) -> bool {
        self.push(StorageOperation::Initialize);
        true
    }

    pub fn start(&self) -> bool {
        self.push(StorageOperation::Start);
        true
    }

    pub fn stop(&self) -> bool {
        self.push(StorageOperation::Stop);
        true
    }

    /// Card reset as requested by the device (not [`reset`](Self::reset)).
    pub fn reset_device(&self) -> bool {
        self.push(StorageOperation::Reset);
        true
    }

    pub fn open(&self, filename: &str, mode: u8) -> u8 {
        let operation = StorageOperation::Open { filename: filename.to_string(), mode: OpenMode::from(mode) };
        debug!("SD {}", operation);

        let mut state = lock_state(&self.state);
        state.operations.push(operation);
        state.current_file = Some(filename.to_string());
        state.file_open = true;
        STORAGE_STATUS_OK
    }

    pub fn write(&self, payload: &[u8], declared_size: u16) -> u8 {
        self.push(StorageOperation::Write { payload: payload.to_vec(), declared_size });
        STORAGE_STATUS_OK
    }

    pub fn close(&self) -> u8 {
        debug!("SD close");
        let mut state = lock_state(&self.state);
        state.operations.push(StorageOperation::Close);
        state.file_open = false;
        STORAGE_STATUS_OK
    }

    /// Every write payload as text, in order.
    pub fn get_all_writes(&self) -> Vec<String> {
        lock_state(&self.state)
            .operations
            .iter()
            .filter_map(StorageOperation::write_text)
            .collect()
    }

    /// Clear the operation log and the file tracking.
    pub fn reset(&self) {
        let mut state = lock_state(&self.state);
        state.operations.clear();
        state.current_file = None;
        state.file_open = false;
    }

    pub fn count(&self) -> usize {
        lock_state(&self.state).operations.len()
    }

    pub fn get(&self, index: usize) -> Result<StorageOperation> {
        let state = lock_state(&self.state);
        state
            .operations
            .get(index)
            .cloned()
            .ok_or_else(|| HarnessError::index_out_of_range(index, state.operations.len()))
    }

    pub fn operations(&self) -> Vec<StorageOperation> {
        lock_state(&self.state).operations.clone()
    }

    /// Name passed to the most recent `open`, even if since closed.
    pub fn current_file(&self) -> Option<String> {
        lock_state(&self.state).current_file.clone()
    }

    pub fn is_file_open(&self) -> bool {
        lock_state(&self.state).file_open
    }

    pub fn assert_count(&self, expected: usize) -> Result<()> {
        let actual = self.count();
        if actual != expected {
            return Err(HarnessError::assertion(format!(
                "expected {} storage operations, captured {}\n{}",
                expected,
                actual,
                self.listing()
            )));
        }
        Ok(())
    }

    pub fn assert_operation_kind(&self, index: usize, kind: StorageOperationKind) -> Result<()> {
        let operation = self.get(index)?;
        if operation.kind() != kind {
            return Err(HarnessError::assertion(format!(
                "storage operation {} is {}, expected {}",
                index, operation, kind
            )));
        }
        Ok(())
    }

    /// Assert operation `index` is a write of exactly `expected`.
    pub fn assert_write_data(&self, index: usize, expected: &str) -> Result<()> {
        let operation = self.get(index)?;
        match operation.write_text() {
            Some(text) if text == expected => Ok(()),
            Some(text) => Err(HarnessError::assertion(format!(
                "storage write {} differs\n  expected: {:?}\n  actual:   {:?}",
                index, expected, text
            ))),
            None => Err(HarnessError::assertion(format!(
                "storage operation {} is {}, expected a write",
                index, operation
            ))),
        }
    }

    fn listing(&self) -> String {
        let state = lock_state(&self.state);
        let mut listing = format!("{} storage operations", state.operations.len());
        for (index, operation) in state.operations.iter().enumerate() {
            listing.push_str(&format!("\n  [{}] {}", index, operation));
        }
        if let Some(file) = &state.current_file {
            listing.push_str(&format!(
                "\n  current file: {} ({})",
                file,
                if state.file_open { "open" } else { "closed" }
            ));
        }
        listing
    }

    /// Log every operation at `info` and return the same listing.
    pub fn dump(&self) -> String {
        let listing = self.listing();
        info!("{}", listing);
        listing
    }
}
