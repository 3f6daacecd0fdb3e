//! Error types for the firmware harness.
//!
//! Every fallible operation in this crate returns [`HarnessError`]. Errors are
//! always surfaced to the caller: nothing in the harness retries or swallows a
//! failure, because each one points at either a protocol bug in the device
//! model or a usage bug in the test driving it.
//!
//! ## Error Categories
//!
//! - **Framing Errors**: malformed COBS frames (missing delimiter, zero code byte)
//! - **Value Errors**: wrong-arity counter updates and invalid configuration values
//! - **Index Errors**: capture lookups past the recorded count
//! - **Checksum Errors**: telemetry integrity mismatches
//! - **Assertion Failures**: expectation mismatches raised by the capture helpers
//! - **Scheduler Errors**: tick loop failures, panics and faulted schedulers
//!
//! ## Helper Constructors
//!
//! ```rust
//! use firmware_harness::HarnessError;
//!
//! let framing = HarnessError::framing("missing trailing 0x00 delimiter");
//! assert!(framing.to_string().contains("delimiter"));
//!
//! let lookup = HarnessError::index_out_of_range(3, 2);
//! assert!(lookup.to_string().contains("only 2 captured"));
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for harness operations.
pub type Result<T, E = HarnessError> = std::result::Result<T, E>;

/// Main error type for harness operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HarnessError {
    #[error("Framing error: {reason}")]
    Framing { reason: String },

    #[error("Invalid value: {reason}")]
    Value { reason: String },

    #[error("No record at index {index}, only {count} captured")]
    Index { index: usize, count: usize },

    #[error("Checksum mismatch: expected {expected:#010x}, actual {actual:#010x}")]
    Checksum { expected: u32, actual: u32 },

    #[error("Assertion failed: {message}")]
    Assertion { message: String },

    #[error("Protocol error: {reason}")]
    Protocol { reason: String },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Device model failure: {reason}")]
    Device {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Scheduler faulted after a tick failure; construct a new scheduler")]
    SchedulerFaulted,

    #[error("Tick loop panicked: {reason}")]
    TaskPanicked { reason: String },

    #[error("Shared state poisoned: {resource}")]
    Poisoned { resource: String },

    #[error("Configuration file error: {path}")]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration parse error: {details}")]
    ConfigParse { details: String },
}

impl HarnessError {
    /// Returns whether this error leaves the owning scheduler unusable.
    ///
    /// A fatal error means the scheduler instance must be dropped and rebuilt
    /// before ticking again.
    pub fn is_fatal(&self) -> bool {
        match self {
            HarnessError::Device { .. } => true,
            HarnessError::SchedulerFaulted => true,
            HarnessError::TaskPanicked { .. } => true,
            HarnessError::Poisoned { .. } => true,
            HarnessError::Framing { .. } => false,
            HarnessError::Value { .. } => false,
            HarnessError::Index { .. } => false,
            HarnessError::Checksum { .. } => false,
            HarnessError::Assertion { .. } => false,
            HarnessError::Protocol { .. } => false,
            HarnessError::Timeout { .. } => false,
            HarnessError::Config { .. } => false,
            HarnessError::ConfigParse { .. } => false,
        }
    }

    /// Helper constructor for framing errors.
    pub fn framing(reason: impl Into<String>) -> Self {
        HarnessError::Framing { reason: reason.into() }
    }

    /// Helper constructor for value errors.
    pub fn invalid_value(reason: impl Into<String>) -> Self {
        HarnessError::Value { reason: reason.into() }
    }

    /// Helper constructor for out-of-range capture lookups.
    pub fn index_out_of_range(index: usize, count: usize) -> Self {
        HarnessError::Index { index, count }
    }

    /// Helper constructor for failed expectations.
    pub fn assertion(message: impl Into<String>) -> Self {
        HarnessError::Assertion { message: message.into() }
    }

    /// Helper constructor for telemetry layout violations.
    pub fn protocol(reason: impl Into<String>) -> Self {
        HarnessError::Protocol { reason: reason.into() }
    }

    /// Helper constructor for device model failures.
    pub fn device_failed(reason: impl Into<String>) -> Self {
        HarnessError::Device { reason: reason.into(), source: None }
    }

    /// Helper constructor for device model failures with source.
    pub fn device_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        HarnessError::Device { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for poisoned shared state.
    pub fn poisoned(resource: impl Into<String>) -> Self {
        HarnessError::Poisoned { resource: resource.into() }
    }

    /// Helper constructor for configuration file errors.
    pub fn config_file(path: PathBuf, source: std::io::Error) -> Self {
        HarnessError::Config { path, source }
    }
}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        HarnessError::Config { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<serde_yaml_ng::Error> for HarnessError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        HarnessError::ConfigParse { details: err.to_string() }
    }
}
