//! Test utilities for fixture loading and test data access
//!
//! Wire fixtures live under `test-data/wire/` as YAML. Byte strings are
//! written as space separated hex so a fixture reads like a logic analyzer
//! capture.

#![cfg(any(test, feature = "benchmark"))]

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

/// Error returned when a required fixture cannot be located or parsed.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct FixtureError {
    message: String,
}

impl FixtureError {
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// The crate's `test-data/` directory.
pub fn test_data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("test-data")
}

/// Require that a specific fixture exists on disk.
pub fn require_fixture<P: AsRef<Path>>(path: P) -> Result<PathBuf, FixtureError> {
    let path_ref = path.as_ref();
    if path_ref.exists() {
        Ok(path_ref.to_path_buf())
    } else {
        Err(FixtureError::new(format!("Missing test fixture: {}", path_ref.display())))
    }
}

/// Parse `"0B 00 FF"` style hex into bytes. Whitespace is optional.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, FixtureError> {
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(FixtureError::new(format!("odd number of hex digits in {:?}", text)));
    }
    digits
        .chunks(2)
        .map(|pair| {
            let byte: String = pair.iter().collect();
            u8::from_str_radix(&byte, 16)
                .map_err(|_| FixtureError::new(format!("invalid hex byte {:?} in {:?}", byte, text)))
        })
        .collect()
}

fn hex_bytes<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_hex(&text).map_err(serde::de::Error::custom)
}

/// One expected telemetry message.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageFixture {
    pub source_id: u8,
    #[serde(deserialize_with = "hex_bytes")]
    pub value: Vec<u8>,
    /// Unframed message bytes.
    #[serde(deserialize_with = "hex_bytes")]
    pub bytes: Vec<u8>,
}

/// Expected device output for one tick at the given counter values.
#[derive(Debug, Clone, Deserialize)]
pub struct WireFixture {
    pub description: String,
    pub counters: [u32; 4],
    pub messages: Vec<MessageFixture>,
    #[serde(default)]
    pub storage_writes: Vec<String>,
}

impl WireFixture {
    /// Expected transmissions: every message COBS framed.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.messages.iter().map(|m| crate::cobs::encode(&m.bytes)).collect()
    }
}

/// Load `test-data/wire/<name>`.
pub fn load_wire_fixture(name: &str) -> Result<WireFixture, FixtureError> {
    let path = require_fixture(test_data_dir().join("wire").join(name))?;
    let text = std::fs::read_to_string(&path)
        .map_err(|e| FixtureError::new(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_yaml_ng::from_str(&text)
        .map_err(|e| FixtureError::new(format!("Failed to parse {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn test_data_dir_exists() {
        let dir = test_data_dir();
        assert!(dir.is_dir(), "test-data should be a directory: {}", dir.display());
    }

    #[test]
    fn parse_hex_accepts_spaced_and_packed() -> Result<()> {
        assert_eq!(parse_hex("0B 00 ff")?, vec![0x0B, 0x00, 0xFF]);
        assert_eq!(parse_hex("0b00ff")?, vec![0x0B, 0x00, 0xFF]);
        assert!(parse_hex("")?.is_empty());
        assert!(parse_hex("0B 0").is_err());
        assert!(parse_hex("GG").is_err());
        Ok(())
    }

    #[test]
    fn wire_fixtures_load() -> Result<()> {
        for name in ["pulse_counters.yaml", "initial_tick.yaml"] {
            let fixture = load_wire_fixture(name).with_context(|| format!("loading {}", name))?;
            assert_eq!(fixture.messages.len(), 5, "{}", fixture.description);
            assert_eq!(fixture.frames().len(), 5);
            assert_eq!(fixture.storage_writes.len(), 5);
        }
        Ok(())
    }

    #[test]
    fn require_fixture_errors_when_missing() {
        let result = require_fixture(Path::new("test-data/__missing_fixture"));
        let message = result.unwrap_err().to_string();
        assert!(message.contains("Missing test fixture"));
    }
}
