//! Harness configuration loaded from YAML
//!
//! ```yaml
//! tick_interval_ms: 20
//! serial_verbose: false
//! wire:
//!   sources:
//!     - { id: 0, width: 4 }
//!     - { id: 4, width: 2 }
//! ```
//!
//! Every field is optional; missing fields take the defaults of
//! [`HarnessConfig::default`].

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::wire::WireLayout;
use crate::{HarnessError, Result};

/// Value widths a source may declare.
pub const SUPPORTED_WIDTHS: [usize; 4] = [1, 2, 4, 8];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Scheduler tick period in milliseconds.
    pub tick_interval_ms: u64,
    /// Log a hex dump of every serial transmission.
    pub serial_verbose: bool,
    pub wire: WireConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self { tick_interval_ms: 20, serial_verbose: true, wire: WireConfig::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireConfig {
    pub sources: Vec<SourceWidth>,
}

impl Default for WireConfig {
    fn default() -> Self {
        let sources = WireLayout::default()
            .sources()
            .map(|(id, width)| SourceWidth { id, width })
            .collect();
        Self { sources }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceWidth {
    pub id: u8,
    pub width: usize,
}

impl HarnessConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| HarnessError::config_file(path.to_path_buf(), e))?;
        let config = Self::from_yaml_str(&yaml)?;
        debug!("Loaded harness config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// # Errors
    ///
    /// [`HarnessError::Value`] for a zero tick interval, an unsupported value
    /// width or a source listed twice.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(HarnessError::invalid_value("tick_interval_ms must be greater than 0"));
        }

        let mut seen = BTreeSet::new();
        for source in &self.wire.sources {
            if !SUPPORTED_WIDTHS.contains(&source.width) {
                return Err(HarnessError::invalid_value(format!(
                    "source {} has width {}, expected one of {:?}",
                    source.id, source.width, SUPPORTED_WIDTHS
                )));
            }
            if !seen.insert(source.id) {
                return Err(HarnessError::invalid_value(format!(
                    "source {} is listed more than once",
                    source.id
                )));
            }
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn wire_layout(&self) -> WireLayout {
        self.wire
            .sources
            .iter()
            .fold(WireLayout::empty(), |layout, source| layout.with_source(source.id, source.width))
    }
}
