//! Per-source value widths

use std::collections::BTreeMap;

/// Source id of the auxiliary UART reading.
pub const UART_SOURCE_ID: u8 = 4;

/// Value width in bytes for each source id the device may report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireLayout {
    widths: BTreeMap<u8, usize>,
}

impl WireLayout {
    /// Layout with no sources.
    pub fn empty() -> Self {
        Self { widths: BTreeMap::new() }
    }

    /// Add or replace a source.
    pub fn with_source(mut self, source_id: u8, width: usize) -> Self {
        self.widths.insert(source_id, width);
        self
    }

    pub fn width(&self, source_id: u8) -> Option<usize> {
        self.widths.get(&source_id).copied()
    }

    /// `(source_id, width)` pairs in ascending source order.
    pub fn sources(&self) -> impl Iterator<Item = (u8, usize)> + '_ {
        self.widths.iter().map(|(&id, &width)| (id, width))
    }

    pub fn len(&self) -> usize {
        self.widths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }
}

impl Default for WireLayout {
    /// Four u32 pulse counters on sources 0..=3 and the u16 UART reading on 4.
    fn default() -> Self {
        (0..4)
            .fold(Self::empty(), |layout, id| layout.with_source(id, 4))
            .with_source(UART_SOURCE_ID, 2)
    }
}
