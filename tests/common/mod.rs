//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use firmware_harness::{DeviceModel, Peripherals, SimulationKey, cobs};
use serde::Deserialize;

pub fn test_data(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("test-data").join(relative)
}

/// Copy of `firmware_harness::test_utils::parse_hex`, which is gated behind
/// `cfg(test)` and not visible here. Whitespace is ignored, so spaced and
/// packed hex both parse.
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        bail!("odd number of hex digits in {:?}", text);
    }
    digits
        .chunks(2)
        .map(|pair| {
            let byte: String = pair.iter().collect();
            u8::from_str_radix(&byte, 16).with_context(|| format!("bad hex byte {:?} in {:?}", byte, text))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ScriptFile {
    description: String,
    channel: u8,
    timeout: u32,
    responses: Vec<ScriptResponse>,
}

#[derive(Debug, Deserialize)]
struct ScriptResponse {
    counters: [u32; 4],
    messages: Vec<String>,
}

/// Device double replaying recorded transmissions.
///
/// Each counter update selects the recorded response for those counters; the
/// next tick emits it once. Ticks without a matching update stay silent.
#[derive(Debug)]
pub struct ScriptedDevice {
    pub description: String,
    channel: u8,
    timeout: u32,
    responses: Vec<([u32; 4], Vec<Vec<u8>>)>,
    pending: Option<usize>,
    pub counter_updates: Vec<[u32; 4]>,
    pub keys: Vec<SimulationKey>,
    pub inits: usize,
}

impl ScriptedDevice {
    pub fn load(name: &str) -> Result<Self> {
        let path = test_data(&format!("scripted/{}", name));
        let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let script: ScriptFile = serde_yaml_ng::from_str(&text)?;

        let mut responses = Vec::with_capacity(script.responses.len());
        for response in &script.responses {
            let messages = response.messages.iter().map(|m| parse_hex(m)).collect::<Result<Vec<_>>>()?;
            responses.push((response.counters, messages));
        }

        Ok(Self {
            description: script.description,
            channel: script.channel,
            timeout: script.timeout,
            responses,
            pending: None,
            counter_updates: Vec::new(),
            keys: Vec::new(),
            inits: 0,
        })
    }

    /// Raw (unframed) messages recorded for `counters`.
    pub fn response_for(&self, counters: [u32; 4]) -> Vec<Vec<u8>> {
        self.responses
            .iter()
            .find(|(recorded, _)| *recorded == counters)
            .map(|(_, messages)| messages.clone())
            .unwrap_or_default()
    }
}

impl DeviceModel for ScriptedDevice {
    fn init(&mut self, io: &mut dyn Peripherals) -> firmware_harness::Result<()> {
        self.inits += 1;
        io.sdcard_initialize();
        io.sdcard_start();
        Ok(())
    }

    fn tick(&mut self, io: &mut dyn Peripherals) -> firmware_harness::Result<()> {
        let Some(index) = self.pending.take() else {
            return Ok(());
        };
        for message in &self.responses[index].1 {
            let frame = cobs::encode(message);
            io.serial_tx(self.channel, &frame, frame.len() as u16, self.timeout);
        }
        Ok(())
    }

    fn key_pressed(&mut self, key: SimulationKey) {
        self.keys.push(key);
    }

    fn update_pulse_counters(&mut self, counters: [u32; 4]) {
        self.counter_updates.push(counters);
        self.pending = self.responses.iter().position(|(recorded, _)| *recorded == counters);
    }
}

#[derive(Debug, Deserialize)]
struct WireFile {
    description: String,
    counters: [u32; 4],
    messages: Vec<WireMessage>,
    storage_writes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    source_id: u8,
    value: String,
    bytes: String,
}

/// Expected reference device output for one tick.
#[derive(Debug)]
pub struct TickExpectation {
    pub description: String,
    pub counters: [u32; 4],
    pub sources: Vec<u8>,
    pub values: Vec<Vec<u8>>,
    pub messages: Vec<Vec<u8>>,
    pub storage_writes: Vec<String>,
}

impl TickExpectation {
    pub fn load(name: &str) -> Result<Self> {
        let path = test_data(&format!("wire/{}", name));
        let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let file: WireFile = serde_yaml_ng::from_str(&text)?;
        if file.messages.is_empty() {
            bail!("{} lists no messages", path.display());
        }

        let mut expectation = Self {
            description: file.description,
            counters: file.counters,
            sources: Vec::new(),
            values: Vec::new(),
            messages: Vec::new(),
            storage_writes: file.storage_writes,
        };
        for message in file.messages {
            expectation.sources.push(message.source_id);
            expectation.values.push(parse_hex(&message.value)?);
            expectation.messages.push(parse_hex(&message.bytes)?);
        }
        Ok(expectation)
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.messages.iter().map(|m| cobs::encode(m)).collect()
    }
}
