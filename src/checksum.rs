//! Pluggable message checksums.
//!
//! Telemetry messages carry a trailing 32-bit integrity value. The harness
//! does not care how it is computed as long as the device and the verifier
//! agree, so the algorithm sits behind the [`Checksum`] trait. [`Crc32`] is
//! the standard reflected CRC-32 (polynomial 0xEDB88320, init and final XOR
//! 0xFFFFFFFF) the reference firmware uses.

/// Computes a 32-bit checksum over a byte slice.
pub trait Checksum: Send + Sync {
    /// Checksum of `data`.
    fn compute(&self, data: &[u8]) -> u32;

    /// Short algorithm name used in diagnostics.
    fn name(&self) -> &'static str;
}

/// Reflected CRC-32 (IEEE 802.3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Crc32;

const CRC32_POLYNOMIAL: u32 = 0xEDB8_8320;

const CRC32_TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut index = 0;
    while index < 256 {
        let mut value = index as u32;
        let mut bit = 0;
        while bit < 8 {
            value = if value & 1 != 0 { (value >> 1) ^ CRC32_POLYNOMIAL } else { value >> 1 };
            bit += 1;
        }
        table[index] = value;
        index += 1;
    }
    table
}

impl Crc32 {
    /// Compute the CRC-32 of `data` without going through the trait object.
    pub fn checksum(data: &[u8]) -> u32 {
        let crc = data.iter().fold(0xFFFF_FFFFu32, |crc, &byte| {
            CRC32_TABLE[((crc ^ byte as u32) & 0xFF) as usize] ^ (crc >> 8)
        });
        !crc
    }
}

impl Checksum for Crc32 {
    fn compute(&self, data: &[u8]) -> u32 {
        Self::checksum(data)
    }

    fn name(&self) -> &'static str {
        "crc32"
    }
}
