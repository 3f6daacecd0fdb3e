//! Simulation input keys

use serde::{Deserialize, Serialize};

/// Navigation keys the simulated front panel exposes.
///
/// Discriminants are the values the device model receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SimulationKey {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl SimulationKey {
    pub const ALL: [SimulationKey; 4] =
        [SimulationKey::Up, SimulationKey::Down, SimulationKey::Left, SimulationKey::Right];

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for SimulationKey {
    type Error = crate::HarnessError;

    fn try_from(code: u8) -> crate::Result<Self> {
        match code {
            0 => Ok(SimulationKey::Up),
            1 => Ok(SimulationKey::Down),
            2 => Ok(SimulationKey::Left),
            3 => Ok(SimulationKey::Right),
            other => Err(crate::HarnessError::invalid_value(format!(
                "unknown simulation key code {}",
                other
            ))),
        }
    }
}
