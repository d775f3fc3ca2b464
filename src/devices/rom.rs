//! ROM device implementation.
//!
//! Provides read-only storage via the Device trait.

use super::ram::memory_bytes;
use super::{Device, DeviceState};
use crate::StateError;

/// Read-only memory.
///
/// Writes are silently ignored, matching ROM hardware. A snapshot carries the
/// image so a restored system runs the same code.
///
/// # Examples
///
/// ```rust
/// use lib65c02::{Device, RomDevice};
///
/// let mut rom = RomDevice::new(vec![0xEA, 0xEA, 0xEA]);
/// assert_eq!(rom.read(0), 0xEA);
///
/// rom.write(0, 0xFF);
/// assert_eq!(rom.read(0), 0xEA);
/// ```
pub struct RomDevice {
    data: Vec<u8>,
}

impl RomDevice {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl Device for RomDevice {
    fn name(&self) -> &str {
        "rom"
    }

    fn size(&self) -> u32 {
        self.data.len() as u32
    }

    fn read(&self, offset: u16) -> u8 {
        self.data.get(offset as usize).copied().unwrap_or(0xFF)
    }

    fn write(&mut self, _offset: u16, _value: u8) {}

    fn get_state(&self) -> DeviceState {
        DeviceState::Memory {
            bytes: self.data.clone(),
        }
    }

    fn validate_state(&self, state: &DeviceState) -> Result<(), StateError> {
        memory_bytes(state, self.data.len()).map(|_| ())
    }

    fn set_state(&mut self, state: &DeviceState) -> Result<(), StateError> {
        let bytes = memory_bytes(state, self.data.len())?;
        self.data.copy_from_slice(bytes);
        Ok(())
    }
}
