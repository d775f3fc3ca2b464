//! RAM device implementation.
//!
//! Provides readable and writable storage via the Device trait.

use super::{Device, DeviceState};
use crate::StateError;

/// Readable and writable memory.
///
/// Contents survive [`Device::reset`]; only power-on (construction) clears
/// them.
///
/// # Examples
///
/// ```rust
/// use lib65c02::{Device, RamDevice};
///
/// let mut ram = RamDevice::new(1024);
/// ram.write(0x42, 0xAA);
/// assert_eq!(ram.read(0x42), 0xAA);
/// ```
pub struct RamDevice {
    data: Vec<u8>,
}

impl RamDevice {
    /// Creates `size` bytes of zeroed RAM.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    /// Copies `bytes` into RAM starting at `offset`, stopping at the end of
    /// the device.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lib65c02::{Device, RamDevice};
    ///
    /// let mut ram = RamDevice::new(1024);
    /// ram.load_bytes(0x100, &[0x01, 0x02, 0x03]);
    /// assert_eq!(ram.read(0x102), 0x03);
    /// ```
    pub fn load_bytes(&mut self, offset: u16, bytes: &[u8]) {
        let start = (offset as usize).min(self.data.len());
        let end = (start + bytes.len()).min(self.data.len());
        self.data[start..end].copy_from_slice(&bytes[..end - start]);
    }
}

impl Device for RamDevice {
    fn name(&self) -> &str {
        "ram"
    }

    fn size(&self) -> u32 {
        self.data.len() as u32
    }

    fn read(&self, offset: u16) -> u8 {
        self.data.get(offset as usize).copied().unwrap_or(0xFF)
    }

    fn write(&mut self, offset: u16, value: u8) {
        if let Some(byte) = self.data.get_mut(offset as usize) {
            *byte = value;
        }
    }

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

/// The bytes of a `Memory` snapshot, checked against the device size.
pub(crate) fn memory_bytes(state: &DeviceState, size: usize) -> Result<&[u8], StateError> {
    match state {
        DeviceState::Memory { bytes } if bytes.len() == size => Ok(bytes),
        DeviceState::Memory { bytes } => Err(StateError::SizeMismatch {
            expected: size,
            found: bytes.len(),
        }),
        other => Err(StateError::DeviceMismatch {
            expected: "memory".to_string(),
            found: other.kind().to_string(),
        }),
    }
}
