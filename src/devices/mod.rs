//! Memory-mapped devices and the bus that routes between them.
//!
//! # Architecture
//!
//! - **Device trait**: the lifecycle contract every component satisfies
//!   (reset, tick, read, write, get_state, set_state)
//! - **MappedMemory**: routes reads and writes by inclusive address range,
//!   ticks devices in lock-step with the CPU and arbitrates bus mastership
//! - **Device implementations**: RAM, ROM, an interval timer and a DMA
//!   controller
//!
//! # Example
//!
//! ```rust
//! use lib65c02::{Cpu, MappedMemory, MemoryBus, RamDevice, RomDevice};
//!
//! let mut memory = MappedMemory::new();
//! memory.add_device(0x0000, 0x3FFF, Box::new(RamDevice::new(0x4000))).unwrap();
//!
//! let mut rom = vec![0xEA; 0x4000];
//! rom[0x3FFC] = 0x00; // reset vector -> $C000
//! rom[0x3FFD] = 0xC0;
//! memory.add_device(0xC000, 0xFFFF, Box::new(RomDevice::new(rom))).unwrap();
//!
//! let cpu = Cpu::new(memory);
//! assert_eq!(cpu.pc(), 0xC000);
//! ```
//!
//! # Bus Mastership
//!
//! The CPU is the default master. A DMA-capable device announces a transfer
//! through [`Device::dma_request`]; when the bus grants it mastership the bus
//! moves the bytes itself, one read cycle and one write cycle per byte, then
//! releases the bus and calls [`Device::dma_complete`]. The CPU stalls for
//! every cycle it does not own the bus.

use crate::memory::MemoryBus;
use crate::state::CpuState;
use crate::StateError;
use serde::{Deserialize, Serialize};

pub mod dma;
pub mod ram;
pub mod rom;
pub mod timer;

pub use dma::{DmaController, DmaState};
pub use ram::RamDevice;
pub use rom::RomDevice;
pub use timer::{IntervalTimer, TimerState};

/// Requestor id the CPU uses for bus mastership.
pub const CPU_MASTER: &str = "cpu";

/// A block copy a device wants the bus to perform on its behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmaTransfer {
    pub source: u16,
    pub destination: u16,
    /// Bytes to copy; addresses wrap at $FFFF.
    pub length: u16,
}

/// Structured snapshot of one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceState {
    Cpu(Box<CpuState>),
    Memory { bytes: Vec<u8> },
    Timer(TimerState),
    Dma(DmaState),
}

impl DeviceState {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            DeviceState::Cpu(_) => "cpu",
            DeviceState::Memory { .. } => "memory",
            DeviceState::Timer(_) => "timer",
            DeviceState::Dma(_) => "dma",
        }
    }
}

/// Interface shared by every component attached to the bus.
///
/// Devices are addressed by offset (0 to size-1); the bus subtracts the
/// mapping's start address before calling in.
///
/// # Design
///
/// - **Immutable read**: side effects of reading (clearing a status flag)
///   use interior mutability
/// - **Mutable write**: explicit side effects
/// - **Checked state**: `set_state` validates before it mutates
///
/// # Examples
///
/// ```rust
/// use lib65c02::{Device, DeviceState, StateError};
///
/// struct Latch {
///     value: u8,
/// }
///
/// impl Device for Latch {
///     fn name(&self) -> &str {
///         "latch"
///     }
///
///     fn size(&self) -> u32 {
///         1
///     }
///
///     fn read(&self, _offset: u16) -> u8 {
///         self.value
///     }
///
///     fn write(&mut self, _offset: u16, value: u8) {
///         self.value = value;
///     }
///
///     fn get_state(&self) -> DeviceState {
///         DeviceState::Memory { bytes: vec![self.value] }
///     }
///
///     fn validate_state(&self, state: &DeviceState) -> Result<(), StateError> {
///         match state {
///             DeviceState::Memory { bytes } if bytes.len() == 1 => Ok(()),
///             _ => Err(StateError::DeviceMismatch {
///                 expected: "memory".into(),
///                 found: state.kind().into(),
///             }),
///         }
///     }
///
///     fn set_state(&mut self, state: &DeviceState) -> Result<(), StateError> {
///         self.validate_state(state)?;
///         if let DeviceState::Memory { bytes } = state {
///             self.value = bytes[0];
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Device {
    /// Identifier used for mastership requests, interrupt sources and
    /// snapshots.
    fn name(&self) -> &str;

    /// Number of addressable bytes.
    fn size(&self) -> u32 {
        0x10000
    }

    /// Returns the device to its power-on state.
    fn reset(&mut self) {}

    /// Advances the device by `cycles` of its own clock; returns the cycles
    /// consumed.
    fn tick(&mut self, cycles: u32) -> u32 {
        cycles
    }

    fn read(&self, offset: u16) -> u8;

    fn write(&mut self, offset: u16, value: u8);

    fn get_state(&self) -> DeviceState;

    /// Checks that `state` could be applied, without applying it.
    fn validate_state(&self, state: &DeviceState) -> Result<(), StateError>;

    /// Replaces the device state. On error nothing changes.
    fn set_state(&mut self, state: &DeviceState) -> Result<(), StateError>;

    /// A transfer the device wants the bus to run. Polled after every tick
    /// until the transfer completes.
    fn dma_request(&self) -> Option<DmaTransfer> {
        None
    }

    /// Called once the bus has finished the requested transfer.
    fn dma_complete(&mut self) {}
}

/// Error returned when a device cannot be mapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressMappingError {
    /// The new range intersects a mapped one.
    Overlap {
        new_start: u16,
        new_end: u16,
        existing_start: u16,
        existing_end: u16,
    },
    /// The end lies below the start, or the device is smaller than the range.
    InvalidRange { start: u16, end: u16, device_size: u32 },
}

impl std::fmt::Display for AddressMappingError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AddressMappingError::Overlap {
                new_start,
                new_end,
                existing_start,
                existing_end,
            } => write!(
                f,
                "Device address range overlap: ${:04X}-${:04X} overlaps existing ${:04X}-${:04X}",
                new_start, new_end, existing_start, existing_end
            ),
            AddressMappingError::InvalidRange {
                start,
                end,
                device_size,
            } => write!(
                f,
                "Invalid device range ${:04X}-${:04X} for a device of {} bytes",
                start, end, device_size
            ),
        }
    }
}

impl std::error::Error for AddressMappingError {}

/// One device's snapshot together with where it is mapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedDeviceState {
    pub name: String,
    pub start: u16,
    pub end: u16,
    pub state: DeviceState,
}

/// Arbitration and in-flight DMA, as stored in a system snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusState {
    /// Current non-CPU master, if any.
    pub holder: Option<String>,
    pub dma: Option<DmaProgress>,
}

/// Position inside a running bus transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmaProgress {
    /// Index of the owning device in mapping order.
    pub owner: usize,
    pub transfer: DmaTransfer,
    /// Bytes already written.
    pub index: u16,
    /// Byte read but not yet written.
    pub latch: Option<u8>,
}

struct DeviceMapping {
    start: u16,
    end: u16,
    device: Box<dyn Device>,
    divider: u32,
    residue: u32,
}

impl DeviceMapping {
    fn contains(&self, addr: u16) -> bool {
        addr >= self.start && addr <= self.end
    }
}

/// Address decoder, device clock and bus arbiter.
///
/// Unmapped reads return `$FF` (floating bus); unmapped writes are ignored.
///
/// # Examples
///
/// ```rust
/// use lib65c02::{MappedMemory, MemoryBus, RamDevice};
///
/// let mut memory = MappedMemory::new();
/// memory.add_device(0x0000, 0x3FFF, Box::new(RamDevice::new(0x4000))).unwrap();
///
/// memory.write(0x1234, 0x42);
/// assert_eq!(memory.read(0x1234), 0x42);
/// assert_eq!(memory.read(0x8000), 0xFF);
///
/// // Overlapping ranges are rejected at mapping time
/// assert!(memory
///     .add_device(0x3000, 0x4FFF, Box::new(RamDevice::new(0x2000)))
///     .is_err());
/// ```
pub struct MappedMemory {
    devices: Vec<DeviceMapping>,
    unmapped_value: u8,
    holder: Option<String>,
    active_dma: Option<DmaProgress>,
}

impl MappedMemory {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            unmapped_value: 0xFF,
            holder: None,
            active_dma: None,
        }
    }

    /// Maps `device` at `start..=end`, ticking it on every master cycle.
    ///
    /// # Errors
    ///
    /// [`AddressMappingError::InvalidRange`] when `end < start` or the device
    /// has fewer bytes than the range; [`AddressMappingError::Overlap`] when
    /// the range intersects an existing mapping.
    pub fn add_device(
        &mut self,
        start: u16,
        end: u16,
        device: Box<dyn Device>,
    ) -> Result<(), AddressMappingError> {
        self.add_device_with_divider(start, end, device, 1)
    }

    /// Maps `device` at `start..=end`, ticking it once every `divider` master
    /// cycles. Leftover cycles carry over to the next tick. A divider of 0 is
    /// treated as 1.
    pub fn add_device_with_divider(
        &mut self,
        start: u16,
        end: u16,
        device: Box<dyn Device>,
        divider: u32,
    ) -> Result<(), AddressMappingError> {
        let span = (end as u32).wrapping_sub(start as u32).wrapping_add(1);
        if end < start || device.size() < span {
            return Err(AddressMappingError::InvalidRange {
                start,
                end,
                device_size: device.size(),
            });
        }

        if let Some(existing) = self
            .devices
            .iter()
            .find(|m| start <= m.end && m.start <= end)
        {
            return Err(AddressMappingError::Overlap {
                new_start: start,
                new_end: end,
                existing_start: existing.start,
                existing_end: existing.end,
            });
        }

        log::debug!(
            "mapped {} at ${:04X}-${:04X} (divider {})",
            device.name(),
            start,
            end,
            divider.max(1)
        );
        self.devices.push(DeviceMapping {
            start,
            end,
            device,
            divider: divider.max(1),
            residue: 0,
        });
        Ok(())
    }

    fn find(&self, addr: u16) -> Option<&DeviceMapping> {
        self.devices.iter().find(|m| m.contains(addr))
    }

    fn find_mut(&mut self, addr: u16) -> Option<&mut DeviceMapping> {
        self.devices.iter_mut().find(|m| m.contains(addr))
    }

    /// The first mapped device called `name`.
    pub fn device(&self, name: &str) -> Option<&dyn Device> {
        self.devices
            .iter()
            .find(|m| m.device.name() == name)
            .map(|m| m.device.as_ref())
    }

    /// Mapped ranges in mapping order, as `(name, start, end)`.
    pub fn mappings(&self) -> Vec<(String, u16, u16)> {
        self.devices
            .iter()
            .map(|m| (m.device.name().to_string(), m.start, m.end))
            .collect()
    }

    // ========== Arbitration ==========

    /// Asks for exclusive use of the bus.
    ///
    /// Granted when nobody else holds the bus, or when `requestor` already
    /// does. The CPU never takes the bus away from another master.
    pub fn request_mastership(&mut self, requestor: &str) -> bool {
        match &self.holder {
            Some(holder) if holder == requestor => true,
            Some(holder) => {
                log::warn!("bus mastership refused to {}: held by {}", requestor, holder);
                false
            }
            None => {
                if requestor != CPU_MASTER {
                    log::debug!("bus mastership granted to {}", requestor);
                    self.holder = Some(requestor.to_string());
                }
                true
            }
        }
    }

    /// Gives the bus back to the CPU. Does nothing unless `requestor` is the
    /// current holder.
    pub fn release_mastership(&mut self, requestor: &str) {
        if self.holder.as_deref() == Some(requestor) {
            log::debug!("bus mastership released by {}", requestor);
            self.holder = None;
        }
    }

    /// Current master.
    pub fn bus_master(&self) -> &str {
        self.holder.as_deref().unwrap_or(CPU_MASTER)
    }

    pub fn dma_active(&self) -> bool {
        self.active_dma.is_some()
    }

    // ========== Clocking ==========

    /// Advances the bus side of the system by `cycles` master cycles.
    ///
    /// Any running transfer moves first, one bus cycle per master cycle; then
    /// every device ticks (scaled by its divider); then new DMA requests are
    /// polled, so a transfer granted here starts on the next cycle.
    pub fn tick_devices(&mut self, cycles: u32) {
        for _ in 0..cycles {
            if self.active_dma.is_none() {
                break;
            }
            self.dma_cycle();
        }

        for mapping in &mut self.devices {
            let total = mapping.residue + cycles;
            let ticks = total / mapping.divider;
            mapping.residue = total % mapping.divider;
            if ticks > 0 {
                mapping.device.tick(ticks);
            }
        }

        self.poll_dma();
    }

    fn poll_dma(&mut self) {
        if self.active_dma.is_some() {
            return;
        }
        let request = self
            .devices
            .iter()
            .enumerate()
            .find_map(|(i, m)| m.device.dma_request().map(|t| (i, t)));

        if let Some((owner, transfer)) = request {
            let name = self.devices[owner].device.name().to_string();
            if self.request_mastership(&name) {
                log::debug!(
                    "DMA {}: ${:04X} -> ${:04X}, {} bytes",
                    name,
                    transfer.source,
                    transfer.destination,
                    transfer.length
                );
                self.active_dma = Some(DmaProgress {
                    owner,
                    transfer,
                    index: 0,
                    latch: None,
                });
            }
        }
    }

    fn dma_cycle(&mut self) {
        let mut dma = match self.active_dma.take() {
            Some(dma) => dma,
            None => return,
        };

        if dma.index < dma.transfer.length {
            match dma.latch.take() {
                None => {
                    let addr = dma.transfer.source.wrapping_add(dma.index);
                    dma.latch = Some(self.read(addr));
                }
                Some(value) => {
                    let addr = dma.transfer.destination.wrapping_add(dma.index);
                    self.write(addr, value);
                    dma.index += 1;
                }
            }
        }

        if dma.index >= dma.transfer.length {
            let mapping = &mut self.devices[dma.owner];
            let name = mapping.device.name().to_string();
            log::debug!("DMA {}: done, {} bytes", name, dma.transfer.length);
            mapping.device.dma_complete();
            self.release_mastership(&name);
        } else {
            self.active_dma = Some(dma);
        }
    }

    /// Resets every device and returns the bus to the CPU.
    pub fn reset_devices(&mut self) {
        for mapping in &mut self.devices {
            mapping.device.reset();
            mapping.residue = 0;
        }
        self.holder = None;
        self.active_dma = None;
    }

    // ========== State ==========

    pub fn device_states(&self) -> Vec<NamedDeviceState> {
        self.devices
            .iter()
            .map(|m| NamedDeviceState {
                name: m.device.name().to_string(),
                start: m.start,
                end: m.end,
                state: m.device.get_state(),
            })
            .collect()
    }

    pub fn bus_state(&self) -> BusState {
        BusState {
            holder: self.holder.clone(),
            dma: self.active_dma,
        }
    }

    /// Checks that `states` and `bus` match this bus's mappings.
    pub fn validate_states(
        &self,
        states: &[NamedDeviceState],
        bus: &BusState,
    ) -> Result<(), StateError> {
        if states.len() != self.devices.len() {
            return Err(StateError::DeviceCount {
                expected: self.devices.len(),
                found: states.len(),
            });
        }
        for (mapping, saved) in self.devices.iter().zip(states) {
            if mapping.device.name() != saved.name
                || mapping.start != saved.start
                || mapping.end != saved.end
            {
                return Err(StateError::DeviceMismatch {
                    expected: format!(
                        "{} at ${:04X}-${:04X}",
                        mapping.device.name(),
                        mapping.start,
                        mapping.end
                    ),
                    found: format!("{} at ${:04X}-${:04X}", saved.name, saved.start, saved.end),
                });
            }
            mapping.device.validate_state(&saved.state)?;
        }
        if let Some(dma) = &bus.dma {
            if dma.owner >= self.devices.len() {
                return Err(StateError::InvalidField {
                    field: "bus.dma.owner".to_string(),
                    reason: "no device at that index".to_string(),
                });
            }
            if dma.index > dma.transfer.length {
                return Err(StateError::InvalidField {
                    field: "bus.dma.index".to_string(),
                    reason: "past the end of the transfer".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Restores every device, all or nothing.
    pub fn restore_states(
        &mut self,
        states: &[NamedDeviceState],
        bus: &BusState,
    ) -> Result<(), StateError> {
        self.validate_states(states, bus)?;
        for (mapping, saved) in self.devices.iter_mut().zip(states) {
            mapping.device.set_state(&saved.state)?;
            mapping.residue = 0;
        }
        self.holder = bus.holder.clone();
        self.active_dma = bus.dma;
        Ok(())
    }
}

impl Default for MappedMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus for MappedMemory {
    fn read(&self, addr: u16) -> u8 {
        match self.find(addr) {
            Some(mapping) => mapping.device.read(addr - mapping.start),
            None => self.unmapped_value,
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        if let Some(mapping) = self.find_mut(addr) {
            let offset = addr - mapping.start;
            mapping.device.write(offset, value);
        }
    }

    fn cpu_has_bus(&self) -> bool {
        self.holder.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts ticks and can ask for one DMA transfer.
    struct Probe {
        ticks: u32,
        request: Option<DmaTransfer>,
        completed: bool,
    }

    impl Probe {
        fn new() -> Self {
            Self {
                ticks: 0,
                request: None,
                completed: false,
            }
        }
    }

    impl Device for Probe {
        fn name(&self) -> &str {
            "probe"
        }

        fn size(&self) -> u32 {
            1
        }

        fn tick(&mut self, cycles: u32) -> u32 {
            self.ticks += cycles;
            cycles
        }

        fn read(&self, _offset: u16) -> u8 {
            self.ticks as u8
        }

        fn write(&mut self, _offset: u16, _value: u8) {}

        fn get_state(&self) -> DeviceState {
            DeviceState::Memory { bytes: vec![] }
        }

        fn validate_state(&self, _state: &DeviceState) -> Result<(), StateError> {
            Ok(())
        }

        fn set_state(&mut self, _state: &DeviceState) -> Result<(), StateError> {
            Ok(())
        }

        fn dma_request(&self) -> Option<DmaTransfer> {
            if self.completed {
                None
            } else {
                self.request
            }
        }

        fn dma_complete(&mut self) {
            self.completed = true;
        }
    }

    #[test]
    fn test_mapped_memory_empty() {
        let memory = MappedMemory::new();
        assert_eq!(memory.read(0x0000), 0xFF);
        assert_eq!(memory.read(0xFFFF), 0xFF);
    }

    #[test]
    fn test_routing_uses_offsets() {
        let mut memory = MappedMemory::new();
        memory
            .add_device(0x1000, 0x10FF, Box::new(RamDevice::new(256)))
            .unwrap();
        memory.write(0x1042, 0xAA);
        assert_eq!(memory.read(0x1042), 0xAA);
        assert_eq!(memory.read(0x0FFF), 0xFF);
        assert_eq!(memory.read(0x1100), 0xFF);
    }

    #[test]
    fn test_full_range_mapping() {
        let mut memory = MappedMemory::new();
        memory
            .add_device(0x0000, 0xFFFF, Box::new(RamDevice::new(0x10000)))
            .unwrap();
        memory.write(0xFFFF, 0x12);
        assert_eq!(memory.read(0xFFFF), 0x12);
    }

    #[test]
    fn test_overlap_detection() {
        let mut memory = MappedMemory::new();
        memory
            .add_device(0x1000, 0x10FF, Box::new(RamDevice::new(256)))
            .unwrap();

        let result = memory.add_device(0x10FF, 0x11FE, Box::new(RamDevice::new(256)));
        assert!(matches!(result, Err(AddressMappingError::Overlap { .. })));

        // Adjacent is fine
        assert!(memory
            .add_device(0x0F00, 0x0FFF, Box::new(RamDevice::new(256)))
            .is_ok());
    }

    #[test]
    fn test_invalid_ranges() {
        let mut memory = MappedMemory::new();
        let result = memory.add_device(0x2000, 0x1000, Box::new(RamDevice::new(256)));
        assert!(matches!(result, Err(AddressMappingError::InvalidRange { .. })));

        let result = memory.add_device(0x2000, 0x21FF, Box::new(RamDevice::new(256)));
        assert!(matches!(result, Err(AddressMappingError::InvalidRange { .. })));
    }

    #[test]
    fn test_mastership_is_exclusive() {
        let mut memory = MappedMemory::new();
        assert_eq!(memory.bus_master(), "cpu");
        assert!(memory.request_mastership("cpu"));
        assert!(memory.cpu_has_bus());

        assert!(memory.request_mastership("dma"));
        assert!(!memory.cpu_has_bus());
        assert!(!memory.request_mastership("blitter"));
        assert!(!memory.request_mastership("cpu"));
        assert!(memory.request_mastership("dma"));

        // Only the holder can release
        memory.release_mastership("blitter");
        assert_eq!(memory.bus_master(), "dma");
        memory.release_mastership("dma");
        assert_eq!(memory.bus_master(), "cpu");
    }

    #[test]
    fn test_divider_carries_residue() {
        let mut memory = MappedMemory::new();
        memory
            .add_device_with_divider(0xD000, 0xD000, Box::new(Probe::new()), 4)
            .unwrap();

        memory.tick_devices(3);
        assert_eq!(memory.read(0xD000), 0);
        memory.tick_devices(3);
        assert_eq!(memory.read(0xD000), 1);
        memory.tick_devices(2);
        assert_eq!(memory.read(0xD000), 2);
    }

    #[test]
    fn test_dma_transfer_takes_two_cycles_per_byte() {
        let mut memory = MappedMemory::new();
        memory
            .add_device(0x0000, 0x0FFF, Box::new(RamDevice::new(0x1000)))
            .unwrap();
        let mut probe = Probe::new();
        probe.request = Some(DmaTransfer {
            source: 0x0100,
            destination: 0x0200,
            length: 3,
        });
        memory
            .add_device(0xD000, 0xD000, Box::new(probe))
            .unwrap();
        memory.write(0x0100, 1);
        memory.write(0x0101, 2);
        memory.write(0x0102, 3);

        memory.tick_devices(1);
        assert!(memory.dma_active());
        assert_eq!(memory.bus_master(), "probe");

        memory.tick_devices(5);
        assert!(memory.dma_active());
        assert_eq!(memory.read(0x0202), 0);

        memory.tick_devices(1);
        assert!(!memory.dma_active());
        assert!(memory.cpu_has_bus());
        assert_eq!(memory.read(0x0200), 1);
        assert_eq!(memory.read(0x0201), 2);
        assert_eq!(memory.read(0x0202), 3);
    }

    #[test]
    fn test_restore_rejects_wrong_layout() {
        let mut memory = MappedMemory::new();
        memory
            .add_device(0x0000, 0x00FF, Box::new(RamDevice::new(256)))
            .unwrap();
        let mut states = memory.device_states();
        states[0].start = 0x0100;
        assert!(matches!(
            memory.restore_states(&states, &BusState::default()),
            Err(StateError::DeviceMismatch { .. })
        ));
        assert!(matches!(
            memory.restore_states(&[], &BusState::default()),
            Err(StateError::DeviceCount { .. })
        ));
    }
}
