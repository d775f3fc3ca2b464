//! # Memory Bus Abstraction
//!
//! This module provides the `MemoryBus` trait that decouples the CPU from specific
//! memory implementations, plus two implementations:
//!
//! - [`FlatMemory`]: 64KB of RAM, handy for tests and simple hosts
//! - [`TracingBus`]: wraps another bus and records every access
//!
//! The device-routing bus with mastership arbitration is
//! [`MappedMemory`](crate::MappedMemory).
//!
//! ## Design Principles
//!
//! The MemoryBus trait follows 65C02S hardware behavior:
//! - No bus errors: reads/writes always succeed
//! - Unmapped reads return an open-bus value chosen by the implementation
//! - Writes to ROM/unmapped regions may be ignored

use std::cell::RefCell;

/// Memory bus trait for CPU to read/write bytes.
///
/// # Design
///
/// - `read(&self)`: devices with read side effects use interior mutability
/// - `write(&mut self)`: mutable reference makes side effects explicit
/// - No error types: the 65C02S has no bus error mechanism
///
/// # Examples
///
/// ```
/// use lib65c02::{MemoryBus, FlatMemory};
///
/// let mut mem = FlatMemory::new();
/// mem.write(0x1234, 0x42);
/// assert_eq!(mem.read(0x1234), 0x42);
/// ```
pub trait MemoryBus {
    /// Reads a byte from the specified 16-bit address. Must never panic.
    fn read(&self, addr: u16) -> u8;

    /// Writes a byte to the specified 16-bit address. Must never panic.
    fn write(&mut self, addr: u16, value: u8);

    /// Whether the CPU currently owns the bus.
    ///
    /// The engine checks this at the start of every cycle; while another master
    /// holds the bus the CPU stalls. Buses without arbitration always return
    /// `true`.
    fn cpu_has_bus(&self) -> bool {
        true
    }
}

/// Simple 64KB flat memory implementation.
///
/// All addresses (0x0000-0xFFFF) are writable RAM initialized to 0x00.
///
/// # Examples
///
/// ```
/// use lib65c02::{Cpu, FlatMemory, MemoryBus};
///
/// let mut memory = FlatMemory::new();
/// memory.write(0xFFFC, 0x00); // Reset vector low byte
/// memory.write(0xFFFD, 0x80); // Reset vector high byte (PC = 0x8000)
///
/// let cpu = Cpu::new(memory);
/// assert_eq!(cpu.pc(), 0x8000);
/// ```
pub struct FlatMemory {
    data: Box<[u8; 65536]>,
}

impl FlatMemory {
    /// Creates a new FlatMemory instance with all bytes initialized to zero.
    pub fn new() -> Self {
        Self {
            data: Box::new([0; 65536]),
        }
    }

    /// Copies `bytes` into memory starting at `addr`, wrapping at `$FFFF`.
    pub fn load(&mut self, addr: u16, bytes: &[u8]) {
        for (i, &byte) in bytes.iter().enumerate() {
            self.data[addr.wrapping_add(i as u16) as usize] = byte;
        }
    }
}

impl Default for FlatMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus for FlatMemory {
    fn read(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.data[addr as usize] = value;
    }
}

/// Direction of a recorded bus access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Read,
    Write,
}

/// One recorded bus access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusAccess {
    pub kind: AccessKind,
    pub address: u16,
    pub value: u8,
}

/// A bus wrapper that records every access made through it.
///
/// Used to verify access patterns such as the two-reads-one-write order of
/// read-modify-write instructions, and as an access log for debugging hosts.
///
/// # Examples
///
/// ```
/// use lib65c02::{AccessKind, FlatMemory, MemoryBus, TracingBus};
///
/// let mut bus = TracingBus::new(FlatMemory::new());
/// bus.write(0x2000, 7);
/// bus.read(0x2000);
/// assert_eq!(bus.count(AccessKind::Read, 0x2000), 1);
/// assert_eq!(bus.count(AccessKind::Write, 0x2000), 1);
/// ```
pub struct TracingBus<B: MemoryBus> {
    inner: B,
    log: RefCell<Vec<BusAccess>>,
    enabled: bool,
}

impl<B: MemoryBus> TracingBus<B> {
    /// Wraps `inner` with recording enabled.
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            log: RefCell::new(Vec::new()),
            enabled: true,
        }
    }

    /// Turns recording on or off. Accesses still reach the inner bus.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// A copy of the access log in order.
    pub fn accesses(&self) -> Vec<BusAccess> {
        self.log.borrow().clone()
    }

    /// Accesses of `kind` at `address` recorded so far.
    pub fn count(&self, kind: AccessKind, address: u16) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|a| a.kind == kind && a.address == address)
            .count()
    }

    /// Total number of recorded accesses.
    pub fn len(&self) -> usize {
        self.log.borrow().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.log.borrow().is_empty()
    }

    /// Empties the access log.
    pub fn clear(&mut self) {
        self.log.get_mut().clear();
    }

    /// The wrapped bus.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Mutable access to the wrapped bus; accesses made this way are not logged.
    pub fn inner_mut(&mut self) -> &mut B {
        &mut self.inner
    }

    fn record(&self, kind: AccessKind, address: u16, value: u8) {
        if self.enabled {
            log::trace!("bus {:?} ${:04X} = ${:02X}", kind, address, value);
            self.log.borrow_mut().push(BusAccess {
                kind,
                address,
                value,
            });
        }
    }
}

impl<B: MemoryBus> MemoryBus for TracingBus<B> {
    fn read(&self, addr: u16) -> u8 {
        let value = self.inner.read(addr);
        self.record(AccessKind::Read, addr, value);
        value
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.inner.write(addr, value);
        self.record(AccessKind::Write, addr, value);
    }

    fn cpu_has_bus(&self) -> bool {
        self.inner.cpu_has_bus()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_memory_read_write() {
        let mut mem = FlatMemory::new();

        assert_eq!(mem.read(0x0000), 0x00);
        assert_eq!(mem.read(0xFFFF), 0x00);

        mem.write(0x1234, 0x42);
        assert_eq!(mem.read(0x1234), 0x42);
        assert_eq!(mem.read(0x1233), 0x00);
        assert_eq!(mem.read(0x1235), 0x00);
    }

    #[test]
    fn test_flat_memory_load_wraps() {
        let mut mem = FlatMemory::new();
        mem.load(0xFFFF, &[0xAA, 0xBB]);
        assert_eq!(mem.read(0xFFFF), 0xAA);
        assert_eq!(mem.read(0x0000), 0xBB);
    }

    #[test]
    fn test_tracing_bus_records_in_order() {
        let mut bus = TracingBus::new(FlatMemory::new());
        bus.write(0x10, 1);
        let _ = bus.read(0x10);
        let _ = bus.read(0x11);

        let log = bus.accesses();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].kind, AccessKind::Write);
        assert_eq!(log[1].value, 1);
        assert_eq!(log[2].address, 0x11);

        bus.clear();
        assert!(bus.is_empty());
    }

    #[test]
    fn test_tracing_bus_disabled() {
        let mut bus = TracingBus::new(FlatMemory::new());
        bus.set_enabled(false);
        bus.write(0x10, 1);
        assert!(bus.is_empty());
        assert_eq!(bus.inner().read(0x10), 1);
    }
}
