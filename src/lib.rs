//! # 65C02S CPU Emulator Core
//!
//! A cycle-level emulator of the Western Design Center 65C02S, built to be the
//! timing-accurate heart of a larger simulated machine.
//!
//! The crate provides the instruction engine, its interrupt controller and a
//! tick scheduler with bus arbitration for DMA-style masters. Memory and
//! peripherals attach through the [`MemoryBus`] and [`Device`] traits.
//!
//! ## Quick Start
//!
//! ```rust
//! use lib65c02::{Cpu, FlatMemory, MemoryBus};
//!
//! let mut memory = FlatMemory::new();
//! memory.write(0xFFFC, 0x00);
//! memory.write(0xFFFD, 0x80);
//! memory.load(0x8000, &[0xA9, 0x42]); // LDA #$42
//!
//! let mut cpu = Cpu::new(memory);
//! assert_eq!(cpu.pc(), 0x8000);
//! assert_eq!(cpu.registers().s, 0xFD);
//!
//! let cycles = cpu.step();
//! assert_eq!(cycles, 2);
//! assert_eq!(cpu.registers().a, 0x42);
//! ```
//!
//! ## Architecture
//!
//! - **Register file and flag logic**: [`Registers`] and the helpers in [`flags`]
//! - **Addressing-mode resolver**: [`resolve`] for all 16 modes
//! - **Opcode table**: [`OPCODE_TABLE`], a 256-entry array of
//!   [`InstructionDescriptor`]s dispatched by direct index
//! - **Instruction engine**: [`Cpu`], resumable at any cycle through its
//!   [`ExecutionContext`]
//! - **Interrupt controller**: [`InterruptController`], shared with
//!   peripherals through [`InterruptLine`] handles
//! - **Tick scheduler and bus arbiter**: [`System`] over a [`MappedMemory`]
//!
//! ## Errors
//!
//! The execution path never fails: every opcode has defined behaviour and
//! unmapped reads return an open-bus value. Only boundary operations return
//! errors: [`RangeError`] for out-of-width values, [`AddressMappingError`] for
//! bad device mappings and [`StateError`] for rejected snapshots.
//!
//! ## Logging
//!
//! The crate logs through the `log` facade: resets at `info`, interrupt
//! service, bus mastership and DMA at `debug`, per-instruction retirement at
//! `trace`, refused requests and rejected snapshots at `warn`. Install any
//! logger in the host to see them.

pub mod addressing;
pub mod config;
pub mod context;
pub mod cpu;
pub mod devices;
pub mod flags;
pub mod interrupts;
pub mod memory;
pub mod opcodes;
pub mod registers;
pub mod scheduler;
pub mod state;

// Handlers are reachable only through the opcode table
mod instructions;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use addressing::{resolve, AddressingMode, ResolvedAddress};
pub use config::{CpuConfig, SchedulerConfig};
pub use context::{ContextKind, ExecutionContext, Phase};
pub use cpu::{Cpu, RunState};
pub use devices::{
    AddressMappingError, BusState, Device, DeviceState, DmaController, DmaTransfer,
    IntervalTimer, MappedMemory, NamedDeviceState, RamDevice, RomDevice,
};
pub use interrupts::{
    InterruptController, InterruptLine, InterruptVector, Line, PendingLines, SharedInterrupts,
};
pub use memory::{AccessKind, BusAccess, FlatMemory, MemoryBus, TracingBus};
pub use opcodes::{InstructionDescriptor, OPCODE_TABLE};
pub use registers::{Register, Registers};
pub use scheduler::{System, SystemState};
pub use state::CpuState;

/// A value outside the range its destination can hold.
///
/// Raised by explicit register writes and configuration validation; the
/// destination is left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeError {
    /// What was being written (a register label or configuration field).
    pub target: &'static str,
    pub value: u32,
    pub min: u32,
    pub max: u32,
}

impl RangeError {
    /// An error for a value above `max`, with a lower bound of zero.
    pub fn new(target: &'static str, value: u32, max: u32) -> Self {
        Self {
            target,
            value,
            min: 0,
            max,
        }
    }
}

impl std::fmt::Display for RangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} value 0x{:X} is outside 0x{:X}..=0x{:X}",
            self.target, self.value, self.min, self.max
        )
    }
}

impl std::error::Error for RangeError {}

/// A snapshot that cannot be applied. The target is not modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The snapshot belongs to a different kind of device or mapping.
    DeviceMismatch { expected: String, found: String },
    /// A memory image of the wrong length.
    SizeMismatch { expected: usize, found: usize },
    /// A field holds a value the device could never have produced.
    InvalidField { field: String, reason: String },
    /// A system snapshot with a different number of devices.
    DeviceCount { expected: usize, found: usize },
}

impl std::fmt::Display for StateError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            StateError::DeviceMismatch { expected, found } => {
                write!(f, "State is for {}, expected {}", found, expected)
            }
            StateError::SizeMismatch { expected, found } => {
                write!(f, "State holds {} bytes, device has {}", found, expected)
            }
            StateError::InvalidField { field, reason } => {
                write!(f, "Invalid state field {}: {}", field, reason)
            }
            StateError::DeviceCount { expected, found } => {
                write!(f, "State has {} devices, system has {}", found, expected)
            }
        }
    }
}

impl std::error::Error for StateError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_error_display() {
        let err = RangeError::new("A", 0x100, 0xFF);
        assert_eq!(err.to_string(), "A value 0x100 is outside 0x0..=0xFF");
    }

    #[test]
    fn test_state_error_display() {
        let err = StateError::SizeMismatch {
            expected: 16,
            found: 8,
        };
        assert_eq!(err.to_string(), "State holds 8 bytes, device has 16");
    }
}
