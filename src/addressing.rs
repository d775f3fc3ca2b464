//! # Addressing Modes
//!
//! This module defines the 16 addressing modes of the 65C02S and the resolver
//! that turns fetched operand bytes into an effective address.
//!
//! Operand bytes are fetched by the engine one per cycle during decode; the
//! resolver only performs the pointer reads the mode requires (indirect modes)
//! and the index arithmetic.

use crate::memory::MemoryBus;
use crate::registers::Registers;
use serde::{Deserialize, Serialize};

/// 65C02S addressing mode enumeration.
///
/// # Operand Sizes
///
/// - **0 bytes**: Implied, Accumulator
/// - **1 byte**: Immediate, ZeroPage, ZeroPageX, ZeroPageY, Relative,
///   IndexedIndirect, IndirectIndexed, ZeroPageIndirect
/// - **2 bytes**: Absolute, AbsoluteX, AbsoluteY, Indirect,
///   AbsoluteIndexedIndirect, ZeroPageRelative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressingMode {
    /// No operand, operation implied by instruction.
    ///
    /// Examples: CLC, RTS, PHX
    Implied,

    /// Operates directly on the accumulator register.
    ///
    /// Examples: LSR A, INC A
    Accumulator,

    /// 8-bit constant operand in instruction.
    ///
    /// Example: LDA #$10
    Immediate,

    /// 8-bit address in zero page (0x00-0xFF).
    ///
    /// Example: LDA $80
    ZeroPage,

    /// Zero page address indexed by X, wrapping within the zero page.
    ///
    /// Example: LDA $FF,X with X=1 reads $0000
    ZeroPageX,

    /// Zero page address indexed by Y, wrapping within the zero page.
    ZeroPageY,

    /// Signed 8-bit offset from the address of the next instruction.
    Relative,

    /// Full 16-bit address.
    Absolute,

    /// 16-bit address indexed by X. Page crossing may cost a cycle.
    AbsoluteX,

    /// 16-bit address indexed by Y. Page crossing may cost a cycle.
    AbsoluteY,

    /// `JMP ($addr)`. The high byte of the pointer is read from `$addr+1`
    /// even when that crosses a page.
    Indirect,

    /// `JMP ($addr,X)`.
    AbsoluteIndexedIndirect,

    /// `($zp,X)`: X is added within the zero page, then dereferenced.
    IndexedIndirect,

    /// `($zp),Y`: the zero-page pointer is dereferenced, then Y is added.
    IndirectIndexed,

    /// `($zp)`: zero-page pointer without indexing.
    ZeroPageIndirect,

    /// `BBRn/BBSn $zp,target`: a zero-page operand followed by a relative
    /// branch offset.
    ZeroPageRelative,
}

impl AddressingMode {
    /// Number of operand bytes that follow the opcode.
    pub const fn operand_bytes(self) -> u8 {
        match self {
            AddressingMode::Implied | AddressingMode::Accumulator => 0,
            AddressingMode::Immediate
            | AddressingMode::ZeroPage
            | AddressingMode::ZeroPageX
            | AddressingMode::ZeroPageY
            | AddressingMode::Relative
            | AddressingMode::IndexedIndirect
            | AddressingMode::IndirectIndexed
            | AddressingMode::ZeroPageIndirect => 1,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect
            | AddressingMode::AbsoluteIndexedIndirect
            | AddressingMode::ZeroPageRelative => 2,
        }
    }
}

/// Result of resolving an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAddress {
    /// Effective address. For `Relative` this is the branch target; for modes
    /// without a memory operand it is zero.
    pub address: u16,
    /// Whether indexing (or a relative branch) moved into another page.
    pub page_crossed: bool,
    /// Operand bytes consumed after the opcode.
    pub extra_fetch_bytes: u8,
}

/// Computes the effective address for `mode`.
///
/// `operand` holds the bytes that followed the opcode (little-endian) and
/// `regs.pc` must already point past them. Pointer reads go through `bus`.
///
/// # Examples
///
/// ```
/// use lib65c02::{resolve, AddressingMode, FlatMemory, MemoryBus, Registers};
///
/// let mut mem = FlatMemory::new();
/// // Pointer at $12FF: low byte at $12FF, high byte at $1300
/// mem.write(0x12FF, 0x34);
/// mem.write(0x1300, 0x56);
/// mem.write(0x1200, 0x99);
///
/// let regs = Registers::default();
/// let ea = resolve(AddressingMode::Indirect, [0xFF, 0x12], &regs, &mem);
/// assert_eq!(ea.address, 0x5634);
/// ```
pub fn resolve(
    mode: AddressingMode,
    operand: [u8; 2],
    regs: &Registers,
    bus: &dyn MemoryBus,
) -> ResolvedAddress {
    let zp = operand[0];
    let abs = u16::from_le_bytes(operand);

    let (address, page_crossed) = match mode {
        AddressingMode::Implied | AddressingMode::Accumulator | AddressingMode::Immediate => {
            (0, false)
        }
        AddressingMode::ZeroPage | AddressingMode::ZeroPageRelative => (zp as u16, false),
        AddressingMode::ZeroPageX => (zp.wrapping_add(regs.x) as u16, false),
        AddressingMode::ZeroPageY => (zp.wrapping_add(regs.y) as u16, false),
        AddressingMode::Relative => {
            let target = regs.pc.wrapping_add(zp as i8 as u16);
            (target, crosses_page(regs.pc, target))
        }
        AddressingMode::Absolute => (abs, false),
        AddressingMode::AbsoluteX => indexed(abs, regs.x),
        AddressingMode::AbsoluteY => indexed(abs, regs.y),
        AddressingMode::Indirect => (read_word(bus, abs), false),
        AddressingMode::AbsoluteIndexedIndirect => {
            (read_word(bus, abs.wrapping_add(regs.x as u16)), false)
        }
        AddressingMode::IndexedIndirect => (read_zp_word(bus, zp.wrapping_add(regs.x)), false),
        AddressingMode::IndirectIndexed => indexed(read_zp_word(bus, zp), regs.y),
        AddressingMode::ZeroPageIndirect => (read_zp_word(bus, zp), false),
    };

    ResolvedAddress {
        address,
        page_crossed,
        extra_fetch_bytes: mode.operand_bytes(),
    }
}

/// Whether two addresses lie in different 256-byte pages.
#[inline]
pub fn crosses_page(a: u16, b: u16) -> bool {
    a & 0xFF00 != b & 0xFF00
}

fn indexed(base: u16, index: u8) -> (u16, bool) {
    let address = base.wrapping_add(index as u16);
    (address, crosses_page(base, address))
}

/// Reads a 16-bit pointer. The high byte comes from `addr + 1` with a full
/// 16-bit carry, so a pointer at `$xxFF` takes its high byte from the next page.
fn read_word(bus: &dyn MemoryBus, addr: u16) -> u16 {
    let lo = bus.read(addr);
    let hi = bus.read(addr.wrapping_add(1));
    u16::from_le_bytes([lo, hi])
}

/// Reads a pointer stored in the zero page; the high byte wraps to `$00`.
fn read_zp_word(bus: &dyn MemoryBus, zp: u8) -> u16 {
    let lo = bus.read(zp as u16);
    let hi = bus.read(zp.wrapping_add(1) as u16);
    u16::from_le_bytes([lo, hi])
}
