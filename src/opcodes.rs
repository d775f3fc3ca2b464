//! # Opcode Table
//!
//! The 256-entry table that is the single source of truth for every 65C02S
//! opcode: mnemonic, addressing mode, length, base cycle count, penalty flags
//! and the handler that implements it.
//!
//! The table covers:
//! - **212 documented opcodes**: the WDC W65C02S instruction set, including the
//!   Rockwell bit instructions (`RMBn`, `SMBn`, `BBRn`, `BBSn`) and `WAI`/`STP`
//! - **44 reserved opcodes**: no documented mnemonic; each consumes its
//!   documented number of bytes and cycles and has no other effect
//!
//! Dispatch indexes the array directly by opcode byte, so there is no such
//! thing as an unknown opcode.
//!
//! Cycle counts follow the WDC W65C02S datasheet. Penalties the table does not
//! express statically:
//! - `page_cross_penalty`: +1 when indexing crosses a page (read instructions
//!   and `abs,X` shifts)
//! - `decimal_penalty`: +1 when D is set (`ADC`/`SBC`)
//! - branches: +1 when taken, +1 more when the target is in another page; the
//!   branch handlers add these themselves

use crate::addressing::AddressingMode::{self, *};
use crate::instructions::{
    alu, bits, branches, control, flags as flag_ops, inc_dec, load_store, shifts, stack, transfer,
    Exec,
};

/// Instruction handler. Runs in the `Operate` phase with the operand resolved.
pub(crate) type Handler = fn(&mut Exec<'_>);

/// Immutable per-opcode record.
///
/// # Examples
///
/// ```
/// use lib65c02::{AddressingMode, OPCODE_TABLE};
///
/// let lda_imm = &OPCODE_TABLE[0xA9];
/// assert_eq!(lda_imm.mnemonic, "LDA");
/// assert_eq!(lda_imm.mode, AddressingMode::Immediate);
/// assert_eq!(lda_imm.base_cycles, 2);
/// assert_eq!(lda_imm.length, 2);
/// ```
#[derive(Clone, Copy)]
pub struct InstructionDescriptor {
    pub opcode: u8,
    /// Mnemonic; reserved slots are listed as `NOP`.
    pub mnemonic: &'static str,
    pub mode: AddressingMode,
    /// Opcode plus operand bytes (1-3).
    pub length: u8,
    pub base_cycles: u8,
    pub page_cross_penalty: bool,
    pub decimal_penalty: bool,
    /// False for the reserved slots.
    pub documented: bool,
    pub(crate) handler: Handler,
}

impl std::fmt::Debug for InstructionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("InstructionDescriptor")
            .field("opcode", &format_args!("${:02X}", self.opcode))
            .field("mnemonic", &self.mnemonic)
            .field("mode", &self.mode)
            .field("length", &self.length)
            .field("base_cycles", &self.base_cycles)
            .field("page_cross_penalty", &self.page_cross_penalty)
            .field("decimal_penalty", &self.decimal_penalty)
            .field("documented", &self.documented)
            .finish()
    }
}

const NONE: u8 = 0;
const PAGE: u8 = 1;
const BCD: u8 = 2;

const fn op(
    opcode: u8,
    mnemonic: &'static str,
    mode: AddressingMode,
    base_cycles: u8,
    penalties: u8,
    handler: Handler,
) -> InstructionDescriptor {
    InstructionDescriptor {
        opcode,
        mnemonic,
        mode,
        length: 1 + mode.operand_bytes(),
        base_cycles,
        page_cross_penalty: penalties & PAGE != 0,
        decimal_penalty: penalties & BCD != 0,
        documented: true,
        handler,
    }
}

const fn reserved(opcode: u8, mode: AddressingMode, base_cycles: u8) -> InstructionDescriptor {
    InstructionDescriptor {
        documented: false,
        ..op(opcode, "NOP", mode, base_cycles, NONE, control::reserved)
    }
}

/// Complete 256-entry table indexed by opcode byte.
pub const OPCODE_TABLE: [InstructionDescriptor; 256] = [
    op(0x00, "BRK", Immediate, 7, NONE, control::brk),
    op(0x01, "ORA", IndexedIndirect, 6, NONE, alu::ora),
    reserved(0x02, Immediate, 2),
    reserved(0x03, Implied, 1),
    op(0x04, "TSB", ZeroPage, 5, NONE, bits::tsb),
    op(0x05, "ORA", ZeroPage, 3, NONE, alu::ora),
    op(0x06, "ASL", ZeroPage, 5, NONE, shifts::asl),
    op(0x07, "RMB0", ZeroPage, 5, NONE, bits::rmb),
    op(0x08, "PHP", Implied, 3, NONE, stack::php),
    op(0x09, "ORA", Immediate, 2, NONE, alu::ora),
    op(0x0A, "ASL", Accumulator, 2, NONE, shifts::asl),
    reserved(0x0B, Implied, 1),
    op(0x0C, "TSB", Absolute, 6, NONE, bits::tsb),
    op(0x0D, "ORA", Absolute, 4, NONE, alu::ora),
    op(0x0E, "ASL", Absolute, 6, NONE, shifts::asl),
    op(0x0F, "BBR0", ZeroPageRelative, 5, NONE, bits::bbr),
    // 0x10
    op(0x10, "BPL", Relative, 2, NONE, branches::branch),
    op(0x11, "ORA", IndirectIndexed, 5, PAGE, alu::ora),
    op(0x12, "ORA", ZeroPageIndirect, 5, NONE, alu::ora),
    reserved(0x13, Implied, 1),
    op(0x14, "TRB", ZeroPage, 5, NONE, bits::trb),
    op(0x15, "ORA", ZeroPageX, 4, NONE, alu::ora),
    op(0x16, "ASL", ZeroPageX, 6, NONE, shifts::asl),
    op(0x17, "RMB1", ZeroPage, 5, NONE, bits::rmb),
    op(0x18, "CLC", Implied, 2, NONE, flag_ops::clc),
    op(0x19, "ORA", AbsoluteY, 4, PAGE, alu::ora),
    op(0x1A, "INC", Accumulator, 2, NONE, inc_dec::inc),
    reserved(0x1B, Implied, 1),
    op(0x1C, "TRB", Absolute, 6, NONE, bits::trb),
    op(0x1D, "ORA", AbsoluteX, 4, PAGE, alu::ora),
    op(0x1E, "ASL", AbsoluteX, 6, PAGE, shifts::asl),
    op(0x1F, "BBR1", ZeroPageRelative, 5, NONE, bits::bbr),
    // 0x20
    op(0x20, "JSR", Absolute, 6, NONE, control::jsr),
    op(0x21, "AND", IndexedIndirect, 6, NONE, alu::and),
    reserved(0x22, Immediate, 2),
    reserved(0x23, Implied, 1),
    op(0x24, "BIT", ZeroPage, 3, NONE, alu::bit),
    op(0x25, "AND", ZeroPage, 3, NONE, alu::and),
    op(0x26, "ROL", ZeroPage, 5, NONE, shifts::rol),
    op(0x27, "RMB2", ZeroPage, 5, NONE, bits::rmb),
    op(0x28, "PLP", Implied, 4, NONE, stack::plp),
    op(0x29, "AND", Immediate, 2, NONE, alu::and),
    op(0x2A, "ROL", Accumulator, 2, NONE, shifts::rol),
    reserved(0x2B, Implied, 1),
    op(0x2C, "BIT", Absolute, 4, NONE, alu::bit),
    op(0x2D, "AND", Absolute, 4, NONE, alu::and),
    op(0x2E, "ROL", Absolute, 6, NONE, shifts::rol),
    op(0x2F, "BBR2", ZeroPageRelative, 5, NONE, bits::bbr),
    // 0x30
    op(0x30, "BMI", Relative, 2, NONE, branches::branch),
    op(0x31, "AND", IndirectIndexed, 5, PAGE, alu::and),
    op(0x32, "AND", ZeroPageIndirect, 5, NONE, alu::and),
    reserved(0x33, Implied, 1),
    op(0x34, "BIT", ZeroPageX, 4, NONE, alu::bit),
    op(0x35, "AND", ZeroPageX, 4, NONE, alu::and),
    op(0x36, "ROL", ZeroPageX, 6, NONE, shifts::rol),
    op(0x37, "RMB3", ZeroPage, 5, NONE, bits::rmb),
    op(0x38, "SEC", Implied, 2, NONE, flag_ops::sec),
    op(0x39, "AND", AbsoluteY, 4, PAGE, alu::and),
    op(0x3A, "DEC", Accumulator, 2, NONE, inc_dec::dec),
    reserved(0x3B, Implied, 1),
    op(0x3C, "BIT", AbsoluteX, 4, PAGE, alu::bit),
    op(0x3D, "AND", AbsoluteX, 4, PAGE, alu::and),
    op(0x3E, "ROL", AbsoluteX, 6, PAGE, shifts::rol),
    op(0x3F, "BBR3", ZeroPageRelative, 5, NONE, bits::bbr),
    // 0x40
    op(0x40, "RTI", Implied, 6, NONE, control::rti),
    op(0x41, "EOR", IndexedIndirect, 6, NONE, alu::eor),
    reserved(0x42, Immediate, 2),
    reserved(0x43, Implied, 1),
    reserved(0x44, ZeroPage, 3),
    op(0x45, "EOR", ZeroPage, 3, NONE, alu::eor),
    op(0x46, "LSR", ZeroPage, 5, NONE, shifts::lsr),
    op(0x47, "RMB4", ZeroPage, 5, NONE, bits::rmb),
    op(0x48, "PHA", Implied, 3, NONE, stack::pha),
    op(0x49, "EOR", Immediate, 2, NONE, alu::eor),
    op(0x4A, "LSR", Accumulator, 2, NONE, shifts::lsr),
    reserved(0x4B, Implied, 1),
    op(0x4C, "JMP", Absolute, 3, NONE, control::jmp),
    op(0x4D, "EOR", Absolute, 4, NONE, alu::eor),
    op(0x4E, "LSR", Absolute, 6, NONE, shifts::lsr),
    op(0x4F, "BBR4", ZeroPageRelative, 5, NONE, bits::bbr),
    // 0x50
    op(0x50, "BVC", Relative, 2, NONE, branches::branch),
    op(0x51, "EOR", IndirectIndexed, 5, PAGE, alu::eor),
    op(0x52, "EOR", ZeroPageIndirect, 5, NONE, alu::eor),
    reserved(0x53, Implied, 1),
    reserved(0x54, ZeroPageX, 4),
    op(0x55, "EOR", ZeroPageX, 4, NONE, alu::eor),
    op(0x56, "LSR", ZeroPageX, 6, NONE, shifts::lsr),
    op(0x57, "RMB5", ZeroPage, 5, NONE, bits::rmb),
    op(0x58, "CLI", Implied, 2, NONE, flag_ops::cli),
    op(0x59, "EOR", AbsoluteY, 4, PAGE, alu::eor),
    op(0x5A, "PHY", Implied, 3, NONE, stack::phy),
    reserved(0x5B, Implied, 1),
    reserved(0x5C, Absolute, 8),
    op(0x5D, "EOR", AbsoluteX, 4, PAGE, alu::eor),
    op(0x5E, "LSR", AbsoluteX, 6, PAGE, shifts::lsr),
    op(0x5F, "BBR5", ZeroPageRelative, 5, NONE, bits::bbr),
    // 0x60
    op(0x60, "RTS", Implied, 6, NONE, control::rts),
    op(0x61, "ADC", IndexedIndirect, 6, BCD, alu::adc),
    reserved(0x62, Immediate, 2),
    reserved(0x63, Implied, 1),
    op(0x64, "STZ", ZeroPage, 3, NONE, load_store::stz),
    op(0x65, "ADC", ZeroPage, 3, BCD, alu::adc),
    op(0x66, "ROR", ZeroPage, 5, NONE, shifts::ror),
    op(0x67, "RMB6", ZeroPage, 5, NONE, bits::rmb),
    op(0x68, "PLA", Implied, 4, NONE, stack::pla),
    op(0x69, "ADC", Immediate, 2, BCD, alu::adc),
    op(0x6A, "ROR", Accumulator, 2, NONE, shifts::ror),
    reserved(0x6B, Implied, 1),
    op(0x6C, "JMP", Indirect, 6, NONE, control::jmp),
    op(0x6D, "ADC", Absolute, 4, BCD, alu::adc),
    op(0x6E, "ROR", Absolute, 6, NONE, shifts::ror),
    op(0x6F, "BBR6", ZeroPageRelative, 5, NONE, bits::bbr),
    // 0x70
    op(0x70, "BVS", Relative, 2, NONE, branches::branch),
    op(0x71, "ADC", IndirectIndexed, 5, PAGE | BCD, alu::adc),
    op(0x72, "ADC", ZeroPageIndirect, 5, BCD, alu::adc),
    reserved(0x73, Implied, 1),
    op(0x74, "STZ", ZeroPageX, 4, NONE, load_store::stz),
    op(0x75, "ADC", ZeroPageX, 4, BCD, alu::adc),
    op(0x76, "ROR", ZeroPageX, 6, NONE, shifts::ror),
    op(0x77, "RMB7", ZeroPage, 5, NONE, bits::rmb),
    op(0x78, "SEI", Implied, 2, NONE, flag_ops::sei),
    op(0x79, "ADC", AbsoluteY, 4, PAGE | BCD, alu::adc),
    op(0x7A, "PLY", Implied, 4, NONE, stack::ply),
    reserved(0x7B, Implied, 1),
    op(0x7C, "JMP", AbsoluteIndexedIndirect, 6, NONE, control::jmp),
    op(0x7D, "ADC", AbsoluteX, 4, PAGE | BCD, alu::adc),
    op(0x7E, "ROR", AbsoluteX, 6, PAGE, shifts::ror),
    op(0x7F, "BBR7", ZeroPageRelative, 5, NONE, bits::bbr),
    // 0x80
    op(0x80, "BRA", Relative, 3, NONE, branches::bra),
    op(0x81, "STA", IndexedIndirect, 6, NONE, load_store::sta),
    reserved(0x82, Immediate, 2),
    reserved(0x83, Implied, 1),
    op(0x84, "STY", ZeroPage, 3, NONE, load_store::sty),
    op(0x85, "STA", ZeroPage, 3, NONE, load_store::sta),
    op(0x86, "STX", ZeroPage, 3, NONE, load_store::stx),
    op(0x87, "SMB0", ZeroPage, 5, NONE, bits::smb),
    op(0x88, "DEY", Implied, 2, NONE, inc_dec::dey),
    op(0x89, "BIT", Immediate, 2, NONE, alu::bit),
    op(0x8A, "TXA", Implied, 2, NONE, transfer::txa),
    reserved(0x8B, Implied, 1),
    op(0x8C, "STY", Absolute, 4, NONE, load_store::sty),
    op(0x8D, "STA", Absolute, 4, NONE, load_store::sta),
    op(0x8E, "STX", Absolute, 4, NONE, load_store::stx),
    op(0x8F, "BBS0", ZeroPageRelative, 5, NONE, bits::bbs),
    // 0x90
    op(0x90, "BCC", Relative, 2, NONE, branches::branch),
    op(0x91, "STA", IndirectIndexed, 6, NONE, load_store::sta),
    op(0x92, "STA", ZeroPageIndirect, 5, NONE, load_store::sta),
    reserved(0x93, Implied, 1),
    op(0x94, "STY", ZeroPageX, 4, NONE, load_store::sty),
    op(0x95, "STA", ZeroPageX, 4, NONE, load_store::sta),
    op(0x96, "STX", ZeroPageY, 4, NONE, load_store::stx),
    op(0x97, "SMB1", ZeroPage, 5, NONE, bits::smb),
    op(0x98, "TYA", Implied, 2, NONE, transfer::tya),
    op(0x99, "STA", AbsoluteY, 5, NONE, load_store::sta),
    op(0x9A, "TXS", Implied, 2, NONE, transfer::txs),
    reserved(0x9B, Implied, 1),
    op(0x9C, "STZ", Absolute, 4, NONE, load_store::stz),
    op(0x9D, "STA", AbsoluteX, 5, NONE, load_store::sta),
    op(0x9E, "STZ", AbsoluteX, 5, NONE, load_store::stz),
    op(0x9F, "BBS1", ZeroPageRelative, 5, NONE, bits::bbs),
    // 0xA0
    op(0xA0, "LDY", Immediate, 2, NONE, load_store::ldy),
    op(0xA1, "LDA", IndexedIndirect, 6, NONE, load_store::lda),
    op(0xA2, "LDX", Immediate, 2, NONE, load_store::ldx),
    reserved(0xA3, Implied, 1),
    op(0xA4, "LDY", ZeroPage, 3, NONE, load_store::ldy),
    op(0xA5, "LDA", ZeroPage, 3, NONE, load_store::lda),
    op(0xA6, "LDX", ZeroPage, 3, NONE, load_store::ldx),
    op(0xA7, "SMB2", ZeroPage, 5, NONE, bits::smb),
    op(0xA8, "TAY", Implied, 2, NONE, transfer::tay),
    op(0xA9, "LDA", Immediate, 2, NONE, load_store::lda),
    op(0xAA, "TAX", Implied, 2, NONE, transfer::tax),
    reserved(0xAB, Implied, 1),
    op(0xAC, "LDY", Absolute, 4, NONE, load_store::ldy),
    op(0xAD, "LDA", Absolute, 4, NONE, load_store::lda),
    op(0xAE, "LDX", Absolute, 4, NONE, load_store::ldx),
    op(0xAF, "BBS2", ZeroPageRelative, 5, NONE, bits::bbs),
    // 0xB0
    op(0xB0, "BCS", Relative, 2, NONE, branches::branch),
    op(0xB1, "LDA", IndirectIndexed, 5, PAGE, load_store::lda),
    op(0xB2, "LDA", ZeroPageIndirect, 5, NONE, load_store::lda),
    reserved(0xB3, Implied, 1),
    op(0xB4, "LDY", ZeroPageX, 4, NONE, load_store::ldy),
    op(0xB5, "LDA", ZeroPageX, 4, NONE, load_store::lda),
    op(0xB6, "LDX", ZeroPageY, 4, NONE, load_store::ldx),
    op(0xB7, "SMB3", ZeroPage, 5, NONE, bits::smb),
    op(0xB8, "CLV", Implied, 2, NONE, flag_ops::clv),
    op(0xB9, "LDA", AbsoluteY, 4, PAGE, load_store::lda),
    op(0xBA, "TSX", Implied, 2, NONE, transfer::tsx),
    reserved(0xBB, Implied, 1),
    op(0xBC, "LDY", AbsoluteX, 4, PAGE, load_store::ldy),
    op(0xBD, "LDA", AbsoluteX, 4, PAGE, load_store::lda),
    op(0xBE, "LDX", AbsoluteY, 4, PAGE, load_store::ldx),
    op(0xBF, "BBS3", ZeroPageRelative, 5, NONE, bits::bbs),
    // 0xC0
    op(0xC0, "CPY", Immediate, 2, NONE, alu::cpy),
    op(0xC1, "CMP", IndexedIndirect, 6, NONE, alu::cmp),
    reserved(0xC2, Immediate, 2),
    reserved(0xC3, Implied, 1),
    op(0xC4, "CPY", ZeroPage, 3, NONE, alu::cpy),
    op(0xC5, "CMP", ZeroPage, 3, NONE, alu::cmp),
    op(0xC6, "DEC", ZeroPage, 5, NONE, inc_dec::dec),
    op(0xC7, "SMB4", ZeroPage, 5, NONE, bits::smb),
    op(0xC8, "INY", Implied, 2, NONE, inc_dec::iny),
    op(0xC9, "CMP", Immediate, 2, NONE, alu::cmp),
    op(0xCA, "DEX", Implied, 2, NONE, inc_dec::dex),
    op(0xCB, "WAI", Implied, 3, NONE, control::wai),
    op(0xCC, "CPY", Absolute, 4, NONE, alu::cpy),
    op(0xCD, "CMP", Absolute, 4, NONE, alu::cmp),
    op(0xCE, "DEC", Absolute, 6, NONE, inc_dec::dec),
    op(0xCF, "BBS4", ZeroPageRelative, 5, NONE, bits::bbs),
    // 0xD0
    op(0xD0, "BNE", Relative, 2, NONE, branches::branch),
    op(0xD1, "CMP", IndirectIndexed, 5, PAGE, alu::cmp),
    op(0xD2, "CMP", ZeroPageIndirect, 5, NONE, alu::cmp),
    reserved(0xD3, Implied, 1),
    reserved(0xD4, ZeroPageX, 4),
    op(0xD5, "CMP", ZeroPageX, 4, NONE, alu::cmp),
    op(0xD6, "DEC", ZeroPageX, 6, NONE, inc_dec::dec),
    op(0xD7, "SMB5", ZeroPage, 5, NONE, bits::smb),
    op(0xD8, "CLD", Implied, 2, NONE, flag_ops::cld),
    op(0xD9, "CMP", AbsoluteY, 4, PAGE, alu::cmp),
    op(0xDA, "PHX", Implied, 3, NONE, stack::phx),
    op(0xDB, "STP", Implied, 3, NONE, control::stp),
    reserved(0xDC, Absolute, 4),
    op(0xDD, "CMP", AbsoluteX, 4, PAGE, alu::cmp),
    op(0xDE, "DEC", AbsoluteX, 7, NONE, inc_dec::dec),
    op(0xDF, "BBS5", ZeroPageRelative, 5, NONE, bits::bbs),
    // 0xE0
    op(0xE0, "CPX", Immediate, 2, NONE, alu::cpx),
    op(0xE1, "SBC", IndexedIndirect, 6, BCD, alu::sbc),
    reserved(0xE2, Immediate, 2),
    reserved(0xE3, Implied, 1),
    op(0xE4, "CPX", ZeroPage, 3, NONE, alu::cpx),
    op(0xE5, "SBC", ZeroPage, 3, BCD, alu::sbc),
    op(0xE6, "INC", ZeroPage, 5, NONE, inc_dec::inc),
    op(0xE7, "SMB6", ZeroPage, 5, NONE, bits::smb),
    op(0xE8, "INX", Implied, 2, NONE, inc_dec::inx),
    op(0xE9, "SBC", Immediate, 2, BCD, alu::sbc),
    op(0xEA, "NOP", Implied, 2, NONE, control::nop),
    reserved(0xEB, Implied, 1),
    op(0xEC, "CPX", Absolute, 4, NONE, alu::cpx),
    op(0xED, "SBC", Absolute, 4, BCD, alu::sbc),
    op(0xEE, "INC", Absolute, 6, NONE, inc_dec::inc),
    op(0xEF, "BBS6", ZeroPageRelative, 5, NONE, bits::bbs),
    // 0xF0
    op(0xF0, "BEQ", Relative, 2, NONE, branches::branch),
    op(0xF1, "SBC", IndirectIndexed, 5, PAGE | BCD, alu::sbc),
    op(0xF2, "SBC", ZeroPageIndirect, 5, BCD, alu::sbc),
    reserved(0xF3, Implied, 1),
    reserved(0xF4, ZeroPageX, 4),
    op(0xF5, "SBC", ZeroPageX, 4, BCD, alu::sbc),
    op(0xF6, "INC", ZeroPageX, 6, NONE, inc_dec::inc),
    op(0xF7, "SMB7", ZeroPage, 5, NONE, bits::smb),
    op(0xF8, "SED", Implied, 2, NONE, flag_ops::sed),
    op(0xF9, "SBC", AbsoluteY, 4, PAGE | BCD, alu::sbc),
    op(0xFA, "PLX", Implied, 4, NONE, stack::plx),
    reserved(0xFB, Implied, 1),
    reserved(0xFC, Absolute, 4),
    op(0xFD, "SBC", AbsoluteX, 4, PAGE | BCD, alu::sbc),
    op(0xFE, "INC", AbsoluteX, 7, NONE, inc_dec::inc),
    op(0xFF, "BBS7", ZeroPageRelative, 5, NONE, bits::bbs),
];

/// Looks up the descriptor for `opcode`.
#[inline]
pub fn descriptor(opcode: u8) -> &'static InstructionDescriptor {
    &OPCODE_TABLE[opcode as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_indexed_by_opcode() {
        for (i, d) in OPCODE_TABLE.iter().enumerate() {
            assert_eq!(d.opcode as usize, i, "entry {:02X} out of place", i);
        }
    }

    #[test]
    fn test_documented_count() {
        let documented = OPCODE_TABLE.iter().filter(|d| d.documented).count();
        assert_eq!(documented, 212);
    }

    #[test]
    fn test_lengths_in_range() {
        for d in OPCODE_TABLE.iter() {
            assert!((1..=3).contains(&d.length), "{:?}", d);
            assert!(d.base_cycles >= 1, "{:?}", d);
        }
    }

    #[test]
    fn test_reserved_widths() {
        assert_eq!((OPCODE_TABLE[0x02].length, OPCODE_TABLE[0x02].base_cycles), (2, 2));
        assert_eq!((OPCODE_TABLE[0x03].length, OPCODE_TABLE[0x03].base_cycles), (1, 1));
        assert_eq!((OPCODE_TABLE[0x44].length, OPCODE_TABLE[0x44].base_cycles), (2, 3));
        assert_eq!((OPCODE_TABLE[0x54].length, OPCODE_TABLE[0x54].base_cycles), (2, 4));
        assert_eq!((OPCODE_TABLE[0x5C].length, OPCODE_TABLE[0x5C].base_cycles), (3, 8));
        assert_eq!((OPCODE_TABLE[0xFC].length, OPCODE_TABLE[0xFC].base_cycles), (3, 4));
    }

    #[test]
    fn test_decimal_penalty_only_on_adc_sbc() {
        for d in OPCODE_TABLE.iter().filter(|d| d.decimal_penalty) {
            assert!(d.mnemonic == "ADC" || d.mnemonic == "SBC", "{:?}", d);
        }
        assert_eq!(OPCODE_TABLE.iter().filter(|d| d.decimal_penalty).count(), 18);
    }

    #[test]
    fn test_stores_have_no_page_penalty() {
        for d in OPCODE_TABLE.iter() {
            if matches!(d.mnemonic, "STA" | "STX" | "STY" | "STZ") {
                assert!(!d.page_cross_penalty, "{:?}", d);
            }
        }
    }
}
