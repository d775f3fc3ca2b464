//! # Flag Logic
//!
//! Bit masks for the status register and the helpers that compute N/Z/C/V
//! updates and branch predicates. The helpers are methods on
//! [`Registers`](crate::Registers) since the flags live in its `P` field.
//!
//! ```text
//!  7   6   5   4   3   2   1   0
//!  N   V   -   B   D   I   Z   C
//! ```

use crate::registers::Registers;

/// Carry
pub const CARRY: u8 = 0x01;
/// Zero
pub const ZERO: u8 = 0x02;
/// IRQ disable
pub const IRQ_DISABLE: u8 = 0x04;
/// Decimal mode
pub const DECIMAL: u8 = 0x08;
/// Break; only meaningful in a copy of P pushed to the stack.
pub const BREAK: u8 = 0x10;
/// Unused; always reads as 1.
pub const UNUSED: u8 = 0x20;
/// Overflow
pub const OVERFLOW: u8 = 0x40;
/// Negative
pub const NEGATIVE: u8 = 0x80;

impl Registers {
    /// Returns whether every bit in `mask` is set in P.
    #[inline]
    pub fn flag(&self, mask: u8) -> bool {
        self.p & mask == mask
    }

    /// Sets or clears the bits in `mask`. Bit 5 stays set.
    #[inline]
    pub fn set_flag(&mut self, mask: u8, on: bool) {
        if on {
            self.p |= mask;
        } else {
            self.p &= !mask;
        }
        self.p |= UNUSED;
    }

    /// N from bit 7 of `value`, Z from `value == 0`.
    #[inline]
    pub fn update_nz(&mut self, value: u8) {
        self.set_flag(NEGATIVE, value & 0x80 != 0);
        self.set_flag(ZERO, value == 0);
    }

    /// C from an unmasked sum: set when it no longer fits in 8 bits.
    #[inline]
    pub fn update_carry_add(&mut self, raw: u16) {
        self.set_flag(CARRY, raw > 0xFF);
    }

    /// C from an unmasked difference: set when no borrow occurred.
    #[inline]
    pub fn update_carry_sub(&mut self, raw: i16) {
        self.set_flag(CARRY, raw >= 0);
    }

    /// V for `op1 + op2 = result`: operands share a sign that the result lacks.
    #[inline]
    pub fn update_overflow_add(&mut self, op1: u8, op2: u8, result: u8) {
        self.set_flag(OVERFLOW, (op1 ^ result) & (op2 ^ result) & 0x80 != 0);
    }

    /// V for `op1 - op2 = result`: operands differ in sign and the result
    /// took the sign of the subtrahend.
    #[inline]
    pub fn update_overflow_sub(&mut self, op1: u8, op2: u8, result: u8) {
        self.set_flag(OVERFLOW, (op1 ^ op2) & (op1 ^ result) & 0x80 != 0);
    }

    /// Evaluates the condition of one of the eight conditional branches.
    ///
    /// Any other opcode (including `BRA`) returns `false`; unconditional
    /// control flow does not go through this predicate.
    pub fn branch_condition(&self, opcode: u8) -> bool {
        match opcode {
            0x10 => !self.flag(NEGATIVE), // BPL
            0x30 => self.flag(NEGATIVE),  // BMI
            0x50 => !self.flag(OVERFLOW), // BVC
            0x70 => self.flag(OVERFLOW),  // BVS
            0x90 => !self.flag(CARRY),    // BCC
            0xB0 => self.flag(CARRY),     // BCS
            0xD0 => !self.flag(ZERO),     // BNE
            0xF0 => self.flag(ZERO),      // BEQ
            _ => false,
        }
    }

    /// The byte pushed for P by BRK/PHP (`is_break`) or a hardware interrupt.
    pub fn get_status_for_push(&self, is_break: bool) -> u8 {
        let p = self.p | UNUSED;
        if is_break {
            p | BREAK
        } else {
            p & !BREAK
        }
    }

    /// Loads P from a pulled byte, keeping bits 4 and 5 of the current P.
    pub fn set_status_from_pull(&mut self, value: u8) {
        self.p = (value & !(BREAK | UNUSED)) | (self.p & (BREAK | UNUSED)) | UNUSED;
    }
}
