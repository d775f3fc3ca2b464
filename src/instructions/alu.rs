//! # ALU (Arithmetic Logic Unit) Instructions
//!
//! This module implements arithmetic and logical operations:
//! - ADC, SBC: binary and decimal (BCD) add/subtract with carry
//! - AND, ORA, EOR: bitwise logic on the accumulator
//! - CMP, CPX, CPY: subtraction for flags only
//! - BIT: bit test, including the 65C02S immediate form
//!
//! In decimal mode the 65C02S produces valid N, Z and V flags from the
//! corrected result, unlike the NMOS part. The extra decimal-mode cycle is
//! charged by the engine from the opcode table, not here.

use super::Exec;
use crate::addressing::AddressingMode;
use crate::flags::{CARRY, DECIMAL, NEGATIVE, OVERFLOW, ZERO};
use crate::registers::Registers;

/// ADC (Add with Carry).
pub(crate) fn adc(exec: &mut Exec<'_>) {
    let value = exec.read_operand();
    let result = if exec.regs.flag(DECIMAL) {
        add_decimal(exec.regs, value)
    } else {
        add_binary(exec.regs, value)
    };
    exec.regs.a = result;
    exec.set_nz(result);
}

/// SBC (Subtract with Borrow).
pub(crate) fn sbc(exec: &mut Exec<'_>) {
    let value = exec.read_operand();
    let result = if exec.regs.flag(DECIMAL) {
        subtract_decimal(exec.regs, value)
    } else {
        subtract_binary(exec.regs, value)
    };
    exec.regs.a = result;
    exec.set_nz(result);
}

/// AND (Logical AND).
pub(crate) fn and(exec: &mut Exec<'_>) {
    let result = exec.regs.a & exec.read_operand();
    exec.regs.a = result;
    exec.set_nz(result);
}

/// ORA (Logical Inclusive OR).
pub(crate) fn ora(exec: &mut Exec<'_>) {
    let result = exec.regs.a | exec.read_operand();
    exec.regs.a = result;
    exec.set_nz(result);
}

/// EOR (Exclusive OR).
pub(crate) fn eor(exec: &mut Exec<'_>) {
    let result = exec.regs.a ^ exec.read_operand();
    exec.regs.a = result;
    exec.set_nz(result);
}

pub(crate) fn cmp(exec: &mut Exec<'_>) {
    let register = exec.regs.a;
    compare(exec, register);
}

pub(crate) fn cpx(exec: &mut Exec<'_>) {
    let register = exec.regs.x;
    compare(exec, register);
}

pub(crate) fn cpy(exec: &mut Exec<'_>) {
    let register = exec.regs.y;
    compare(exec, register);
}

/// BIT (Bit Test).
///
/// Z from `A & M`. The memory forms also copy bits 7 and 6 of the operand
/// into N and V; the immediate form (`BIT #imm`) affects Z only.
pub(crate) fn bit(exec: &mut Exec<'_>) {
    let value = exec.read_operand();
    exec.regs.set_flag(ZERO, exec.regs.a & value == 0);
    if exec.mode != AddressingMode::Immediate {
        exec.regs.set_flag(NEGATIVE, value & 0x80 != 0);
        exec.regs.set_flag(OVERFLOW, value & 0x40 != 0);
    }
}

fn compare(exec: &mut Exec<'_>, register: u8) {
    let value = exec.read_operand();
    let raw = register as i16 - value as i16;
    exec.regs.update_carry_sub(raw);
    exec.set_nz(raw as u8);
}

fn add_binary(regs: &mut Registers, value: u8) -> u8 {
    let a = regs.a;
    let raw = a as u16 + value as u16 + regs.flag(CARRY) as u16;
    let result = raw as u8;
    regs.update_carry_add(raw);
    regs.update_overflow_add(a, value, result);
    result
}

fn subtract_binary(regs: &mut Registers, value: u8) -> u8 {
    let a = regs.a;
    let borrow = !regs.flag(CARRY) as i16;
    let raw = a as i16 - value as i16 - borrow;
    let result = raw as u8;
    regs.update_carry_sub(raw);
    regs.update_overflow_sub(a, value, result);
    result
}

/// BCD addition. V is taken from the signed sum before the high-digit
/// adjustment; C from the adjusted sum.
fn add_decimal(regs: &mut Registers, value: u8) -> u8 {
    let a = regs.a;
    let carry = regs.flag(CARRY) as u16;

    // Low digit, adjusted into the high nibble's carry position
    let mut low = (a & 0x0F) as u16 + (value & 0x0F) as u16 + carry;
    if low >= 0x0A {
        low = ((low + 0x06) & 0x0F) + 0x10;
    }

    let signed = (a & 0xF0) as i8 as i16 + (value & 0xF0) as i8 as i16 + low as i16;
    regs.set_flag(OVERFLOW, !(-128..=127).contains(&signed));

    let mut raw = (a & 0xF0) as u16 + (value & 0xF0) as u16 + low;
    if raw >= 0xA0 {
        raw += 0x60;
    }
    regs.update_carry_add(raw);
    raw as u8
}

/// BCD subtraction. C and V follow the binary subtraction; the result is the
/// binary difference corrected per digit.
fn subtract_decimal(regs: &mut Registers, value: u8) -> u8 {
    let a = regs.a;
    let borrow = !regs.flag(CARRY) as i16;

    let binary = a as i16 - value as i16 - borrow;
    regs.update_carry_sub(binary);
    regs.update_overflow_sub(a, value, binary as u8);

    let low = (a & 0x0F) as i16 - (value & 0x0F) as i16 - borrow;
    let mut raw = binary;
    if raw < 0 {
        raw -= 0x60;
    }
    if low < 0 {
        raw -= 0x06;
    }
    raw as u8
}
