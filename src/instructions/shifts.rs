//! # Shift and Rotate Instructions
//!
//! ASL, LSR, ROL, ROR on the accumulator or memory. Memory forms go through
//! the read-modify-write path. C receives the bit shifted out.

use super::Exec;
use crate::flags::CARRY;

pub(crate) fn asl(exec: &mut Exec<'_>) {
    let result = exec.modify(|regs, value| {
        regs.set_flag(CARRY, value & 0x80 != 0);
        value << 1
    });
    exec.set_nz(result);
}

pub(crate) fn lsr(exec: &mut Exec<'_>) {
    let result = exec.modify(|regs, value| {
        regs.set_flag(CARRY, value & 0x01 != 0);
        value >> 1
    });
    exec.set_nz(result);
}

pub(crate) fn rol(exec: &mut Exec<'_>) {
    let result = exec.modify(|regs, value| {
        let carry_in = regs.flag(CARRY) as u8;
        regs.set_flag(CARRY, value & 0x80 != 0);
        (value << 1) | carry_in
    });
    exec.set_nz(result);
}

pub(crate) fn ror(exec: &mut Exec<'_>) {
    let result = exec.modify(|regs, value| {
        let carry_in = (regs.flag(CARRY) as u8) << 7;
        regs.set_flag(CARRY, value & 0x01 != 0);
        (value >> 1) | carry_in
    });
    exec.set_nz(result);
}
