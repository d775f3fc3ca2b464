//! # Increment and Decrement Instructions
//!
//! INC/DEC operate on memory (read-modify-write) or, new on the 65C02S, on the
//! accumulator. INX/INY/DEX/DEY operate on the index registers. All wrap
//! modulo 256 and update N and Z.

use super::Exec;

pub(crate) fn inc(exec: &mut Exec<'_>) {
    let result = exec.modify(|_, value| value.wrapping_add(1));
    exec.set_nz(result);
}

pub(crate) fn dec(exec: &mut Exec<'_>) {
    let result = exec.modify(|_, value| value.wrapping_sub(1));
    exec.set_nz(result);
}

pub(crate) fn inx(exec: &mut Exec<'_>) {
    exec.regs.x = exec.regs.x.wrapping_add(1);
    exec.set_nz(exec.regs.x);
}

pub(crate) fn iny(exec: &mut Exec<'_>) {
    exec.regs.y = exec.regs.y.wrapping_add(1);
    exec.set_nz(exec.regs.y);
}

pub(crate) fn dex(exec: &mut Exec<'_>) {
    exec.regs.x = exec.regs.x.wrapping_sub(1);
    exec.set_nz(exec.regs.x);
}

pub(crate) fn dey(exec: &mut Exec<'_>) {
    exec.regs.y = exec.regs.y.wrapping_sub(1);
    exec.set_nz(exec.regs.y);
}
