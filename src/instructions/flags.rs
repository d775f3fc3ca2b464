//! Status flag instructions: CLC, SEC, CLI, SEI, CLD, SED, CLV.

use super::Exec;
use crate::flags::{CARRY, DECIMAL, IRQ_DISABLE, OVERFLOW};

pub(crate) fn clc(exec: &mut Exec<'_>) {
    exec.regs.set_flag(CARRY, false);
}

pub(crate) fn sec(exec: &mut Exec<'_>) {
    exec.regs.set_flag(CARRY, true);
}

pub(crate) fn cli(exec: &mut Exec<'_>) {
    exec.regs.set_flag(IRQ_DISABLE, false);
}

pub(crate) fn sei(exec: &mut Exec<'_>) {
    exec.regs.set_flag(IRQ_DISABLE, true);
}

pub(crate) fn cld(exec: &mut Exec<'_>) {
    exec.regs.set_flag(DECIMAL, false);
}

pub(crate) fn sed(exec: &mut Exec<'_>) {
    exec.regs.set_flag(DECIMAL, true);
}

pub(crate) fn clv(exec: &mut Exec<'_>) {
    exec.regs.set_flag(OVERFLOW, false);
}
