//! # Load and Store Instructions
//!
//! This module implements data movement between registers and memory:
//! - LDA, LDX, LDY: load a register and update N/Z
//! - STA, STX, STY: store a register, no flags
//! - STZ: store zero (65C02S)

use super::Exec;

/// LDA (Load Accumulator).
pub(crate) fn lda(exec: &mut Exec<'_>) {
    let value = exec.read_operand();
    exec.regs.a = value;
    exec.set_nz(value);
}

/// LDX (Load X Register).
pub(crate) fn ldx(exec: &mut Exec<'_>) {
    let value = exec.read_operand();
    exec.regs.x = value;
    exec.set_nz(value);
}

/// LDY (Load Y Register).
pub(crate) fn ldy(exec: &mut Exec<'_>) {
    let value = exec.read_operand();
    exec.regs.y = value;
    exec.set_nz(value);
}

pub(crate) fn sta(exec: &mut Exec<'_>) {
    let value = exec.regs.a;
    exec.write_operand(value);
}

pub(crate) fn stx(exec: &mut Exec<'_>) {
    let value = exec.regs.x;
    exec.write_operand(value);
}

pub(crate) fn sty(exec: &mut Exec<'_>) {
    let value = exec.regs.y;
    exec.write_operand(value);
}

pub(crate) fn stz(exec: &mut Exec<'_>) {
    exec.write_operand(0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{NEGATIVE, ZERO};
    use crate::instructions::test_support::Harness;
    use crate::memory::MemoryBus;

    #[test]
    fn test_lda_zero_page_indirect() {
        let mut h = Harness::new();
        h.mem.load(0x0010, &[0x00, 0x30]);
        h.mem.load(0x3000, &[0x80]);
        h.run(0xB2, [0x10, 0]);
        assert_eq!(h.regs.a, 0x80);
        assert!(h.regs.flag(NEGATIVE));
        assert!(!h.regs.flag(ZERO));
    }

    #[test]
    fn test_ldx_zero_page_y() {
        let mut h = Harness::new();
        h.regs.y = 0x02;
        h.mem.load(0x0012, &[0x00]);
        h.run(0xB6, [0x10, 0]);
        assert_eq!(h.regs.x, 0x00);
        assert!(h.regs.flag(ZERO));
    }

    #[test]
    fn test_stores_do_not_touch_flags() {
        let mut h = Harness::new();
        h.regs.a = 0x00;
        let p = h.regs.p;
        h.run(0x8D, [0x00, 0x20]);
        assert_eq!(h.mem.read(0x2000), 0x00);
        assert_eq!(h.regs.p, p);
    }

    #[test]
    fn test_stz_absolute_x() {
        let mut h = Harness::new();
        h.regs.x = 0x05;
        h.mem.load(0x2005, &[0xAA]);
        h.run(0x9E, [0x00, 0x20]);
        assert_eq!(h.mem.read(0x2005), 0x00);
    }
}
