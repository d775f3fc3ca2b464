//! # Register Transfer Instructions
//!
//! TAX, TAY, TXA, TYA, TSX update N/Z from the copied value; TXS does not
//! touch flags.

use super::Exec;

pub(crate) fn tax(exec: &mut Exec<'_>) {
    exec.regs.x = exec.regs.a;
    exec.set_nz(exec.regs.x);
}

pub(crate) fn tay(exec: &mut Exec<'_>) {
    exec.regs.y = exec.regs.a;
    exec.set_nz(exec.regs.y);
}

pub(crate) fn txa(exec: &mut Exec<'_>) {
    exec.regs.a = exec.regs.x;
    exec.set_nz(exec.regs.a);
}

pub(crate) fn tya(exec: &mut Exec<'_>) {
    exec.regs.a = exec.regs.y;
    exec.set_nz(exec.regs.a);
}

pub(crate) fn tsx(exec: &mut Exec<'_>) {
    exec.regs.x = exec.regs.s;
    exec.set_nz(exec.regs.x);
}

pub(crate) fn txs(exec: &mut Exec<'_>) {
    exec.regs.s = exec.regs.x;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{NEGATIVE, ZERO};
    use crate::instructions::test_support::Harness;

    #[test]
    fn test_tax_updates_flags() {
        let mut h = Harness::new();
        h.regs.a = 0x80;
        h.run(0xAA, [0, 0]);
        assert_eq!(h.regs.x, 0x80);
        assert!(h.regs.flag(NEGATIVE));
    }

    #[test]
    fn test_txs_leaves_flags() {
        let mut h = Harness::new();
        h.regs.x = 0x00;
        h.regs.set_flag(ZERO, false);
        h.run(0x9A, [0, 0]);
        assert_eq!(h.regs.s, 0x00);
        assert!(!h.regs.flag(ZERO));
    }

    #[test]
    fn test_tsx() {
        let mut h = Harness::new();
        h.regs.s = 0xF0;
        h.run(0xBA, [0, 0]);
        assert_eq!(h.regs.x, 0xF0);
        assert!(h.regs.flag(NEGATIVE));
    }
}
