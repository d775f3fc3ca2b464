//! # Stack Instructions
//!
//! Push and pull of A, X, Y and P. The stack lives in page one and wraps
//! within it. PHP always pushes B set; PLP leaves bits 4 and 5 of P alone.

use super::Exec;

pub(crate) fn pha(exec: &mut Exec<'_>) {
    let value = exec.regs.a;
    exec.push(value);
}

pub(crate) fn phx(exec: &mut Exec<'_>) {
    let value = exec.regs.x;
    exec.push(value);
}

pub(crate) fn phy(exec: &mut Exec<'_>) {
    let value = exec.regs.y;
    exec.push(value);
}

pub(crate) fn php(exec: &mut Exec<'_>) {
    let status = exec.regs.get_status_for_push(true);
    exec.push(status);
}

pub(crate) fn pla(exec: &mut Exec<'_>) {
    let value = exec.pull();
    exec.regs.a = value;
    exec.set_nz(value);
}

pub(crate) fn plx(exec: &mut Exec<'_>) {
    let value = exec.pull();
    exec.regs.x = value;
    exec.set_nz(value);
}

pub(crate) fn ply(exec: &mut Exec<'_>) {
    let value = exec.pull();
    exec.regs.y = value;
    exec.set_nz(value);
}

pub(crate) fn plp(exec: &mut Exec<'_>) {
    let value = exec.pull();
    exec.regs.set_status_from_pull(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{BREAK, UNUSED, ZERO};
    use crate::instructions::test_support::Harness;
    use crate::memory::MemoryBus;

    #[test]
    fn test_phx_plx() {
        let mut h = Harness::new();
        h.regs.s = 0xFF;
        h.regs.x = 0x42;
        h.run(0xDA, [0, 0]);
        assert_eq!(h.mem.read(0x01FF), 0x42);
        assert_eq!(h.regs.s, 0xFE);

        h.regs.x = 0;
        h.run(0xFA, [0, 0]);
        assert_eq!(h.regs.x, 0x42);
        assert_eq!(h.regs.s, 0xFF);
    }

    #[test]
    fn test_php_pushes_break_set() {
        let mut h = Harness::new();
        h.regs.p = UNUSED;
        h.run(0x08, [0, 0]);
        let pushed = h.mem.read(0x0100 | (h.regs.s.wrapping_add(1)) as u16);
        assert_eq!(pushed, UNUSED | BREAK);
    }

    #[test]
    fn test_plp_ignores_pulled_bits_4_and_5() {
        let mut h = Harness::new();
        h.regs.s = 0xFE;
        h.regs.p = UNUSED;
        h.mem.load(0x01FF, &[0x10]);
        h.run(0x28, [0, 0]);
        assert_eq!(h.regs.p & BREAK, 0);
        assert_eq!(h.regs.status() & UNUSED, UNUSED);
    }

    #[test]
    fn test_pla_sets_flags() {
        let mut h = Harness::new();
        h.regs.s = 0xFE;
        h.mem.load(0x01FF, &[0x00]);
        h.regs.a = 0x55;
        h.run(0x68, [0, 0]);
        assert_eq!(h.regs.a, 0);
        assert!(h.regs.flag(ZERO));
    }
}
