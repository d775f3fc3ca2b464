//! Bit-manipulation instructions added by the 65C02S.
//!
//! TRB/TSB test and modify memory against the accumulator. RMBn/SMBn and
//! BBRn/BBSn take the bit number from the opcode's high nibble (`n = (op >> 4) & 7`).

use super::Exec;
use crate::flags::ZERO;

fn bit_mask(opcode: u8) -> u8 {
    1 << ((opcode >> 4) & 0x07)
}

/// TRB (Test and Reset Bits): Z from `A & M`, then `M &= !A`.
pub(crate) fn trb(exec: &mut Exec<'_>) {
    exec.modify(|regs, value| {
        regs.set_flag(ZERO, regs.a & value == 0);
        value & !regs.a
    });
}

/// TSB (Test and Set Bits): Z from `A & M`, then `M |= A`.
pub(crate) fn tsb(exec: &mut Exec<'_>) {
    exec.modify(|regs, value| {
        regs.set_flag(ZERO, regs.a & value == 0);
        value | regs.a
    });
}

/// RMBn: clear bit n of a zero-page byte.
pub(crate) fn rmb(exec: &mut Exec<'_>) {
    let mask = bit_mask(exec.ctx.opcode);
    exec.modify(|_, value| value & !mask);
}

/// SMBn: set bit n of a zero-page byte.
pub(crate) fn smb(exec: &mut Exec<'_>) {
    let mask = bit_mask(exec.ctx.opcode);
    exec.modify(|_, value| value | mask);
}

/// BBRn: branch if bit n of a zero-page byte is clear.
pub(crate) fn bbr(exec: &mut Exec<'_>) {
    let clear = exec.read_operand() & bit_mask(exec.ctx.opcode) == 0;
    let target = exec.regs.pc.wrapping_add(exec.ctx.operand[1] as i8 as u16);
    exec.branch_to(target, clear);
}

/// BBSn: branch if bit n of a zero-page byte is set.
pub(crate) fn bbs(exec: &mut Exec<'_>) {
    let set = exec.read_operand() & bit_mask(exec.ctx.opcode) != 0;
    let target = exec.regs.pc.wrapping_add(exec.ctx.operand[1] as i8 as u16);
    exec.branch_to(target, set);
}
